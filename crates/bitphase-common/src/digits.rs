//! Single-character digit helpers used by the row formatter.

/// Uppercase digit for `value` in base 36, `None` outside `0..36`.
pub(crate) fn base36_char(value: u32) -> Option<char> {
    char::from_digit(value, 36).map(|c| c.to_ascii_uppercase())
}

/// Value of a base-36 digit, treating `.` as zero.
pub(crate) fn base36_value(c: char) -> Option<u32> {
    if c == '.' {
        return Some(0);
    }
    c.to_digit(36)
}

/// Value of a hex digit, treating `.` as zero.
pub(crate) fn hex_value(c: char) -> Option<u32> {
    if c == '.' {
        return Some(0);
    }
    c.to_digit(16)
}

/// Formats `value` as `width` base-36 digits, keeping the low digits on overflow.
pub(crate) fn base36_string(mut value: u64, width: usize) -> String {
    let mut out = vec!['0'; width];
    for slot in out.iter_mut().rev() {
        // value % 36 always fits a digit
        *slot = base36_char((value % 36) as u32).unwrap_or('0');
        value /= 36;
    }
    out.into_iter().collect()
}
