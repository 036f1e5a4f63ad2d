//! Tracker text rendering of generic rows.
//!
//! A formatted row is `{prefix}|{global}|{channel 0}|{channel 1}|...`. The
//! prefix is the row number (2 hex or 3 decimal characters) and is skipped by
//! width before parsing. Each segment follows the schema template; placeholders
//! are substituted per field type and spaces in templates match any run of
//! whitespace when parsing.
//!
//! # Example
//!
//! ```
//! use bitphase_common::{
//!     ChipSchema, FieldSpec, FieldType, FormatOptions, GenericRow, FieldValue, format_row,
//!     parse_row,
//! };
//!
//! let schema = ChipSchema::builder("demo")
//!     .template("{note} {volume}")
//!     .field(FieldSpec::new("note", FieldType::Note, 3))
//!     .field(FieldSpec::new("volume", FieldType::Hex, 1).zero_marker(0))
//!     .build();
//!
//! let mut row = GenericRow::new();
//! row.insert("note", FieldValue::Text("C-4".into()));
//! row.insert("volume", FieldValue::Int(12));
//!
//! let text = format_row(&GenericRow::new(), &[row.clone()], 10, &schema, &FormatOptions::default());
//! assert_eq!(text, "0A||C-4 C");
//! assert_eq!(parse_row(&text, &schema, &FormatOptions::default()).channels[0], row);
//! ```

use regex::Regex;

use crate::digits::base36_string;
use crate::effect::{format_effect, parse_effect};
use crate::pattern::{FieldValue, GenericRow};
use crate::schema::{ChipSchema, FieldScope, FieldSpec, FieldType, TemplatePart, template_parts};

/// Segment separator between global data and channels.
pub const SEGMENT_SEPARATOR: char = '|';

/// Row number display style.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RowNumberStyle {
    /// Two uppercase hex digits.
    #[default]
    Hex,
    /// Three decimal digits.
    Decimal,
}

impl RowNumberStyle {
    /// Width of the prefix in characters.
    pub fn width(self) -> usize {
        match self {
            RowNumberStyle::Hex => 2,
            RowNumberStyle::Decimal => 3,
        }
    }

    /// Formats a row number.
    pub fn format(self, row: usize) -> String {
        match self {
            RowNumberStyle::Hex => format!("{:02X}", row & 0xFF),
            RowNumberStyle::Decimal => format!("{:03}", row % 1000),
        }
    }
}

/// Formatting options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FormatOptions {
    /// Row number style.
    pub row_numbers: RowNumberStyle,
}

/// Parsed row text.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ParsedRow {
    /// Global fields.
    pub pattern_row: GenericRow,
    /// One entry per channel segment found in the text.
    pub channels: Vec<GenericRow>,
}

/// Formats a full row: prefix, global segment and channel segments.
pub fn format_row(
    pattern_row: &GenericRow,
    channel_rows: &[GenericRow],
    row_index: usize,
    schema: &ChipSchema,
    options: &FormatOptions,
) -> String {
    let mut out = options.row_numbers.format(row_index);
    out.push(SEGMENT_SEPARATOR);
    out.push_str(&format_fields(
        &schema.global_template,
        &schema.global_fields,
        pattern_row,
    ));
    for row in channel_rows {
        out.push(SEGMENT_SEPARATOR);
        out.push_str(&format_fields(&schema.template, &schema.fields, row));
    }
    out
}

/// Parses a full row. Never fails: unmatched segments yield empty rows.
pub fn parse_row(text: &str, schema: &ChipSchema, options: &FormatOptions) -> ParsedRow {
    RowParser::new(schema).parse(text, options)
}

/// Formats one segment using `template`.
pub fn format_fields(
    template: &str,
    fields: &std::collections::BTreeMap<String, FieldSpec>,
    row: &GenericRow,
) -> String {
    let mut out = String::new();
    for part in template_parts(template) {
        match part {
            TemplatePart::Literal(text) => out.push_str(&text),
            TemplatePart::Field(name) => match fields.get(&name) {
                Some(spec) => out.push_str(&format_value(spec, row.get(&name))),
                None => out.push_str(&"?".repeat(name.len())),
            },
        }
    }
    out
}

/// Formats a single value according to its field spec.
pub fn format_value(spec: &FieldSpec, value: &FieldValue) -> String {
    let width = spec.length;
    let dots = || ".".repeat(width);

    match spec.kind {
        FieldType::Effect => format_effect(value.as_effect()),
        FieldType::Note => match value.as_text() {
            Some(text) if !text.trim().is_empty() => fit(text.trim(), width, ' '),
            _ => "-".repeat(width),
        },
        FieldType::Text => fit(value.as_text().unwrap_or(""), width, ' '),
        FieldType::Hex | FieldType::Symbol | FieldType::Decimal => {
            let Some(v) = value.as_int() else {
                return dots();
            };
            if spec.zero_marker == Some(v) {
                return dots();
            }
            if spec.off_marker == Some(v) {
                return "0".repeat(width);
            }
            // only markers may be negative
            let Ok(magnitude) = u64::try_from(v) else {
                return dots();
            };
            let digits = match spec.kind {
                FieldType::Hex => format!("{magnitude:0width$X}"),
                FieldType::Symbol => base36_string(magnitude, width),
                _ => format!("{magnitude:0width$}"),
            };
            let skip = digits.len().saturating_sub(width);
            digits[skip..].to_string()
        }
    }
}

fn fit(text: &str, width: usize, pad: char) -> String {
    let mut out: String = text.chars().take(width).collect();
    while out.chars().count() < width {
        out.push(pad);
    }
    out
}

/// Parses one value; `None` when the text is not valid for the field.
pub fn parse_value(spec: &FieldSpec, text: &str) -> Option<FieldValue> {
    let text = text.trim();
    let all = |c: char| !text.is_empty() && text.chars().all(|t| t == c);

    match spec.kind {
        FieldType::Effect => Some(parse_effect(text).into()),
        FieldType::Note => {
            if text.is_empty() || all('-') {
                Some(FieldValue::Null)
            } else if is_note_text(text) {
                Some(FieldValue::Text(text.to_ascii_uppercase()))
            } else {
                None
            }
        }
        FieldType::Text => Some(FieldValue::Text(text.to_string())),
        FieldType::Hex | FieldType::Symbol | FieldType::Decimal => {
            if all('.') {
                return Some(
                    spec.zero_marker
                        .map_or(FieldValue::Null, FieldValue::Int),
                );
            }
            if let Some(off) = spec.off_marker
                && all('0')
            {
                return Some(FieldValue::Int(off));
            }
            let digits = text.replace('.', "0");
            let radix = match spec.kind {
                FieldType::Hex => 16,
                FieldType::Symbol => 36,
                _ => 10,
            };
            i64::from_str_radix(&digits, radix).ok().map(FieldValue::Int)
        }
    }
}

/// Whether `text` is a three-character note (`C-4`, `F#2`) or `OFF`.
pub fn is_note_text(text: &str) -> bool {
    if text.eq_ignore_ascii_case("OFF") {
        return true;
    }
    let bytes = text.as_bytes();
    bytes.len() == 3
        && matches!(bytes[0].to_ascii_uppercase(), b'A'..=b'G')
        && matches!(bytes[1], b'-' | b'#')
        && bytes[2].is_ascii_digit()
}

fn field_pattern(spec: &FieldSpec) -> String {
    let n = spec.length;
    match spec.kind {
        FieldType::Hex => format!("[0-9A-Fa-f.]{{{n}}}"),
        FieldType::Symbol => format!("[0-9A-Za-z.]{{{n}}}"),
        FieldType::Decimal => format!("[0-9.]{{{n}}}"),
        FieldType::Note => "[A-Za-z#\\-][A-Za-z#\\-][A-Za-z0-9\\-]".to_string(),
        FieldType::Effect => "[0-9A-Za-z.]{4}".to_string(),
        FieldType::Text => format!("[^|]{{{n}}}"),
    }
}

/// Builds an anchored regex for one segment template.
fn segment_regex(template: &str, fields: &std::collections::BTreeMap<String, FieldSpec>) -> Option<Regex> {
    let mut pattern = String::from(r"^\s*");
    for part in template_parts(template) {
        match part {
            TemplatePart::Literal(text) => {
                for c in text.chars() {
                    if c == ' ' {
                        pattern.push_str(r"\s*");
                    } else {
                        pattern.push_str(&regex::escape(&c.to_string()));
                    }
                }
            }
            TemplatePart::Field(name) => {
                let spec = fields.get(&name)?;
                pattern.push_str(&format!("(?P<{name}>{})", field_pattern(spec)));
            }
        }
    }
    pattern.push_str(r"\s*$");
    Regex::new(&pattern).ok()
}

/// Compiled row parser for a schema, reusable across rows.
#[derive(Debug, Clone)]
pub struct RowParser<'a> {
    schema: &'a ChipSchema,
    channel: Option<Regex>,
    global: Option<Regex>,
}

impl<'a> RowParser<'a> {
    /// Compiles the segment regexes for `schema`.
    pub fn new(schema: &'a ChipSchema) -> Self {
        let channel = segment_regex(&schema.template, &schema.fields);
        let global = segment_regex(&schema.global_template, &schema.global_fields);
        if channel.is_none() || global.is_none() {
            tracing::debug!(chip = %schema.chip_type, "row template does not compile to a parser");
        }
        Self {
            schema,
            channel,
            global,
        }
    }

    /// Parses a full row (prefix included).
    pub fn parse(&self, text: &str, options: &FormatOptions) -> ParsedRow {
        let prefix = options.row_numbers.width();
        let body: String = text.chars().skip(prefix).collect();
        let mut segments = body.split(SEGMENT_SEPARATOR);

        // text before the first separator is the leftover prefix area
        let _ = segments.next();

        let mut parsed = ParsedRow::default();
        if let Some(global) = segments.next() {
            parsed.pattern_row = self.parse_segment(global, FieldScope::Global);
        }
        parsed.channels = segments
            .map(|segment| self.parse_segment(segment, FieldScope::Channel))
            .collect();
        parsed
    }

    /// Parses a single segment; an unmatched segment yields an empty row.
    pub fn parse_segment(&self, text: &str, scope: FieldScope) -> GenericRow {
        let regex = match scope {
            FieldScope::Channel => self.channel.as_ref(),
            FieldScope::Global => self.global.as_ref(),
        };
        let mut row = GenericRow::new();
        let Some(captures) = regex.and_then(|r| r.captures(text)) else {
            return row;
        };
        for (name, spec) in self.schema.fields_for(scope) {
            if let Some(m) = captures.name(name)
                && let Some(value) = parse_value(spec, m.as_str())
            {
                row.insert(name.clone(), value);
            }
        }
        row
    }
}
