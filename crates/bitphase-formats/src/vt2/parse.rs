//! VT2 text reader.

use bitphase_ay::Note;
use tracing::debug;

use super::{Vt2Cell, Vt2Command, Vt2Module, Vt2Note, Vt2Ornament, Vt2Row, Vt2SampleLine};
use crate::error::{FormatError, Result};

/// Parses VT2 text into its modules (two for TurboSound files).
///
/// Blank lines and unknown `[Module]` keys are ignored. Every `[Module]`
/// header starts a new module; ornament, sample and pattern sections belong
/// to the most recent one.
pub fn parse_vt2(text: &str) -> Result<Vec<Vt2Module>> {
    let mut reader = Vt2Reader::default();
    for (index, raw) in text.lines().enumerate() {
        reader.line(index + 1, raw.trim())?;
    }
    if reader.modules.is_empty() {
        return Err(FormatError::EmptyModule);
    }
    debug!(modules = reader.modules.len(), "parsed VT2 text");
    Ok(reader.modules)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Preamble,
    Module,
    Ornament(usize),
    Sample(usize),
    Pattern(usize),
}

struct Vt2Reader {
    modules: Vec<Vt2Module>,
    section: Section,
}

impl Default for Vt2Reader {
    fn default() -> Self {
        Self {
            modules: Vec::new(),
            section: Section::Preamble,
        }
    }
}

fn invalid(line: usize, message: impl Into<String>) -> FormatError {
    FormatError::InvalidValue {
        line,
        message: message.into(),
    }
}

impl Vt2Reader {
    fn line(&mut self, line: usize, text: &str) -> Result<()> {
        if text.is_empty() {
            return Ok(());
        }
        if let Some(name) = text.strip_prefix('[').and_then(|t| t.strip_suffix(']')) {
            return self.open_section(line, name);
        }
        let section = self.section;
        let Some(module) = self.modules.last_mut() else {
            // text before the first [Module] header
            return Ok(());
        };
        match section {
            Section::Preamble => Ok(()),
            Section::Module => module_key(module, line, text),
            Section::Ornament(number) => {
                let ornament = module.ornaments.entry(number).or_default();
                ornament_line(ornament, line, text)
            }
            Section::Sample(number) => {
                let (parsed, is_loop) = sample_line(line, text)?;
                let sample = module.samples.entry(number).or_default();
                if is_loop {
                    sample.loop_point = sample.lines.len();
                }
                sample.lines.push(parsed);
                Ok(())
            }
            Section::Pattern(number) => {
                let row = pattern_row(line, text)?;
                module.patterns.entry(number).or_default().rows.push(row);
                Ok(())
            }
        }
    }

    fn open_section(&mut self, line: usize, name: &str) -> Result<()> {
        if name.eq_ignore_ascii_case("Module") {
            self.modules.push(Vt2Module::default());
            self.section = Section::Module;
            return Ok(());
        }
        let bad = || FormatError::InvalidSection {
            line,
            name: name.to_string(),
        };
        if self.modules.is_empty() {
            return Err(bad());
        }
        let (kind, number) = split_section_name(name).ok_or_else(bad)?;
        self.section = match kind {
            "ornament" => Section::Ornament(number),
            "sample" => Section::Sample(number),
            "pattern" => Section::Pattern(number),
            _ => return Err(bad()),
        };
        // empty sections still exist
        if let Some(module) = self.modules.last_mut() {
            match self.section {
                Section::Ornament(n) => {
                    module.ornaments.entry(n).or_default();
                }
                Section::Sample(n) => {
                    module.samples.entry(n).or_default();
                }
                Section::Pattern(n) => {
                    module.patterns.entry(n).or_default();
                }
                Section::Module | Section::Preamble => {}
            }
        }
        Ok(())
    }
}

/// `Sample12` -> ("sample", 12); a single base-36 digit is accepted too.
fn split_section_name(name: &str) -> Option<(&'static str, usize)> {
    const KINDS: [&str; 3] = ["ornament", "sample", "pattern"];
    let kind = KINDS.iter().find(|kind| {
        name.len() > kind.len() && name.get(..kind.len()).is_some_and(|p| p.eq_ignore_ascii_case(kind))
    })?;
    let digits = &name[kind.len()..];
    let number = match digits.parse::<usize>() {
        Ok(n) => n,
        Err(_) if digits.len() == 1 => digits.chars().next()?.to_digit(36)? as usize,
        Err(_) => return None,
    };
    Some((*kind, number))
}

fn parse_number<T: std::str::FromStr>(line: usize, key: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse::<T>()
        .map_err(|_| invalid(line, format!("{key} has non-numeric value '{value}'")))
}

fn module_key(module: &mut Vt2Module, line: usize, text: &str) -> Result<()> {
    let Some((key, value)) = text.split_once('=') else {
        return Ok(());
    };
    let key = key.trim();
    match key {
        "Version" => module.version = value.trim().to_string(),
        "Title" => module.title = value.trim().to_string(),
        "Author" => module.author = value.trim().to_string(),
        "NoteTable" => module.note_table = parse_number(line, key, value)?,
        "ChipFreq" => module.chip_freq = parse_number(line, key, value)?,
        "IntFreq" => module.int_freq = parse_number(line, key, value)?,
        "Speed" => module.speed = parse_number(line, key, value)?,
        "PlayOrder" => {
            module.play_order.clear();
            module.loop_position = 0;
            for (index, item) in value.split(',').map(str::trim).enumerate() {
                if item.is_empty() {
                    continue;
                }
                let number = match item.strip_prefix(['L', 'l']) {
                    Some(rest) => {
                        module.loop_position = index;
                        rest
                    }
                    None => item,
                };
                module.play_order.push(parse_number(line, key, number)?);
            }
        }
        _ => {}
    }
    Ok(())
}

fn ornament_line(ornament: &mut Vt2Ornament, line: usize, text: &str) -> Result<()> {
    for item in text.split(',').map(str::trim) {
        if item.is_empty() {
            continue;
        }
        let value = match item.strip_prefix(['L', 'l']) {
            Some(rest) => {
                ornament.loop_point = ornament.offsets.len();
                rest
            }
            None => item,
        };
        let offset: i32 = parse_number(line, "ornament offset", value)?;
        ornament
            .offsets
            .push(offset.clamp(i32::from(i8::MIN), i32::from(i8::MAX)) as i8);
    }
    Ok(())
}

fn mask_flag(line: usize, c: Option<char>, upper: char) -> Result<bool> {
    match c {
        Some(c) if c == upper => Ok(true),
        Some(c) if c == upper.to_ascii_lowercase() => Ok(false),
        _ => Err(invalid(line, format!("expected '{upper}' mask flag"))),
    }
}

/// `+012^` -> (18, true)
fn signed_offset(line: usize, token: &str) -> Result<(i32, bool)> {
    let (body, accumulate) = match token.strip_suffix('^') {
        Some(body) => (body, true),
        None => (token.strip_suffix('_').unwrap_or(token), false),
    };
    let (negative, digits) = match body.as_bytes().first() {
        Some(b'-') => (true, &body[1..]),
        Some(b'+') => (false, &body[1..]),
        _ => (false, body),
    };
    let magnitude = i32::from_str_radix(digits, 16)
        .map_err(|_| invalid(line, format!("bad offset '{token}'")))?;
    Ok((if negative { -magnitude } else { magnitude }, accumulate))
}

/// Parses one sample line and whether it carries the loop mark.
fn sample_line(line: usize, text: &str) -> Result<(Vt2SampleLine, bool)> {
    let tokens: Vec<&str> = text.split_whitespace().collect();
    if tokens.len() < 4 {
        return Err(invalid(line, format!("short sample line '{text}'")));
    }
    let mut flags = tokens[0].chars();
    let tone = mask_flag(line, flags.next(), 'T')?;
    let noise = mask_flag(line, flags.next(), 'N')?;
    let envelope = mask_flag(line, flags.next(), 'E')?;

    let (tone_offset, tone_accumulate) = signed_offset(line, tokens[1])?;
    let (ne_offset, noise_envelope_accumulate) = signed_offset(line, tokens[2])?;

    let mut amp = tokens[3].chars();
    let amplitude = amp
        .next()
        .and_then(|c| c.to_digit(16))
        .ok_or_else(|| invalid(line, format!("bad amplitude '{}'", tokens[3])))? as u8;
    let amplitude_slide = match amp.next() {
        Some('+') => 1,
        Some('-') => -1,
        _ => 0,
    };

    let parsed = Vt2SampleLine {
        tone,
        noise,
        envelope,
        tone_offset: tone_offset.clamp(i32::from(i16::MIN), i32::from(i16::MAX)) as i16,
        tone_accumulate,
        noise_envelope_offset: ne_offset.clamp(i32::from(i8::MIN), i32::from(i8::MAX)) as i8,
        noise_envelope_accumulate,
        amplitude,
        amplitude_slide,
    };
    Ok((parsed, tokens.get(4).is_some_and(|t| t.eq_ignore_ascii_case("L"))))
}

/// Hex field where `.` stands for zero.
fn dotted_hex(line: usize, field: &str) -> Result<u32> {
    let digits: String = field.chars().map(|c| if c == '.' { '0' } else { c }).collect();
    if digits.is_empty() {
        return Ok(0);
    }
    u32::from_str_radix(&digits, 16).map_err(|_| invalid(line, format!("bad hex field '{field}'")))
}

fn dotted_digit(line: usize, c: Option<char>, radix: u32) -> Result<u8> {
    match c {
        None | Some('.') => Ok(0),
        Some(c) => c
            .to_digit(radix)
            .map(|d| d as u8)
            .ok_or_else(|| invalid(line, format!("bad digit '{c}'"))),
    }
}

fn note_cell(line: usize, text: &str) -> Result<Vt2Note> {
    match text {
        "---" => return Ok(Vt2Note::Empty),
        "R--" => return Ok(Vt2Note::Off),
        _ => {}
    }
    Note::from_text(text)
        .and_then(|note| note.index())
        .map(|index| Vt2Note::Note(index as u8))
        .ok_or_else(|| invalid(line, format!("bad note '{text}'")))
}

fn cell(line: usize, text: &str) -> Result<Vt2Cell> {
    let tokens: Vec<&str> = text.split_whitespace().collect();
    let &[note, params, command] = tokens.as_slice() else {
        return Err(invalid(line, format!("malformed channel cell '{text}'")));
    };
    let mut params = params.chars();
    let sample = dotted_digit(line, params.next(), 36)?;
    let envelope = dotted_digit(line, params.next(), 16)?;
    let ornament = match params.next() {
        None | Some('.') => None,
        Some(c) => Some(dotted_digit(line, Some(c), 16)?),
    };
    let volume = dotted_digit(line, params.next(), 16)?;

    let mut chars = command.chars();
    let code = dotted_digit(line, chars.next(), 16)?;
    let delay = dotted_digit(line, chars.next(), 16)?;
    let parameter = dotted_hex(line, chars.as_str())? as u8;

    Ok(Vt2Cell {
        note: note_cell(line, note)?,
        sample,
        envelope,
        ornament,
        volume,
        command: Vt2Command {
            command: code,
            delay,
            parameter,
        },
    })
}

fn pattern_row(line: usize, text: &str) -> Result<Vt2Row> {
    let parts: Vec<&str> = text.split('|').collect();
    if parts.len() != 5 {
        return Err(invalid(line, format!("expected 5 columns, found {}", parts.len())));
    }
    let mut row = Vt2Row {
        envelope_period: dotted_hex(line, parts[0].trim())? as u16,
        noise: dotted_hex(line, parts[1].trim())? as u8,
        ..Vt2Row::default()
    };
    for (slot, text) in row.channels.iter_mut().zip(&parts[2..]) {
        *slot = cell(line, text)?;
    }
    Ok(row)
}

#[cfg(test)]
mod tests {
    use super::*;

    const MODULE: &str = "\
[Module]
VortexTrackerII=1
Version=3.5
Title=Test tune
Author=Someone
NoteTable=1
ChipFreq=1750000
IntFreq=48828
Speed=4
PlayOrder=0,L1,0

[Ornament1]
L0,12,-5

[Sample1]
TnE +001_ +00_ F_
tNe -010^ +03^ D- L

[Pattern0]
01A0|1F|C-4 1E1F 1102|R-- .... ....|--- .... B.03
....|..|--- .... ....|--- .... ....|--- .... ....

[Pattern1]
....|..|G#8 .... ....|--- .... ....|--- .... ....
";

    #[test]
    fn parses_module_header() {
        let modules = parse_vt2(MODULE).unwrap();
        let module = &modules[0];
        assert_eq!(module.version, "3.5");
        assert_eq!(module.title, "Test tune");
        assert_eq!(module.note_table, 1);
        assert_eq!(module.chip_freq, 1_750_000);
        assert_eq!(module.int_freq, 48_828);
        assert_eq!(module.play_order, vec![0, 1, 0]);
        assert_eq!(module.loop_position, 1);
    }

    #[test]
    fn parses_ornaments_and_samples() {
        let module = parse_vt2(MODULE).unwrap().remove(0);
        assert_eq!(module.ornaments[&1].offsets, vec![0, 12, -5]);
        let sample = &module.samples[&1];
        assert_eq!(sample.loop_point, 1);
        assert_eq!(sample.lines[0].tone_offset, 1);
        assert!(sample.lines[0].tone && !sample.lines[0].noise && sample.lines[0].envelope);
        let second = sample.lines[1];
        assert_eq!(second.tone_offset, -16);
        assert!(second.tone_accumulate);
        assert_eq!(second.noise_envelope_offset, 3);
        assert_eq!(second.amplitude, 13);
        assert_eq!(second.amplitude_slide, -1);
    }

    #[test]
    fn parses_pattern_cells() {
        let module = parse_vt2(MODULE).unwrap().remove(0);
        let row = &module.patterns[&0].rows[0];
        assert_eq!(row.envelope_period, 0x1A0);
        assert_eq!(row.noise, 0x1F);
        let a = &row.channels[0];
        assert_eq!(a.note, Vt2Note::Note(36));
        assert_eq!((a.sample, a.envelope, a.ornament, a.volume), (1, 14, Some(1), 15));
        assert_eq!(a.command, Vt2Command { command: 1, delay: 1, parameter: 2 });
        assert_eq!(row.channels[1].note, Vt2Note::Off);
        assert_eq!(row.channels[2].command.command, 0xB);
        assert_eq!(row.channels[2].command.parameter, 3);
        assert_eq!(module.patterns[&1].rows[0].channels[0].note, Vt2Note::Note(92));
    }

    #[test]
    fn two_module_headers_make_turbosound() {
        let text = format!("{MODULE}\n{MODULE}");
        assert_eq!(parse_vt2(&text).unwrap().len(), 2);
    }

    #[test]
    fn reports_line_numbers() {
        let text = "[Module]\nSpeed=fast\n";
        match parse_vt2(text) {
            Err(FormatError::InvalidValue { line, .. }) => assert_eq!(line, 2),
            other => panic!("unexpected {other:?}"),
        }
        assert!(matches!(
            parse_vt2("[Module]\n[Bogus3]\n"),
            Err(FormatError::InvalidSection { line: 2, .. })
        ));
        assert!(matches!(parse_vt2(""), Err(FormatError::EmptyModule)));
    }

    #[test]
    fn base36_section_numbers() {
        assert_eq!(split_section_name("Sample12"), Some(("sample", 12)));
        assert_eq!(split_section_name("SampleV"), Some(("sample", 31)));
        assert_eq!(split_section_name("PATTERN0"), Some(("pattern", 0)));
        assert_eq!(split_section_name("Sample"), None);
    }
}
