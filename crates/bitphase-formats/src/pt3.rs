//! ProTracker 3 binary module decoder.
//!
//! PT3 files are decoded into [`Vt2Module`]s. A TurboSound file carries two
//! modules back to back followed by a 16-byte footer
//! (`PT3!` len1 `PT3!` len2 `02TS`) and decodes to two modules.

use std::collections::{BTreeMap, BTreeSet};

use bitphase_common::MAX_PATTERN_LENGTH;
use byteorder::{BigEndian, ByteOrder, LittleEndian};
use tracing::{debug, warn};

use crate::error::{FormatError, Result, sanitize_preview};
use crate::vt2::{
    MAX_ORNAMENTS, MAX_SAMPLES, Vt2Cell, Vt2Command, Vt2Module, Vt2Note, Vt2Ornament, Vt2Pattern,
    Vt2Row, Vt2Sample, Vt2SampleLine,
};

const PT3_MAGIC: &[u8] = b"ProTracker 3.";
const VT2_MAGIC: &[u8] = b"Vortex Tracker II";

const TITLE_OFFSET: usize = 0x1E;
const AUTHOR_OFFSET: usize = 0x42;
const TEXT_FIELD_LEN: usize = 32;
const NOTE_TABLE_OFFSET: usize = 0x63;
const SPEED_OFFSET: usize = 0x64;
const LOOP_OFFSET: usize = 0x66;
const PATTERNS_PTR_OFFSET: usize = 0x67;
const SAMPLES_PTR_OFFSET: usize = 0x69;
const ORNAMENTS_PTR_OFFSET: usize = 0xA9;
const POSITIONS_OFFSET: usize = 0xC9;
const POSITIONS_END: u8 = 0xFF;

const TS_FOOTER_LEN: usize = 16;

/// Returns `true` when the buffer starts with a PT3 or Vortex Tracker signature.
pub fn is_pt3(data: &[u8]) -> bool {
    data.starts_with(PT3_MAGIC) || data.starts_with(VT2_MAGIC)
}

/// Decodes a PT3 file; TurboSound files yield two modules.
pub fn parse_pt3(data: &[u8]) -> Result<Vec<Vt2Module>> {
    let modules = match split_turbosound(data) {
        Some((first, second)) => {
            debug!(first = first.len(), second = second.len(), "TurboSound PT3");
            vec![
                Pt3Parser { data: first }.parse()?,
                Pt3Parser { data: second }.parse()?,
            ]
        }
        None => vec![Pt3Parser { data }.parse()?],
    };
    Ok(modules)
}

fn split_turbosound(data: &[u8]) -> Option<(&[u8], &[u8])> {
    let footer = data.len().checked_sub(TS_FOOTER_LEN).map(|at| &data[at..])?;
    if &footer[0..4] != b"PT3!" || &footer[6..10] != b"PT3!" || &footer[12..16] != b"02TS" {
        return None;
    }
    let first = usize::from(LittleEndian::read_u16(&footer[4..6]));
    let second = usize::from(LittleEndian::read_u16(&footer[10..12]));
    let body = &data[..data.len() - TS_FOOTER_LEN];
    if first + second > body.len() {
        warn!(first, second, available = body.len(), "TurboSound footer lengths exceed the file");
        return None;
    }
    Some((&body[..first], &body[first..first + second]))
}

struct Pt3Parser<'a> {
    data: &'a [u8],
}

/// Per-channel decoder position inside a pattern.
#[derive(Debug, Clone, Copy)]
struct ChannelCursor {
    offset: usize,
    skip: u16,
    counter: u16,
}

impl<'a> Pt3Parser<'a> {
    fn parse(&self) -> Result<Vt2Module> {
        let head = &self.data[..self.data.len().min(32)];
        if !is_pt3(head) {
            return Err(FormatError::InvalidHeader {
                preview: sanitize_preview(head),
            });
        }
        self.ensure_range(0, POSITIONS_OFFSET + 1)?;

        let version = if self.data.starts_with(PT3_MAGIC) && self.data[13].is_ascii_digit() {
            format!("3.{}", self.data[13] as char)
        } else {
            "3.6".to_string()
        };

        let play_order = self.read_positions()?;
        if play_order.is_empty() {
            return Err(FormatError::EmptyModule);
        }
        let loop_position = usize::from(self.read_u8(LOOP_OFFSET)?);
        let loop_position = if loop_position < play_order.len() {
            loop_position
        } else {
            0
        };

        let patterns_ptr = self.read_pointer(PATTERNS_PTR_OFFSET)?;
        let mut patterns = BTreeMap::new();
        let referenced: BTreeSet<usize> = play_order.iter().copied().collect();
        for index in referenced {
            patterns.insert(index, self.parse_pattern(patterns_ptr, index)?);
        }

        let mut samples = BTreeMap::new();
        for number in 1..=MAX_SAMPLES {
            let field = SAMPLES_PTR_OFFSET + number * 2;
            let pointer = usize::from(self.read_u16(field)?);
            if pointer != 0 {
                samples.insert(number, self.parse_sample(field, pointer)?);
            }
        }

        let mut ornaments = BTreeMap::new();
        for number in 0..=MAX_ORNAMENTS {
            let field = ORNAMENTS_PTR_OFFSET + number * 2;
            let pointer = usize::from(self.read_u16(field)?);
            if pointer != 0 {
                ornaments.insert(number, self.parse_ornament(field, pointer)?);
            }
        }

        let module = Vt2Module {
            title: self.read_text(TITLE_OFFSET),
            author: self.read_text(AUTHOR_OFFSET),
            version,
            note_table: self.read_u8(NOTE_TABLE_OFFSET)?,
            speed: self.read_u8(SPEED_OFFSET)?.max(1),
            play_order,
            loop_position,
            ornaments,
            samples,
            patterns,
            ..Vt2Module::default()
        };
        debug!(
            title = %module.title,
            positions = module.play_order.len(),
            patterns = module.patterns.len(),
            samples = module.samples.len(),
            "decoded PT3 module"
        );
        Ok(module)
    }

    fn read_positions(&self) -> Result<Vec<usize>> {
        let mut positions = Vec::new();
        let mut offset = POSITIONS_OFFSET;
        loop {
            let value = self.read_u8(offset)?;
            if value == POSITIONS_END {
                return Ok(positions);
            }
            positions.push(usize::from(value) / 3);
            offset += 1;
        }
    }

    fn read_text(&self, offset: usize) -> String {
        let end = (offset + TEXT_FIELD_LEN).min(self.data.len());
        let bytes = self.data.get(offset..end).unwrap_or_default();
        bytes
            .iter()
            .map(|&b| if (0x20..0x7F).contains(&b) { b as char } else { ' ' })
            .collect::<String>()
            .trim()
            .to_string()
    }

    fn parse_sample(&self, field: usize, pointer: usize) -> Result<Vt2Sample> {
        self.ensure_pointer(field, pointer, 2)?;
        let loop_point = usize::from(self.read_u8(pointer)?);
        let length = usize::from(self.read_u8(pointer + 1)?);
        self.ensure_pointer(field, pointer, 2 + length * 4)?;

        let lines = (0..length)
            .map(|index| {
                let at = pointer + 2 + index * 4;
                sample_line(
                    self.data[at],
                    self.data[at + 1],
                    LittleEndian::read_i16(&self.data[at + 2..at + 4]),
                )
            })
            .collect::<Vec<_>>();
        Ok(Vt2Sample {
            loop_point: loop_point.min(length.saturating_sub(1)),
            lines,
        })
    }

    fn parse_ornament(&self, field: usize, pointer: usize) -> Result<Vt2Ornament> {
        self.ensure_pointer(field, pointer, 2)?;
        let loop_point = usize::from(self.read_u8(pointer)?);
        let length = usize::from(self.read_u8(pointer + 1)?);
        self.ensure_pointer(field, pointer, 2 + length)?;
        let offsets = self.data[pointer + 2..pointer + 2 + length]
            .iter()
            .map(|&b| b as i8)
            .collect();
        Ok(Vt2Ornament {
            offsets,
            loop_point: loop_point.min(length.saturating_sub(1)),
        })
    }

    fn parse_pattern(&self, table: usize, index: usize) -> Result<Vt2Pattern> {
        let entry = table + index * 6;
        let mut cursors = [0usize; 3];
        for (channel, cursor) in cursors.iter_mut().enumerate() {
            let field = entry + channel * 2;
            let pointer = usize::from(self.read_u16(field)?);
            self.ensure_pointer(field, pointer, 1)?;
            *cursor = pointer;
        }
        let mut channels = cursors.map(|offset| ChannelCursor {
            offset,
            skip: 1,
            counter: 1,
        });

        let mut rows = Vec::new();
        while rows.len() < MAX_PATTERN_LENGTH {
            let mut row = Vt2Row::default();
            for (channel, cursor) in channels.iter_mut().enumerate() {
                cursor.counter -= 1;
                if cursor.counter != 0 {
                    continue;
                }
                if channel == 0 && self.read_u8(cursor.offset)? == 0 {
                    return Ok(Vt2Pattern { rows });
                }
                self.decode_cell(cursor, &mut row, channel)?;
                cursor.counter = cursor.skip;
            }
            rows.push(row);
        }
        warn!(pattern = index, "PT3 pattern has no end marker within {MAX_PATTERN_LENGTH} rows");
        Ok(Vt2Pattern { rows })
    }

    /// Runs one channel's byte code up to the end of its row.
    fn decode_cell(&self, cursor: &mut ChannelCursor, row: &mut Vt2Row, channel: usize) -> Result<()> {
        let mut cell = Vt2Cell::default();
        let mut commands = Vec::new();
        let mut at = cursor.offset;

        loop {
            let op = self.read_u8(at)?;
            at += 1;
            match op {
                0xF0..=0xFF => {
                    cell.ornament = Some(op - 0xF0);
                    cell.envelope = 15;
                    cell.sample = self.read_u8(at)? / 2;
                    at += 1;
                }
                0xD1..=0xEF => cell.sample = op - 0xD0,
                0xD0 => break,
                0xC1..=0xCF => cell.volume = op - 0xC0,
                0xC0 => {
                    cell.note = Vt2Note::Off;
                    break;
                }
                0xB2..=0xBF => {
                    cell.envelope = op - 0xB1;
                    row.envelope_period = self.read_u16_be(at)?;
                    at += 2;
                }
                0xB1 => {
                    let skip = self.read_u8(at)?;
                    cursor.skip = if skip == 0 { 256 } else { u16::from(skip) };
                    at += 1;
                }
                0xB0 => cell.envelope = 15,
                0x50..=0xAF => {
                    cell.note = Vt2Note::Note(op - 0x50);
                    break;
                }
                0x40..=0x4F => cell.ornament = Some(op - 0x40),
                0x20..=0x3F => row.noise = op - 0x20,
                0x11..=0x1F => {
                    cell.envelope = op - 0x10;
                    row.envelope_period = self.read_u16_be(at)?;
                    cell.sample = self.read_u8(at + 2)? / 2;
                    at += 3;
                }
                0x10 => {
                    cell.envelope = 15;
                    cell.sample = self.read_u8(at)? / 2;
                    at += 1;
                }
                0x01..=0x09 => commands.push(op),
                0x00 | 0x0A..=0x0F => {}
            }
        }

        // command parameters trail the row, last flag first
        let mut command = Vt2Command::default();
        for &flag in commands.iter().rev() {
            let (decoded, used) = self.read_command(flag, at)?;
            at += used;
            if let Some(decoded) = decoded {
                command = decoded;
            }
        }
        cell.command = command;

        cursor.offset = at;
        row.channels[channel] = cell;
        Ok(())
    }

    /// Decodes the parameters of one command flag; returns the command and bytes used.
    fn read_command(&self, flag: u8, at: usize) -> Result<(Option<Vt2Command>, usize)> {
        let command = |command: u8, delay: u8, parameter: i32| Vt2Command {
            command,
            delay: delay.min(15),
            parameter: parameter.unsigned_abs().min(255) as u8,
        };
        Ok(match flag {
            1 => {
                let delay = self.read_u8(at)?;
                let step = i32::from(self.read_i16(at + 1)?);
                let code = if step >= 0 { 1 } else { 2 };
                (Some(command(code, delay, step)), 3)
            }
            2 => {
                let delay = self.read_u8(at)?;
                let step = i32::from(self.read_i16(at + 3)?);
                (Some(command(3, delay, step)), 5)
            }
            3 => (Some(command(4, 0, i32::from(self.read_u8(at)?))), 1),
            4 => (Some(command(5, 0, i32::from(self.read_u8(at)?))), 1),
            5 => {
                let on = self.read_u8(at)?.min(15);
                let off = self.read_u8(at + 1)?.min(15);
                (Some(command(6, 0, i32::from(on << 4 | off))), 2)
            }
            8 => {
                let delay = self.read_u8(at)?;
                let step = i32::from(self.read_i16(at + 1)?);
                let code = if step >= 0 { 9 } else { 0xA };
                (Some(command(code, delay, step)), 3)
            }
            9 => (Some(command(0xB, 0, i32::from(self.read_u8(at)?))), 1),
            _ => (None, 0),
        })
    }

    fn read_u8(&self, offset: usize) -> Result<u8> {
        self.ensure_range(offset, 1)?;
        Ok(self.data[offset])
    }

    fn read_u16(&self, offset: usize) -> Result<u16> {
        self.ensure_range(offset, 2)?;
        Ok(LittleEndian::read_u16(&self.data[offset..offset + 2]))
    }

    fn read_i16(&self, offset: usize) -> Result<i16> {
        self.ensure_range(offset, 2)?;
        Ok(LittleEndian::read_i16(&self.data[offset..offset + 2]))
    }

    fn read_u16_be(&self, offset: usize) -> Result<u16> {
        self.ensure_range(offset, 2)?;
        Ok(BigEndian::read_u16(&self.data[offset..offset + 2]))
    }

    fn read_pointer(&self, field: usize) -> Result<usize> {
        let pointer = usize::from(self.read_u16(field)?);
        self.ensure_pointer(field, pointer, 1)?;
        Ok(pointer)
    }

    fn ensure_pointer(&self, field: usize, pointer: usize, size: usize) -> Result<()> {
        if pointer.checked_add(size).is_none_or(|end| end > self.data.len()) {
            return Err(FormatError::PointerOutOfRange {
                offset: field,
                pointer,
            });
        }
        Ok(())
    }

    fn ensure_range(&self, offset: usize, size: usize) -> Result<()> {
        match offset.checked_add(size) {
            Some(end) if end <= self.data.len() => Ok(()),
            _ => Err(FormatError::UnexpectedEof {
                offset: self.data.len().max(offset),
            }),
        }
    }
}

/// Unpacks one 4-byte sample line.
fn sample_line(b0: u8, b1: u8, tone_offset: i16) -> Vt2SampleLine {
    let noise = b1 & 0x80 == 0;
    let raw = (b0 >> 1) & 0x1F;
    let noise_envelope_offset = if noise {
        raw as i8
    } else if raw & 0x10 != 0 {
        (raw | 0xE0) as i8
    } else {
        raw as i8
    };
    let amplitude_slide = match (b0 & 0x80 != 0, b0 & 0x40 != 0) {
        (true, true) => 1,
        (true, false) => -1,
        _ => 0,
    };
    Vt2SampleLine {
        tone: b1 & 0x10 == 0,
        noise,
        envelope: b0 & 0x01 == 0,
        tone_offset,
        tone_accumulate: b1 & 0x40 != 0,
        noise_envelope_offset,
        noise_envelope_accumulate: b1 & 0x20 != 0,
        amplitude: b1 & 0x0F,
        amplitude_slide,
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Builds a minimal single-pattern module around the given channel byte code.
    pub(crate) fn build_module(title: &str, positions: &[u8], channels: [&[u8]; 3]) -> Vec<u8> {
        let mut data = vec![0u8; POSITIONS_OFFSET];
        data[..PT3_MAGIC.len()].copy_from_slice(PT3_MAGIC);
        data[13] = b'5';
        let title = title.as_bytes();
        data[TITLE_OFFSET..TITLE_OFFSET + title.len().min(32)].copy_from_slice(&title[..title.len().min(32)]);
        data[NOTE_TABLE_OFFSET] = 2;
        data[SPEED_OFFSET] = 3;
        data[LOOP_OFFSET] = 0;
        data.extend(positions.iter().map(|p| p * 3));
        data.push(POSITIONS_END);

        // sample 1: one looping line, tone on, amplitude 15
        let sample_at = data.len();
        data.extend([0, 1, 0x01, 0x0F, 0, 0]);
        // ornament 0: a single zero
        let ornament_at = data.len();
        data.extend([0, 1, 0]);

        let patterns = positions.iter().copied().max().unwrap_or(0) as usize + 1;
        let table_at = data.len();
        data.resize(table_at + patterns * 6, 0);
        let mut pointers = [0u16; 3];
        for (channel, code) in channels.iter().enumerate() {
            pointers[channel] = data.len() as u16;
            data.extend_from_slice(code);
        }
        for pattern in 0..patterns {
            for (channel, pointer) in pointers.iter().enumerate() {
                let at = table_at + pattern * 6 + channel * 2;
                data[at..at + 2].copy_from_slice(&pointer.to_le_bytes());
            }
        }

        data[PATTERNS_PTR_OFFSET..PATTERNS_PTR_OFFSET + 2].copy_from_slice(&(table_at as u16).to_le_bytes());
        let field = SAMPLES_PTR_OFFSET + 2;
        data[field..field + 2].copy_from_slice(&(sample_at as u16).to_le_bytes());
        data[ORNAMENTS_PTR_OFFSET..ORNAMENTS_PTR_OFFSET + 2].copy_from_slice(&(ornament_at as u16).to_le_bytes());
        data
    }

    #[test]
    fn rejects_unknown_magic() {
        let data = b"PK\x03\x04not a tracker module at all, really";
        match parse_pt3(data) {
            Err(FormatError::InvalidHeader { preview }) => {
                assert!(preview.starts_with("PK..not a tracker"));
                assert_eq!(preview.len(), 32);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn truncated_header_is_eof() {
        let mut data = PT3_MAGIC.to_vec();
        data.extend([b'5'; 40]);
        assert!(matches!(parse_pt3(&data), Err(FormatError::UnexpectedEof { .. })));
    }

    #[test]
    fn decodes_header_fields() {
        let code: &[u8] = &[0xD0, 0x00];
        let data = build_module("Demo tune", &[0, 0], [code, &[0xD0], &[0xD0]]);
        let module = parse_pt3(&data).unwrap().remove(0);
        assert_eq!(module.title, "Demo tune");
        assert_eq!(module.version, "3.5");
        assert_eq!(module.note_table, 2);
        assert_eq!(module.speed, 3);
        assert_eq!(module.play_order, vec![0, 0]);
        assert_eq!(module.patterns[&0].rows.len(), 1);
        assert_eq!(module.samples[&1].lines[0].amplitude, 15);
        assert!(module.samples[&1].lines[0].tone);
        assert!(!module.samples[&1].lines[0].envelope);
        assert_eq!(module.ornaments[&0].offsets, vec![0]);
    }

    #[test]
    fn decodes_opcodes() {
        let a: &[u8] = &[
            0xF1, 0x02, // ornament 1, sample 1, envelope off
            0xCC, // volume 12
            0x01, // slide command flag
            0x50 + 48, // C-5, ends the row
            0x02, 0x10, 0x00, // slide params: delay 2, +16
            0xB1, 0x02, // skip 2
            0xC0, // key off
            0x00,
        ];
        let b: &[u8] = &[0xB4, 0x01, 0x20, 0xD0, 0xD0, 0xD0];
        let c: &[u8] = &[0x25, 0x09, 0xD0, 0x06, 0xD0, 0xD0];
        let data = build_module("", &[0], [a, b, c]);
        let pattern = &parse_pt3(&data).unwrap()[0].patterns[&0];
        assert_eq!(pattern.rows.len(), 3);

        let first = &pattern.rows[0];
        let cell = &first.channels[0];
        assert_eq!(cell.note, Vt2Note::Note(48));
        assert_eq!((cell.sample, cell.ornament, cell.envelope, cell.volume), (1, Some(1), 15, 12));
        assert_eq!(cell.command, Vt2Command { command: 1, delay: 2, parameter: 16 });
        assert_eq!(first.channels[1].envelope, 3);
        assert_eq!(first.envelope_period, 0x0120);
        assert_eq!(first.noise, 5);
        assert_eq!(first.channels[2].command, Vt2Command { command: 0xB, delay: 0, parameter: 6 });

        // the key off sets skip 2, so channel A is silent on the next row
        assert_eq!(pattern.rows[1].channels[0].note, Vt2Note::Off);
        assert_eq!(pattern.rows[2].channels[0], Vt2Cell::default());
    }

    #[test]
    fn sample_line_bits() {
        // envelope masked, slide down, noise off so the offset is a signed envelope offset
        let line = sample_line(0x80 | (0x1E << 1) | 0x01, 0x80 | 0x40 | 0x0A, -3);
        assert!(!line.envelope);
        assert!(!line.noise);
        assert!(line.tone);
        assert!(line.tone_accumulate);
        assert_eq!(line.noise_envelope_offset, -2);
        assert_eq!(line.amplitude, 10);
        assert_eq!(line.amplitude_slide, -1);
        assert_eq!(line.tone_offset, -3);
    }

    #[test]
    fn splits_turbosound_files() {
        let code: &[u8] = &[0xD0, 0x00];
        let first = build_module("one", &[0], [code, &[0xD0], &[0xD0]]);
        let second = build_module("two", &[0, 0], [code, &[0xD0], &[0xD0]]);
        let mut data = first.clone();
        data.extend(&second);
        data.extend(b"PT3!");
        data.extend((first.len() as u16).to_le_bytes());
        data.extend(b"PT3!");
        data.extend((second.len() as u16).to_le_bytes());
        data.extend(b"02TS");
        let modules = parse_pt3(&data).unwrap();
        assert_eq!(modules.len(), 2);
        assert_eq!(modules[0].title, "one");
        assert_eq!(modules[1].play_order, vec![0, 0]);
    }
}
