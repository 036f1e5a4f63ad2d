//! VT2 text writer.

use std::fmt::Write as _;

use bitphase_ay::Note;

use super::{Vt2Cell, Vt2Command, Vt2Module, Vt2Note, Vt2Ornament, Vt2Row, Vt2Sample, Vt2SampleLine};

/// Writes one or more modules; two modules form a TurboSound file.
pub fn write_vt2(modules: &[Vt2Module]) -> String {
    let mut out = String::new();
    for module in modules {
        write_module_into(&mut out, module);
    }
    out
}

/// Writes a single module.
pub fn write_module(module: &Vt2Module) -> String {
    let mut out = String::new();
    write_module_into(&mut out, module);
    out
}

fn write_module_into(out: &mut String, module: &Vt2Module) {
    // writing into a String cannot fail
    let _ = writeln!(out, "[Module]");
    let _ = writeln!(out, "VortexTrackerII=1");
    let _ = writeln!(out, "Version={}", module.version);
    let _ = writeln!(out, "Title={}", module.title);
    let _ = writeln!(out, "Author={}", module.author);
    let _ = writeln!(out, "NoteTable={}", module.note_table);
    let _ = writeln!(out, "ChipFreq={}", module.chip_freq);
    let _ = writeln!(out, "IntFreq={}", module.int_freq);
    let _ = writeln!(out, "Speed={}", module.speed);
    let _ = writeln!(out, "PlayOrder={}", play_order(module));
    out.push('\n');

    for (number, ornament) in &module.ornaments {
        let _ = writeln!(out, "[Ornament{number}]");
        let _ = writeln!(out, "{}", ornament_line(ornament));
        out.push('\n');
    }

    for (number, sample) in &module.samples {
        let _ = writeln!(out, "[Sample{number}]");
        write_sample(out, sample);
        out.push('\n');
    }

    for (number, pattern) in &module.patterns {
        let _ = writeln!(out, "[Pattern{number}]");
        for row in &pattern.rows {
            let _ = writeln!(out, "{}", row_text(row));
        }
        out.push('\n');
    }
}

fn play_order(module: &Vt2Module) -> String {
    module
        .play_order
        .iter()
        .enumerate()
        .map(|(index, pattern)| {
            if index == module.loop_position {
                format!("L{pattern}")
            } else {
                pattern.to_string()
            }
        })
        .collect::<Vec<_>>()
        .join(",")
}

fn ornament_line(ornament: &Vt2Ornament) -> String {
    ornament
        .offsets
        .iter()
        .enumerate()
        .map(|(index, offset)| {
            if index == ornament.loop_point {
                format!("L{offset}")
            } else {
                offset.to_string()
            }
        })
        .collect::<Vec<_>>()
        .join(",")
}

fn write_sample(out: &mut String, sample: &Vt2Sample) {
    for (index, line) in sample.lines.iter().enumerate() {
        out.push_str(&sample_line(line));
        if index == sample.loop_point {
            out.push_str(" L");
        }
        out.push('\n');
    }
}

fn flag(on: bool, upper: char) -> char {
    if on { upper } else { upper.to_ascii_lowercase() }
}

fn signed_hex(value: i32, width: usize) -> String {
    let sign = if value < 0 { '-' } else { '+' };
    format!("{sign}{:0width$X}", value.unsigned_abs())
}

/// `TNE +000_ +00_ F_`
pub(crate) fn sample_line(line: &Vt2SampleLine) -> String {
    let accumulate = |on: bool| if on { '^' } else { '_' };
    let slide = match line.amplitude_slide.signum() {
        1 => '+',
        -1 => '-',
        _ => '_',
    };
    format!(
        "{}{}{} {}{} {}{} {:X}{}",
        flag(line.tone, 'T'),
        flag(line.noise, 'N'),
        flag(line.envelope, 'E'),
        signed_hex(i32::from(line.tone_offset), 3),
        accumulate(line.tone_accumulate),
        signed_hex(i32::from(line.noise_envelope_offset), 2),
        accumulate(line.noise_envelope_accumulate),
        line.amplitude & 0x0F,
        slide,
    )
}

fn digit(value: u8, radix: u32) -> char {
    if value == 0 {
        return '.';
    }
    char::from_digit(u32::from(value), radix)
        .map(|c| c.to_ascii_uppercase())
        .unwrap_or('.')
}

fn note_text(note: Vt2Note) -> String {
    match note {
        Vt2Note::Empty => "---".to_string(),
        Vt2Note::Off => "R--".to_string(),
        Vt2Note::Note(index) => Note::from_index(usize::from(index))
            .map(|n| n.to_text())
            .unwrap_or_else(|| "---".to_string()),
    }
}

fn command_text(command: &Vt2Command) -> String {
    if command.is_empty() {
        return "....".to_string();
    }
    format!(
        "{}{}{:02X}",
        digit(command.command, 16),
        char::from_digit(u32::from(command.delay & 0x0F), 16)
            .map(|c| c.to_ascii_uppercase())
            .unwrap_or('0'),
        command.parameter
    )
}

/// `C-4 1F.F 1102`
pub(crate) fn cell_text(cell: &Vt2Cell) -> String {
    let ornament = match cell.ornament {
        None => '.',
        Some(0) => '0',
        Some(n) => digit(n, 16),
    };
    format!(
        "{} {}{}{}{} {}",
        note_text(cell.note),
        digit(cell.sample, 36),
        digit(cell.envelope, 16),
        ornament,
        digit(cell.volume, 16),
        command_text(&cell.command)
    )
}

/// `EEEE|NN|cell|cell|cell`
pub(crate) fn row_text(row: &Vt2Row) -> String {
    let envelope = if row.envelope_period == 0 {
        "....".to_string()
    } else {
        format!("{:04X}", row.envelope_period)
    };
    let noise = if row.noise == 0 {
        "..".to_string()
    } else {
        format!("{:02X}", row.noise)
    };
    let cells: Vec<String> = row.channels.iter().map(cell_text).collect();
    format!("{envelope}|{noise}|{}", cells.join("|"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_a_row() {
        let mut row = Vt2Row {
            envelope_period: 0x1A0,
            noise: 0,
            ..Vt2Row::default()
        };
        row.channels[0] = Vt2Cell {
            note: Vt2Note::Note(39),
            sample: 1,
            envelope: 15,
            ornament: Some(0),
            volume: 15,
            command: Vt2Command {
                command: 1,
                delay: 1,
                parameter: 2,
            },
        };
        row.channels[1].note = Vt2Note::Off;
        assert_eq!(
            row_text(&row),
            "01A0|..|D#4 1F0F 1102|R-- .... ....|--- .... ...."
        );
    }

    #[test]
    fn formats_sample_lines() {
        let line = Vt2SampleLine {
            tone: true,
            noise: false,
            envelope: true,
            tone_offset: -0x12,
            tone_accumulate: true,
            noise_envelope_offset: 5,
            noise_envelope_accumulate: false,
            amplitude: 12,
            amplitude_slide: -1,
        };
        assert_eq!(sample_line(&line), "TnE -012^ +05_ C-");
    }
}
