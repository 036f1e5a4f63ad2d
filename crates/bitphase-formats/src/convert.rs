//! Conversion of decoded modules into a [`Project`].
//!
//! A single module becomes a one-song project. Two modules (TurboSound)
//! become a two-song project sharing one pattern order: when the play orders
//! differ, every distinct pair of per-chip pattern numbers at an order slot
//! gets its own unified pattern id.

use std::collections::{BTreeMap, BTreeSet};

use bitphase_ay::{
    HARDWARE_CHANNELS, Instrument, InstrumentRow, Note, Pattern, PatternRow, Project, Row, Song,
    TABLE_OFF, Table, resolve_tuning_table,
};
use bitphase_common::effect::codes;
use bitphase_common::{Effect, FRAME_RATE_PAL, TuningRequest};
use tracing::{debug, info};

use crate::error::{FormatError, Result};
use crate::vt2::{Vt2Cell, Vt2Command, Vt2Module, Vt2Note, Vt2Row, Vt2SampleLine};

/// Builds a project from one module, or merges two TurboSound modules.
pub fn modules_to_project(modules: &[Vt2Module]) -> Result<Project> {
    let project = match modules {
        [] => return Err(FormatError::EmptyModule),
        [single] => single_chip(single)?,
        [first, second, rest @ ..] => {
            if !rest.is_empty() {
                debug!(ignored = rest.len(), "only two chips are merged");
            }
            merge_turbosound(first, second)?
        }
    };
    project.validate()?;
    info!(
        name = %project.name,
        songs = project.songs.len(),
        positions = project.pattern_order.len(),
        instruments = project.instruments.len(),
        "imported module"
    );
    Ok(project)
}

/// One module converted with its instrument and table ids shifted.
struct ChipImport {
    song: Song,
    instruments: Vec<Instrument>,
    tables: Vec<Table>,
    order: Vec<usize>,
}

/// Id shifts applied to a chip's instruments and tables.
#[derive(Debug, Clone, Copy, Default)]
struct IdOffsets {
    instrument: u16,
    table: i32,
}

fn single_chip(module: &Vt2Module) -> Result<Project> {
    let chip = import_chip(module, IdOffsets::default())?;
    Ok(Project {
        name: module.title.clone(),
        author: module.author.clone(),
        songs: vec![chip.song],
        pattern_order: chip.order,
        tables: chip.tables,
        instruments: chip.instruments,
        pattern_order_colors: BTreeMap::new(),
        loop_point_id: module.loop_position,
    })
}

fn merge_turbosound(first: &Vt2Module, second: &Vt2Module) -> Result<Project> {
    let one = import_chip(first, IdOffsets::default())?;
    let offsets = IdOffsets {
        instrument: one.instruments.iter().map(|i| i.id).max().unwrap_or(0),
        table: one.tables.iter().map(|t| t.id).max().unwrap_or(0),
    };
    let two = import_chip(second, offsets)?;

    let (order, song_one, song_two) = if one.order == two.order {
        (one.order.clone(), one.song, two.song)
    } else {
        unify_orders(&one, &two)
    };
    debug!(
        positions = order.len(),
        instrument_offset = offsets.instrument,
        table_offset = offsets.table,
        "merged TurboSound modules"
    );

    let mut instruments = one.instruments;
    instruments.extend(two.instruments);
    let mut tables = one.tables;
    tables.extend(two.tables);

    Ok(Project {
        name: first.title.clone(),
        author: first.author.clone(),
        songs: vec![song_one, song_two],
        pattern_order: order,
        tables,
        instruments,
        pattern_order_colors: BTreeMap::new(),
        loop_point_id: first.loop_position,
    })
}

/// Pairs the two play orders slot by slot and renumbers patterns into one id space.
fn unify_orders(one: &ChipImport, two: &ChipImport) -> (Vec<usize>, Song, Song) {
    let slots = one.order.len().max(two.order.len());
    let mut ids: BTreeMap<(Option<usize>, Option<usize>), usize> = BTreeMap::new();
    let mut pairs = Vec::new();
    let mut order = Vec::with_capacity(slots);
    for slot in 0..slots {
        let key = (one.order.get(slot).copied(), two.order.get(slot).copied());
        let next = ids.len();
        let id = *ids.entry(key).or_insert_with(|| {
            pairs.push(key);
            next
        });
        order.push(id);
    }

    let mut song_one = Song {
        patterns: Vec::new(),
        ..one.song.clone()
    };
    let mut song_two = Song {
        patterns: Vec::new(),
        ..two.song.clone()
    };
    for (id, &(left, right)) in pairs.iter().enumerate() {
        let left = left.and_then(|n| one.song.pattern(n));
        let right = right.and_then(|n| two.song.pattern(n));
        let length = left.or(right).map_or(1, |p| p.length);
        song_one.patterns.push(paired_pattern(left, id, length));
        song_two.patterns.push(paired_pattern(right, id, length));
    }

    // patterns outside the play order are kept under fresh ids
    let mut next_id = pairs.len();
    for (source, target) in [(one, &mut song_one), (two, &mut song_two)] {
        let referenced: BTreeSet<usize> = source.order.iter().copied().collect();
        for pattern in source.song.patterns.iter().filter(|p| !referenced.contains(&p.id)) {
            target.patterns.push(pattern.clone_with_id(next_id));
            next_id += 1;
        }
    }

    (order, song_one, song_two)
}

fn paired_pattern(source: Option<&Pattern>, id: usize, length: usize) -> Pattern {
    match source {
        Some(pattern) => pattern.clone_with_id(id),
        None => Pattern::new(id, length, HARDWARE_CHANNELS),
    }
}

fn import_chip(module: &Vt2Module, offsets: IdOffsets) -> Result<ChipImport> {
    if module.play_order.is_empty() || module.patterns.is_empty() {
        return Err(FormatError::EmptyModule);
    }

    let interrupt_frequency = if module.int_freq == 0 {
        f64::from(FRAME_RATE_PAL)
    } else {
        f64::from(module.int_freq) / 1000.0
    };
    let mut song = Song {
        chip_frequency: module.chip_freq,
        interrupt_frequency,
        initial_speed: module.speed.max(1),
        note_table: module.note_table,
        ..Song::default()
    };
    song.tuning_table = resolve_tuning_table(&TuningRequest {
        chip_frequency: song.chip_frequency,
        note_table: song.note_table,
    });
    song.patterns = module
        .patterns
        .iter()
        .map(|(&number, pattern)| convert_pattern(number, &pattern.rows, offsets))
        .collect();

    let instruments = module
        .samples
        .iter()
        .map(|(&number, sample)| Instrument {
            id: number as u16 + offsets.instrument,
            name: format!("Sample {number}"),
            rows: sample.lines.iter().map(instrument_row).collect(),
            loop_point: sample.loop_point,
        })
        .collect();

    // ornament 0 is the module's "no ornament" slot
    let tables = module
        .ornaments
        .iter()
        .filter(|&(&number, _)| number > 0)
        .map(|(&number, ornament)| Table {
            id: number as i32 + offsets.table,
            name: format!("Ornament {number}"),
            rows: ornament.offsets.iter().map(|&o| i32::from(o)).collect(),
            loop_point: ornament.loop_point,
        })
        .collect();

    Ok(ChipImport {
        song,
        instruments,
        tables,
        order: module.play_order.clone(),
    })
}

fn convert_pattern(number: usize, rows: &[Vt2Row], offsets: IdOffsets) -> Pattern {
    let mut pattern = Pattern::new(number, rows.len().max(1), HARDWARE_CHANNELS);
    for (index, row) in rows.iter().enumerate() {
        pattern.pattern_rows[index] = PatternRow {
            envelope_value: row.envelope_period,
            noise_value: row.noise,
            envelope_effect: None,
        };
        for (channel, cell) in row.channels.iter().enumerate() {
            pattern.channels[channel].rows[index] = convert_cell(cell, offsets);
        }
    }
    pattern
}

fn convert_cell(cell: &Vt2Cell, offsets: IdOffsets) -> Row {
    let note = match cell.note {
        Vt2Note::Empty => Note::none(),
        Vt2Note::Off => Note::off(),
        Vt2Note::Note(index) => Note::from_index(usize::from(index)).unwrap_or_else(Note::none),
    };
    let table = match cell.ornament {
        None => 0,
        Some(0) => TABLE_OFF,
        Some(n) => i32::from(n) + offsets.table,
    };
    let instrument = match cell.sample {
        0 => 0,
        n => u16::from(n) + offsets.instrument,
    };
    Row {
        note,
        effects: [command_effect(&cell.command)],
        instrument,
        envelope_shape: cell.envelope,
        table,
        volume: cell.volume,
    }
}

/// Maps a tracker command onto the effect code table.
fn command_effect(command: &Vt2Command) -> Option<Effect> {
    let code = match command.command {
        0 => return None,
        0xA => codes::ENVELOPE_SLIDE_UP,
        0xB => codes::SPEED,
        code @ (1..=6 | 9) => code,
        other => {
            debug!(command = other, "dropping unsupported tracker command");
            return None;
        }
    };
    Some(Effect::new(code, command.delay, command.parameter))
}

fn instrument_row(line: &Vt2SampleLine) -> InstrumentRow {
    InstrumentRow {
        tone: line.tone,
        noise: line.noise,
        envelope: line.envelope,
        tone_add: line.tone_offset,
        tone_accumulation: line.tone_accumulate,
        noise_envelope_add: line.noise_envelope_offset,
        noise_envelope_accumulation: line.noise_envelope_accumulate,
        volume: line.amplitude,
        volume_slide: line.amplitude_slide,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vt2::{Vt2Ornament, Vt2Pattern, Vt2Sample};
    use pretty_assertions::assert_eq;

    fn module(order: &[usize], patterns: &[usize]) -> Vt2Module {
        let mut module = Vt2Module {
            play_order: order.to_vec(),
            ..Vt2Module::default()
        };
        for &number in patterns {
            let mut row = Vt2Row::default();
            // tag every pattern with its own number
            row.channels[0].note = Vt2Note::Note(number as u8);
            row.channels[0].sample = 1;
            row.channels[0].ornament = Some(1);
            module.patterns.insert(number, Vt2Pattern { rows: vec![row; 4] });
        }
        module.samples.insert(
            1,
            Vt2Sample {
                lines: vec![Vt2SampleLine::default()],
                loop_point: 0,
            },
        );
        module.samples.insert(
            2,
            Vt2Sample {
                lines: vec![Vt2SampleLine::default()],
                loop_point: 0,
            },
        );
        module.ornaments.insert(0, Vt2Ornament::default());
        module.ornaments.insert(
            1,
            Vt2Ornament {
                offsets: vec![0, 12],
                loop_point: 0,
            },
        );
        module
    }

    fn tag(song: &Song, id: usize) -> Option<usize> {
        song.pattern(id)?.channels[0].rows[0].note.index()
    }

    #[test]
    fn single_module_keeps_ids() {
        let project = modules_to_project(&[module(&[1, 0, 1], &[0, 1])]).unwrap();
        assert_eq!(project.songs.len(), 1);
        assert_eq!(project.pattern_order, vec![1, 0, 1]);
        assert_eq!(tag(&project.songs[0], 1), Some(1));
        assert_eq!(project.tables.len(), 1);
        assert_eq!(project.songs[0].tuning_table.len(), bitphase_ay::NOTE_COUNT);
        assert_eq!(project.songs[0].interrupt_frequency, 50.0);
    }

    #[test]
    fn identical_orders_keep_pattern_ids() {
        let project =
            modules_to_project(&[module(&[0, 1], &[0, 1]), module(&[0, 1], &[0, 1])]).unwrap();
        assert_eq!(project.pattern_order, vec![0, 1]);
        assert_eq!(tag(&project.songs[1], 1), Some(1));
    }

    #[test]
    fn differing_orders_are_unified() {
        let project = modules_to_project(&[
            module(&[0, 1, 2], &[0, 1, 2]),
            module(&[0, 1, 3], &[0, 1, 3]),
        ])
        .unwrap();
        assert_eq!(project.pattern_order, vec![0, 1, 2]);
        assert_eq!(tag(&project.songs[0], 2), Some(2));
        assert_eq!(tag(&project.songs[1], 2), Some(3));
    }

    #[test]
    fn repeated_pairs_reuse_ids() {
        let project = modules_to_project(&[
            module(&[0, 1, 0, 1], &[0, 1]),
            module(&[2, 2, 2, 3], &[2, 3]),
        ])
        .unwrap();
        // pairs (0,2) (1,2) (0,2) (1,3)
        assert_eq!(project.pattern_order, vec![0, 1, 0, 2]);
        assert_eq!(tag(&project.songs[1], 2), Some(3));
    }

    #[test]
    fn unreferenced_patterns_survive_under_fresh_ids() {
        let project = modules_to_project(&[
            module(&[0], &[0, 5]),
            module(&[1], &[1]),
        ])
        .unwrap();
        assert_eq!(project.pattern_order, vec![0]);
        assert_eq!(tag(&project.songs[0], 0), Some(0));
        assert_eq!(tag(&project.songs[1], 0), Some(1));
        assert_eq!(tag(&project.songs[0], 1), Some(5));
        assert!(project.songs[1].pattern(1).is_none());
    }

    #[test]
    fn second_chip_ids_are_offset() {
        let project =
            modules_to_project(&[module(&[0], &[0]), module(&[0], &[0])]).unwrap();
        let ids: Vec<u16> = project.instruments.iter().map(|i| i.id).collect();
        assert_eq!(ids, vec![1, 2, 3, 4]);
        let table_ids: Vec<i32> = project.tables.iter().map(|t| t.id).collect();
        assert_eq!(table_ids, vec![1, 2]);

        let row = &project.songs[1].patterns[0].channels[0].rows[0];
        assert_eq!(row.instrument, 3);
        assert_eq!(row.table, 2);
        assert_eq!(project.songs[0].patterns[0].channels[0].rows[0].instrument, 1);
    }

    #[test]
    fn commands_map_to_effects() {
        let slide = Vt2Command {
            command: 0xA,
            delay: 1,
            parameter: 4,
        };
        let effect = command_effect(&slide).unwrap();
        assert_eq!(effect, Effect::new(codes::ENVELOPE_SLIDE_UP, 1, 4));
        assert_eq!(command_effect(&Vt2Command::default()), None);
        let speed = Vt2Command {
            command: 0xB,
            delay: 0,
            parameter: 5,
        };
        assert_eq!(command_effect(&speed).unwrap().effect, codes::SPEED);
    }

    #[test]
    fn empty_module_is_rejected() {
        assert!(matches!(
            modules_to_project(&[Vt2Module::default()]),
            Err(FormatError::EmptyModule)
        ));
        assert!(matches!(modules_to_project(&[]), Err(FormatError::EmptyModule)));
    }
}
