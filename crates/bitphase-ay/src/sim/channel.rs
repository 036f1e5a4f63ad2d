//! Per-channel playback state.
//!
//! A channel is driven twice: once per row (`apply_row`, tick 0 only) and once
//! per tick (`tick`), which produces the channel's register values and then
//! advances every iterator (instrument, table, arpeggio, vibrato, slides).

use std::collections::HashMap;

use bitphase_common::Effect;
use bitphase_common::effect::codes;
use tracing::{trace, warn};

use super::registers::{ChannelRegisters, MixerState};
use crate::note::NOTE_COUNT;
use crate::pattern::{ENVELOPE_SHAPE_OFF, Row, TABLE_OFF};
use crate::project::{Instrument, InstrumentRow, Project, Table, next_looped};
use crate::tuning::MAX_TONE_PERIOD;

/// Instrument step used when a channel has no (or an unknown) instrument.
const FALLBACK_ROW: InstrumentRow = InstrumentRow {
    tone: true,
    noise: false,
    envelope: true,
    tone_add: 0,
    tone_accumulation: false,
    noise_envelope_add: 0,
    noise_envelope_accumulation: false,
    volume: 15,
    volume_slide: 0,
};

/// Instruments, tables and tuning of the song being played.
#[derive(Debug)]
pub(crate) struct Lookup<'a> {
    instruments: HashMap<u16, &'a Instrument>,
    tables: HashMap<i32, &'a Table>,
    tuning: &'a [u16],
}

impl<'a> Lookup<'a> {
    pub(crate) fn new(project: &'a Project, tuning: &'a [u16]) -> Self {
        Self {
            instruments: project.instruments.iter().map(|i| (i.id, i)).collect(),
            tables: project.tables.iter().map(|t| (t.id, t)).collect(),
            tuning,
        }
    }

    fn instrument(&self, id: u16) -> Option<&'a Instrument> {
        self.instruments.get(&id).copied()
    }

    fn table(&self, id: i32) -> Option<&'a Table> {
        self.tables.get(&id).copied()
    }

    fn period(&self, note: i32) -> i32 {
        let index = note.clamp(0, NOTE_COUNT as i32 - 1) as usize;
        self.tuning.get(index).copied().map_or(0, i32::from)
    }
}

/// Stepped offset: adds `step` to `current` every `delay` ticks (at least 1).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct Slide {
    pub(crate) step: i32,
    pub(crate) delay: u8,
    pub(crate) counter: u8,
    pub(crate) current: i32,
}

impl Slide {
    pub(crate) fn start(&mut self, step: i32, delay: u8) {
        self.step = step;
        self.delay = delay;
        self.counter = delay.max(1);
    }

    /// Returns `true` when a step was applied.
    pub(crate) fn advance(&mut self) -> bool {
        if self.step == 0 {
            return false;
        }
        self.counter = self.counter.saturating_sub(1);
        if self.counter > 0 {
            return false;
        }
        self.counter = self.delay.max(1);
        self.current += self.step;
        true
    }
}

/// Envelope slide requested by a row (`step`, `delay`).
pub(crate) fn envelope_slide_of(effect: &Effect) -> Option<(i32, u8)> {
    let parameter = i32::from(effect.parameter);
    match effect.effect {
        codes::ENVELOPE_SLIDE_DOWN => Some((parameter, effect.delay)),
        codes::ENVELOPE_SLIDE_UP => Some((-parameter, effect.delay)),
        _ => None,
    }
}

/// Looping list of offsets stepped every `delay` ticks.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct Sequence {
    values: Vec<i32>,
    loop_point: usize,
    position: usize,
    delay: u8,
    counter: u8,
}

impl Sequence {
    fn new(values: Vec<i32>, loop_point: usize, delay: u8) -> Self {
        Self {
            values,
            loop_point,
            position: 0,
            delay,
            counter: delay.max(1),
        }
    }

    fn from_table(table: Option<&Table>, delay: u8) -> Self {
        match table {
            Some(table) => Self::new(table.rows.clone(), table.loop_point, delay),
            None => Self::default(),
        }
    }

    fn current(&self) -> i32 {
        self.values.get(self.position).copied().unwrap_or(0)
    }

    fn advance(&mut self) {
        if self.values.is_empty() {
            return;
        }
        self.counter = self.counter.saturating_sub(1);
        if self.counter > 0 {
            return;
        }
        self.counter = self.delay.max(1);
        self.position = next_looped(self.position, self.values.len(), self.loop_point);
    }

    fn restart(&mut self) {
        self.position = 0;
        self.counter = self.delay.max(1);
    }
}

/// Triangle vibrato, or a table of period offsets.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
enum Vibrato {
    #[default]
    Off,
    Wave {
        speed: u32,
        depth: i32,
        phase: u32,
    },
    Table(Sequence),
}

impl Vibrato {
    fn from_effect(effect: &Effect, lookup: &Lookup<'_>) -> Self {
        if let Some(index) = effect.table_index {
            return Vibrato::Table(Sequence::from_table(
                lookup.table(i32::from(index)),
                effect.delay,
            ));
        }
        let (speed, depth) = (effect.param_hi(), effect.param_lo());
        if speed == 0 || depth == 0 {
            return Vibrato::Off;
        }
        Vibrato::Wave {
            speed: u32::from(speed),
            depth: i32::from(depth),
            phase: 0,
        }
    }

    fn offset(&self) -> i32 {
        match self {
            Vibrato::Off => 0,
            Vibrato::Wave {
                speed,
                depth,
                phase,
            } => {
                let s = *speed as i32;
                let p = (*phase % (4 * speed)) as i32;
                let wave = if p < s {
                    p
                } else if p < 3 * s {
                    2 * s - p
                } else {
                    p - 4 * s
                };
                wave * depth / s
            }
            Vibrato::Table(sequence) => sequence.current(),
        }
    }

    fn advance(&mut self) {
        match self {
            Vibrato::Off => {}
            Vibrato::Wave { phase, .. } => *phase = phase.wrapping_add(1),
            Vibrato::Table(sequence) => sequence.advance(),
        }
    }

    fn restart(&mut self) {
        match self {
            Vibrato::Off => {}
            Vibrato::Wave { phase, .. } => *phase = 0,
            Vibrato::Table(sequence) => sequence.restart(),
        }
    }
}

/// On/off gating (effect 6).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Gate {
    on: u8,
    off: u8,
    counter: u8,
    open: bool,
}

impl Gate {
    fn new(on: u8, off: u8) -> Option<Self> {
        if on == 0 && off == 0 {
            return None;
        }
        Some(Self {
            on: on.max(1),
            off: off.max(1),
            counter: on.max(1),
            open: true,
        })
    }

    fn advance(&mut self) {
        self.counter = self.counter.saturating_sub(1);
        if self.counter == 0 {
            self.open = !self.open;
            self.counter = if self.open { self.on } else { self.off };
        }
    }

    fn restart(&mut self) {
        self.open = true;
        self.counter = self.on;
    }
}

/// Song-level changes requested by a channel row.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct RowOutcome {
    pub(crate) speed: Option<u8>,
    pub(crate) envelope_shape: Option<u8>,
    pub(crate) envelope_slide: Option<(i32, u8)>,
}

/// Register contribution of one channel for one tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct ChannelOutput {
    pub(crate) registers: ChannelRegisters,
    /// Noise period offset, present when noise is enabled.
    pub(crate) noise_add: Option<i32>,
    /// Envelope period offset, present when the envelope is in use.
    pub(crate) envelope_add: Option<i32>,
    /// Whether the channel produces sound this tick.
    pub(crate) sounding: bool,
}

/// Playback state of one pattern channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ChannelState {
    active: bool,
    note: usize,
    volume: u8,
    envelope_enabled: bool,
    instrument: Option<u16>,
    instrument_position: usize,
    table: Option<i32>,
    table_position: usize,
    tone_accumulator: i32,
    noise_envelope_accumulator: i32,
    amplitude_slide: i32,
    tone_slide: Slide,
    portamento: bool,
    arpeggio: Sequence,
    vibrato: Vibrato,
    detune: i32,
    gate: Option<Gate>,
    last_period: i32,
}

impl Default for ChannelState {
    fn default() -> Self {
        Self {
            active: false,
            note: 0,
            volume: 15,
            envelope_enabled: false,
            instrument: None,
            instrument_position: 0,
            table: None,
            table_position: 0,
            tone_accumulator: 0,
            noise_envelope_accumulator: 0,
            amplitude_slide: 0,
            tone_slide: Slide::default(),
            portamento: false,
            arpeggio: Sequence::default(),
            vibrato: Vibrato::Off,
            detune: 0,
            gate: None,
            last_period: 0,
        }
    }
}

impl ChannelState {
    /// Applies the row's fields; only called on tick 0.
    pub(crate) fn apply_row(&mut self, row: &Row, lookup: &Lookup<'_>) -> RowOutcome {
        let mut outcome = RowOutcome::default();

        if row.instrument > 0 {
            if lookup.instrument(row.instrument).is_none() {
                warn!(instrument = row.instrument, "row references a missing instrument");
            }
            self.instrument = Some(row.instrument);
        }

        match row.table {
            0 => {}
            TABLE_OFF => self.table = None,
            id => {
                if lookup.table(id).is_none() {
                    warn!(table = id, "row references a missing table");
                }
                self.table = Some(id);
                self.table_position = 0;
            }
        }

        if row.volume > 0 {
            self.volume = row.volume.min(15);
        }

        match row.envelope_shape {
            0 => {}
            ENVELOPE_SHAPE_OFF => self.envelope_enabled = false,
            shape => {
                self.envelope_enabled = true;
                outcome.envelope_shape = Some(shape);
            }
        }

        let portamento = row
            .effect()
            .filter(|e| e.effect == codes::PORTAMENTO)
            .copied();

        if row.note.is_off() {
            self.active = false;
            self.tone_slide = Slide::default();
            self.portamento = false;
        } else if let Some(index) = row.note.index() {
            self.start_note(index, portamento, lookup);
        }

        if let Some(effect) = row.effect() {
            self.apply_effect(effect, lookup, &mut outcome);
        }
        outcome
    }

    fn start_note(&mut self, index: usize, portamento: Option<Effect>, lookup: &Lookup<'_>) {
        let was_active = self.active;
        let previous_period = self.last_period;

        self.active = true;
        self.note = index;
        self.instrument_position = 0;
        self.table_position = 0;
        self.tone_accumulator = 0;
        self.noise_envelope_accumulator = 0;
        self.amplitude_slide = 0;
        self.arpeggio.restart();
        self.vibrato.restart();
        if let Some(gate) = &mut self.gate {
            gate.restart();
        }

        match portamento {
            Some(effect) if was_active && effect.parameter > 0 => {
                let distance = previous_period - lookup.period(index as i32);
                let step = i32::from(effect.parameter);
                self.tone_slide = Slide::default();
                self.tone_slide.current = distance;
                self.tone_slide
                    .start(if distance > 0 { -step } else { step }, effect.delay);
                self.portamento = distance != 0;
                if !self.portamento {
                    self.tone_slide.step = 0;
                }
            }
            _ => {
                self.tone_slide = Slide::default();
                self.portamento = false;
            }
        }
    }

    fn apply_effect(&mut self, effect: &Effect, lookup: &Lookup<'_>, outcome: &mut RowOutcome) {
        match effect.effect {
            codes::SLIDE_DOWN | codes::SLIDE_UP => {
                let sign = if effect.effect == codes::SLIDE_DOWN { 1 } else { -1 };
                self.portamento = false;
                self.tone_slide
                    .start(sign * i32::from(effect.parameter), effect.delay);
            }
            codes::PORTAMENTO => {}
            codes::INSTRUMENT_POSITION => self.instrument_position = usize::from(effect.parameter),
            codes::TABLE_POSITION => self.table_position = usize::from(effect.parameter),
            codes::ON_OFF => self.gate = Gate::new(effect.param_hi(), effect.param_lo()),
            codes::ENVELOPE_SLIDE_DOWN | codes::ENVELOPE_SLIDE_UP => {
                outcome.envelope_slide = envelope_slide_of(effect);
            }
            codes::ARPEGGIO => {
                self.arpeggio = match effect.table_index {
                    Some(index) => Sequence::from_table(lookup.table(i32::from(index)), effect.delay),
                    None if effect.parameter == 0 => Sequence::default(),
                    None => Sequence::new(
                        vec![0, i32::from(effect.param_hi()), i32::from(effect.param_lo())],
                        0,
                        effect.delay,
                    ),
                };
            }
            codes::DETUNE => self.detune = i32::from(effect.signed_parameter()),
            codes::SPEED => {
                if effect.parameter > 0 {
                    outcome.speed = Some(effect.parameter);
                }
            }
            codes::VIBRATO => self.vibrato = Vibrato::from_effect(effect, lookup),
            other => trace!(effect = other, "effect ignored by the simulation"),
        }
    }

    fn instrument_row(&self, instrument: Option<&Instrument>) -> InstrumentRow {
        match instrument {
            Some(instrument) if !instrument.rows.is_empty() => {
                let position = self.instrument_position.min(instrument.rows.len() - 1);
                instrument.rows[position]
            }
            _ => FALLBACK_ROW,
        }
    }

    fn table_offset(&self, table: Option<&Table>) -> i32 {
        match table {
            Some(table) if !table.rows.is_empty() => {
                table.rows[self.table_position.min(table.rows.len() - 1)]
            }
            _ => 0,
        }
    }

    /// Computes this tick's register values, then advances the iterators.
    pub(crate) fn tick(&mut self, lookup: &Lookup<'_>) -> ChannelOutput {
        if !self.active {
            return ChannelOutput::default();
        }

        let instrument = self.instrument.and_then(|id| lookup.instrument(id));
        let table = self.table.and_then(|id| lookup.table(id));
        let step = self.instrument_row(instrument);

        let tone_value = self.tone_accumulator + i32::from(step.tone_add);
        if step.tone_accumulation {
            self.tone_accumulator = tone_value;
        }
        let note = self.note as i32 + self.table_offset(table) + self.arpeggio.current();
        let period = (lookup.period(note)
            + tone_value
            + self.tone_slide.current
            + self.vibrato.offset()
            + self.detune)
            .clamp(0, i32::from(MAX_TONE_PERIOD));
        self.last_period = period;

        if step.volume_slide != 0 {
            self.amplitude_slide = (self.amplitude_slide + i32::from(step.volume_slide)).clamp(-15, 15);
        }
        let amplitude = (i32::from(step.volume) + self.amplitude_slide).clamp(0, 15);
        let open = self.gate.is_none_or(|g| g.open);
        let volume = if open {
            ((i32::from(self.volume) * amplitude + 7) / 15) as u8
        } else {
            0
        };

        let noise_envelope = self.noise_envelope_accumulator + i32::from(step.noise_envelope_add);
        if step.noise_envelope_accumulation {
            self.noise_envelope_accumulator = noise_envelope;
        }
        let envelope = open && self.envelope_enabled && step.envelope;

        let output = ChannelOutput {
            registers: ChannelRegisters {
                tone: period as u16,
                volume,
                mixer: MixerState {
                    tone: step.tone,
                    noise: step.noise,
                    envelope,
                },
            },
            noise_add: step.noise.then_some(noise_envelope),
            envelope_add: (envelope && !step.noise).then_some(noise_envelope),
            sounding: envelope || volume > 0,
        };

        if let Some(instrument) = instrument
            && !instrument.rows.is_empty()
        {
            self.instrument_position = next_looped(
                self.instrument_position.min(instrument.rows.len() - 1),
                instrument.rows.len(),
                instrument.loop_point,
            );
        }
        if let Some(table) = table
            && !table.rows.is_empty()
        {
            self.table_position = next_looped(
                self.table_position.min(table.rows.len() - 1),
                table.rows.len(),
                table.loop_point,
            );
        }
        self.arpeggio.advance();
        self.vibrato.advance();
        if let Some(gate) = &mut self.gate {
            gate.advance();
        }
        if self.tone_slide.advance() && self.portamento {
            let slide = &mut self.tone_slide;
            if (slide.step < 0 && slide.current <= 0) || (slide.step > 0 && slide.current >= 0) {
                slide.current = 0;
                slide.step = 0;
                self.portamento = false;
            }
        }

        output
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::note::{Note, NoteName};
    use crate::project::Project;
    use crate::tuning::equal_tempered_table;

    fn note_row(name: NoteName, octave: u8) -> Row {
        Row {
            note: Note::new(name, octave),
            ..Row::default()
        }
    }

    #[test]
    fn note_without_instrument_plays_full_volume() {
        let project = Project::default();
        let tuning = equal_tempered_table(1_773_400);
        let lookup = Lookup::new(&project, &tuning);
        let mut channel = ChannelState::default();

        channel.apply_row(&note_row(NoteName::A, 4), &lookup);
        let out = channel.tick(&lookup);
        assert_eq!(out.registers.tone, 252);
        assert_eq!(out.registers.volume, 15);
        assert!(out.registers.mixer.tone);
        assert!(out.sounding);

        channel.apply_row(&Row { note: Note::off(), ..Row::default() }, &lookup);
        assert!(!channel.tick(&lookup).sounding);
    }

    #[test]
    fn slide_down_raises_period_every_delay_ticks() {
        let project = Project::default();
        let tuning = equal_tempered_table(1_773_400);
        let lookup = Lookup::new(&project, &tuning);
        let mut channel = ChannelState::default();

        let mut row = note_row(NoteName::A, 4);
        row.effects[0] = Some(Effect::new(codes::SLIDE_DOWN, 2, 3));
        channel.apply_row(&row, &lookup);

        let periods: Vec<u16> = (0..5).map(|_| channel.tick(&lookup).registers.tone).collect();
        assert_eq!(periods, vec![252, 252, 255, 255, 258]);
    }

    #[test]
    fn table_offsets_loop() {
        let mut project = Project::default();
        project.tables.push(Table {
            id: 1,
            name: String::new(),
            rows: vec![0, 12, 7],
            loop_point: 1,
        });
        let tuning = equal_tempered_table(1_773_400);
        let lookup = Lookup::new(&project, &tuning);
        let mut channel = ChannelState::default();

        let mut row = note_row(NoteName::C, 4);
        row.table = 1;
        channel.apply_row(&row, &lookup);

        let c4 = 36;
        let expected = [c4, c4 + 12, c4 + 7, c4 + 12, c4 + 7];
        for note in expected {
            assert_eq!(channel.tick(&lookup).registers.tone, tuning[note]);
        }
    }

    #[test]
    fn portamento_reaches_target_and_stops() {
        let project = Project::default();
        let tuning = equal_tempered_table(1_773_400);
        let lookup = Lookup::new(&project, &tuning);
        let mut channel = ChannelState::default();

        channel.apply_row(&note_row(NoteName::A, 4), &lookup);
        channel.tick(&lookup);

        let mut row = note_row(NoteName::ASharp, 4);
        row.effects[0] = Some(Effect::new(codes::PORTAMENTO, 1, 5));
        channel.apply_row(&row, &lookup);

        let target = tuning[46];
        let mut last = 0;
        for _ in 0..20 {
            last = channel.tick(&lookup).registers.tone;
        }
        assert_eq!(last, target);
    }

    #[test]
    fn channel_volume_scales_instrument_amplitude() {
        let project = Project::default();
        let tuning = equal_tempered_table(1_773_400);
        let lookup = Lookup::new(&project, &tuning);
        let mut channel = ChannelState::default();

        let mut row = note_row(NoteName::C, 3);
        row.volume = 8;
        channel.apply_row(&row, &lookup);
        assert_eq!(channel.tick(&lookup).registers.volume, 8);
    }

    #[test]
    fn gate_alternates() {
        let project = Project::default();
        let tuning = equal_tempered_table(1_773_400);
        let lookup = Lookup::new(&project, &tuning);
        let mut channel = ChannelState::default();

        let mut row = note_row(NoteName::C, 3);
        row.effects[0] = Some(Effect::new(codes::ON_OFF, 0, 0x21));
        channel.apply_row(&row, &lookup);
        let sounding: Vec<bool> = (0..6).map(|_| channel.tick(&lookup).sounding).collect();
        assert_eq!(sounding, vec![true, true, false, true, true, false]);
    }

    #[test]
    fn envelope_shapes() {
        let project = Project::default();
        let tuning = equal_tempered_table(1_773_400);
        let lookup = Lookup::new(&project, &tuning);
        let mut channel = ChannelState::default();

        let mut row = note_row(NoteName::C, 3);
        row.envelope_shape = 0x0E;
        let outcome = channel.apply_row(&row, &lookup);
        assert_eq!(outcome.envelope_shape, Some(0x0E));
        assert!(channel.tick(&lookup).registers.mixer.envelope);

        let off = Row {
            envelope_shape: ENVELOPE_SHAPE_OFF,
            ..Row::default()
        };
        assert_eq!(channel.apply_row(&off, &lookup).envelope_shape, None);
        assert!(!channel.tick(&lookup).registers.mixer.envelope);
    }
}
