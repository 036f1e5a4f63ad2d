//! Deterministic tick-by-tick song simulation.
//!
//! [`SongSimulator`] walks the pattern order of one song and produces a
//! [`RegisterFrame`] per player tick. It is driven once per output sample:
//! ticks are accumulated fractionally (`interrupt_frequency / sample_rate`
//! per sample), so WAV rendering, PSG export and seeking all see the exact
//! same frame sequence.
//!
//! # Example
//!
//! ```
//! use bitphase_ay::{Note, NoteName, Pattern, Project, SampleStep, SongSimulator};
//!
//! let mut project = Project::default();
//! let mut pattern = Pattern::new(0, 4, 3);
//! pattern.channels[0].rows[0].note = Note::new(NoteName::A, 4);
//! project.songs[0].patterns.push(pattern);
//! project.pattern_order = vec![0];
//!
//! let mut sim = SongSimulator::new(&project, 0, 44_100).unwrap();
//! let mut frames = 0;
//! loop {
//!     match sim.next_sample() {
//!         SampleStep::Finished => break,
//!         SampleStep::Tick(_) => frames += 1,
//!         SampleStep::Idle => {}
//!     }
//! }
//! assert_eq!(frames, 4 * 6);
//! ```

mod channel;
mod registers;

use std::collections::HashMap;

use bitphase_common::{PatternPosition, resolve_catch_up};
use tracing::debug;

use self::channel::{ChannelOutput, ChannelState, Lookup, Slide, envelope_slide_of};
pub use self::registers::{ChannelRegisters, MixerState, RegisterFrame, RegisterState};
use crate::adapter::SongPatterns;
use crate::error::{Result, SongError};
use crate::pattern::{Pattern, PatternRow};
use crate::project::{HARDWARE_CHANNELS, Project, Song};
use crate::schema::ay_schema;

/// Result of advancing the simulation by one output sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleStep {
    /// No tick boundary was crossed; registers are unchanged.
    Idle,
    /// A tick was processed.
    Tick(RegisterFrame),
    /// The song has ended.
    Finished,
}

/// Current playback position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PlaybackPosition {
    /// Slot in the pattern order.
    pub order_index: usize,
    /// Row within the pattern.
    pub row: usize,
    /// Tick within the row.
    pub tick: u8,
}

/// Simulation of one song. Owns all of its state.
#[derive(Debug)]
pub struct SongSimulator<'a> {
    project: &'a Project,
    song: &'a Song,
    patterns: HashMap<usize, &'a Pattern>,
    lookup: Lookup<'a>,
    hardware_of: Vec<usize>,
    channels: Vec<ChannelState>,
    position: PlaybackPosition,
    speed: u8,
    tick_step: f64,
    tick_accumulator: f64,
    tick_count: u64,
    ended: bool,
    finished: bool,
    noise_base: i32,
    envelope_base: i32,
    envelope_slide: Slide,
    envelope_shape: u8,
    retrigger_pending: bool,
}

impl<'a> SongSimulator<'a> {
    /// Prepares a song for playback at `sample_rate`.
    ///
    /// Fails when the project has no songs, the index is out of range, or the
    /// song has no patterns or an empty pattern order.
    pub fn new(project: &'a Project, song_index: usize, sample_rate: u32) -> Result<Self> {
        let song = project.song(song_index)?;
        if song.patterns.is_empty() || project.pattern_order.is_empty() {
            return Err(SongError::EmptySong);
        }

        let tick_step = if sample_rate == 0 {
            1.0
        } else {
            song.interrupt_frequency / f64::from(sample_rate)
        };
        let hardware_of = song.hardware_channel_of();

        let mut simulator = Self {
            project,
            song,
            patterns: song.patterns.iter().map(|p| (p.id, p)).collect(),
            lookup: Lookup::new(project, &song.tuning_table),
            channels: vec![ChannelState::default(); hardware_of.len()],
            hardware_of,
            position: PlaybackPosition::default(),
            speed: 1,
            tick_step,
            tick_accumulator: 1.0,
            tick_count: 0,
            ended: false,
            finished: false,
            noise_base: 0,
            envelope_base: 0,
            envelope_slide: Slide::default(),
            envelope_shape: 0,
            retrigger_pending: false,
        };
        simulator.reset();
        debug!(
            song = song_index,
            order_len = project.pattern_order.len(),
            channels = simulator.channels.len(),
            "simulator ready"
        );
        Ok(simulator)
    }

    /// Returns to the start of the song with cold state.
    pub fn reset(&mut self) {
        self.channels = vec![ChannelState::default(); self.hardware_of.len()];
        self.position = PlaybackPosition::default();
        self.speed = self.song.initial_speed.max(1);
        self.tick_accumulator = 1.0;
        self.tick_count = 0;
        self.ended = false;
        self.finished = false;
        self.noise_base = 0;
        self.envelope_base = 0;
        self.envelope_slide = Slide::default();
        self.envelope_shape = 0;
        self.retrigger_pending = false;
    }

    /// Current position.
    pub fn position(&self) -> PlaybackPosition {
        self.position
    }

    /// Current speed in ticks per row.
    pub fn speed(&self) -> u8 {
        self.speed
    }

    /// Whether the simulation has reached its terminal state.
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// The song being simulated.
    pub fn song(&self) -> &'a Song {
        self.song
    }

    /// Advances by one output sample.
    pub fn next_sample(&mut self) -> SampleStep {
        if self.finished {
            return SampleStep::Finished;
        }
        let due = self.tick_accumulator >= 1.0;
        if due {
            self.tick_accumulator -= 1.0;
        }
        self.tick_accumulator += self.tick_step;
        if !due {
            return SampleStep::Idle;
        }
        match self.step_tick() {
            Some(frame) => SampleStep::Tick(frame),
            None => SampleStep::Finished,
        }
    }

    /// Processes one tick regardless of the sample clock.
    ///
    /// Returns `None` once the song has ended.
    pub fn step_tick(&mut self) -> Option<RegisterFrame> {
        if self.ended || self.finished {
            self.finished = true;
            return None;
        }

        if self.position.tick == 0 && !self.apply_current_row() {
            debug!(
                order_index = self.position.order_index,
                "pattern missing from song, ending playback"
            );
            self.finished = true;
            return None;
        }

        let frame = self.process_tick();
        self.advance_position();
        Some(frame)
    }

    fn current_pattern(&self) -> Option<&'a Pattern> {
        let id = *self.project.pattern_order.get(self.position.order_index)?;
        self.patterns.get(&id).copied()
    }

    /// Applies the row at the current position; `false` if its pattern is missing.
    fn apply_current_row(&mut self) -> bool {
        let Some(pattern) = self.current_pattern() else {
            return false;
        };
        let row = self.position.row;

        if let Some(global) = pattern.pattern_rows.get(row) {
            self.apply_global_row(global);
        }

        for (index, channel) in self.channels.iter_mut().enumerate() {
            let Some(cell) = pattern.row(index, row) else {
                continue;
            };
            let outcome = channel.apply_row(cell, &self.lookup);
            if let Some(speed) = outcome.speed {
                self.speed = speed;
            }
            if let Some(shape) = outcome.envelope_shape {
                self.envelope_shape = shape;
                self.retrigger_pending = true;
                self.envelope_slide = Slide::default();
            }
            if let Some((step, delay)) = outcome.envelope_slide {
                self.envelope_slide.start(step, delay);
            }
        }
        true
    }

    fn apply_global_row(&mut self, global: &PatternRow) {
        if global.envelope_value > 0 {
            self.envelope_base = i32::from(global.envelope_value);
            self.envelope_slide = Slide::default();
        }
        if global.noise_value > 0 {
            self.noise_base = i32::from(global.noise_value);
        }
        if let Some((step, delay)) = global.envelope_effect.as_ref().and_then(envelope_slide_of) {
            self.envelope_slide.start(step, delay);
        }
    }

    fn process_tick(&mut self) -> RegisterFrame {
        let outputs: Vec<ChannelOutput> = self
            .channels
            .iter_mut()
            .map(|channel| channel.tick(&self.lookup))
            .collect();

        let mut state = RegisterState::default();
        let mut noise = self.noise_base;
        let mut envelope = self.envelope_base + self.envelope_slide.current;

        for hardware in 0..HARDWARE_CHANNELS {
            let Some(output) = self.select_output(hardware, &outputs) else {
                continue;
            };
            state.channels[hardware] = output.registers;
            if let Some(add) = output.noise_add {
                noise = self.noise_base + add;
            }
            if let Some(add) = output.envelope_add {
                envelope += add;
            }
        }

        state.noise = (noise & 0x1F) as u8;
        state.envelope_period = envelope.clamp(0, i32::from(u16::MAX)) as u16;
        state.envelope_shape = self.envelope_shape & 0x0F;
        state.envelope_retrigger = std::mem::take(&mut self.retrigger_pending);

        self.envelope_slide.advance();
        self.tick_count += 1;
        state.to_frame()
    }

    /// Output of the virtual channel that owns `hardware` this tick.
    fn select_output(&self, hardware: usize, outputs: &[ChannelOutput]) -> Option<ChannelOutput> {
        let members: Vec<&ChannelOutput> = self
            .hardware_of
            .iter()
            .zip(outputs)
            .filter(|(hw, _)| **hw == hardware)
            .map(|(_, output)| output)
            .collect();
        let first = members.first().copied().copied()?;
        if members.len() == 1 {
            return Some(first);
        }
        let sounding: Vec<&ChannelOutput> = members.into_iter().filter(|o| o.sounding).collect();
        if sounding.is_empty() {
            return Some(first);
        }
        let slot = (self.tick_count % sounding.len() as u64) as usize;
        Some(*sounding[slot])
    }

    fn advance_position(&mut self) {
        let length = self.current_pattern().map_or(0, |p| p.length);
        let last_order = self.position.order_index + 1 >= self.project.pattern_order.len();
        let last_row = self.position.row + 1 >= length;
        let last_tick = self.position.tick + 1 >= self.speed;

        if last_order && last_row && last_tick {
            self.ended = true;
            return;
        }

        self.position.tick += 1;
        if !last_tick {
            return;
        }
        self.position.tick = 0;
        self.position.row += 1;
        if self.position.row >= length {
            self.position.row = 0;
            self.position.order_index += 1;
        }
    }

    /// Positions playback at `(order_index, row)` with reconstructed state.
    ///
    /// Every row up to the most recent one that sets sticky state is replayed
    /// silently, tick by tick, so iterators and slides end up where continuous
    /// playback would have left them.
    pub fn seek(&mut self, order_index: usize, row: usize) -> Result<()> {
        self.reset();
        let project = self.project;
        let order = &project.pattern_order;
        let order_index = order_index.min(order.len() - 1);
        let target = PatternPosition::new(order_index, row);

        if let Some(plan) = resolve_catch_up(order, target, ay_schema(), &SongPatterns::new(self.song)) {
            debug!(
                horizon_order = plan.horizon.order_index,
                horizon_row = plan.horizon.row,
                segments = plan.segments.len(),
                "replaying catch-up segments"
            );
            for segment in &plan.segments {
                for replay_row in 0..segment.num_rows {
                    self.position = PlaybackPosition {
                        order_index: segment.pattern_order_index,
                        row: replay_row,
                        tick: 0,
                    };
                    if !self.apply_current_row() {
                        break;
                    }
                    for _ in 0..self.speed {
                        self.process_tick();
                    }
                }
            }
        }

        self.position = PlaybackPosition {
            order_index,
            row,
            tick: 0,
        };
        self.ended = false;
        self.finished = false;
        self.tick_accumulator = 1.0;
        Ok(())
    }
}
