//! Drives a [`SongSimulator`] through the chip emulator.
//!
//! Every consumer (WAV rendering, PSG export, tests) runs the same loop and
//! only differs in the [`RenderSink`] it plugs in.

use bitphase_chip::{AyChip, PsgBackend};
use bitphase_common::{CancellationToken, DEFAULT_SAMPLE_RATE, MAX_RENDER_SECONDS};
use tracing::{debug, warn};

use crate::error::Result;
use crate::project::Project;
use crate::sim::{RegisterFrame, SampleStep, SongSimulator};

/// Render configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderSettings {
    /// Output sample rate (Hz).
    pub sample_rate: u32,
    /// Hard ceiling on rendered audio, in seconds.
    pub max_seconds: u32,
    /// Samples between cancellation checks.
    pub cancel_check_interval: u32,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            sample_rate: DEFAULT_SAMPLE_RATE,
            max_seconds: MAX_RENDER_SECONDS,
            cancel_check_interval: 4096,
        }
    }
}

impl RenderSettings {
    /// Sets the sample rate.
    pub fn with_sample_rate(mut self, sample_rate: u32) -> Self {
        self.sample_rate = sample_rate;
        self
    }

    /// Sets the length ceiling.
    pub fn with_max_seconds(mut self, max_seconds: u32) -> Self {
        self.max_seconds = max_seconds;
        self
    }

    /// Largest number of samples a render may produce.
    pub fn max_samples(&self) -> u64 {
        u64::from(self.sample_rate) * u64::from(self.max_seconds)
    }
}

/// Receives the output of a render.
pub trait RenderSink {
    /// Called for every processed tick.
    fn on_frame(&mut self, _frame: &RegisterFrame) {}

    /// Whether the chip should be clocked for audio.
    fn wants_audio(&self) -> bool {
        true
    }

    /// Per-channel levels (A, B, C) of one output sample.
    fn on_sample(&mut self, _levels: [f32; 3]) {}
}

/// Collects register frames only.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FrameCollector {
    /// Frames in tick order.
    pub frames: Vec<RegisterFrame>,
}

impl RenderSink for FrameCollector {
    fn on_frame(&mut self, frame: &RegisterFrame) {
        self.frames.push(*frame);
    }

    fn wants_audio(&self) -> bool {
        false
    }
}

/// Collects per-channel sample levels.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChannelCollector {
    /// One entry per output sample.
    pub samples: Vec<[f32; 3]>,
}

impl RenderSink for ChannelCollector {
    fn on_sample(&mut self, levels: [f32; 3]) {
        self.samples.push(levels);
    }
}

/// Summary of a finished render.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RenderStats {
    /// Output samples produced.
    pub samples: u64,
    /// Ticks processed.
    pub frames: u64,
    /// Whether the length ceiling cut the song short.
    pub truncated: bool,
}

/// One song wired to its own chip instance.
#[derive(Debug)]
pub struct SongRenderer<'a> {
    simulator: SongSimulator<'a>,
    chip: AyChip,
    settings: RenderSettings,
}

impl<'a> SongRenderer<'a> {
    /// Creates a renderer for one song of a project.
    pub fn new(project: &'a Project, song_index: usize, settings: RenderSettings) -> Result<Self> {
        let simulator = SongSimulator::new(project, song_index, settings.sample_rate)?;
        let song = simulator.song();
        let chip = AyChip::with_clocks(song.chip_variant, song.chip_frequency, settings.sample_rate);
        Ok(Self {
            simulator,
            chip,
            settings,
        })
    }

    /// Mutes or unmutes a hardware channel.
    pub fn set_channel_mute(&mut self, channel: usize, mute: bool) {
        self.chip.set_channel_mute(channel, mute);
    }

    /// The simulator, e.g. to seek before running.
    pub fn simulator_mut(&mut self) -> &mut SongSimulator<'a> {
        &mut self.simulator
    }

    /// Runs the song to its end (or the ceiling) into `sink`.
    ///
    /// Returns [`crate::SongError::Cancelled`] as soon as `cancel` is observed.
    pub fn run<S: RenderSink + ?Sized>(
        &mut self,
        sink: &mut S,
        cancel: &CancellationToken,
    ) -> Result<RenderStats> {
        let ceiling = self.settings.max_samples();
        let interval = u64::from(self.settings.cancel_check_interval.max(1));
        let audio = sink.wants_audio();
        let mut stats = RenderStats::default();

        loop {
            if stats.samples % interval == 0 {
                cancel.check()?;
            }
            if stats.samples >= ceiling {
                warn!(
                    seconds = self.settings.max_seconds,
                    "render reached its length ceiling, truncating"
                );
                stats.truncated = true;
                break;
            }

            match self.simulator.next_sample() {
                SampleStep::Finished => break,
                SampleStep::Tick(frame) => {
                    self.chip
                        .load_registers(&frame.registers, frame.envelope_retrigger);
                    sink.on_frame(&frame);
                    stats.frames += 1;
                }
                SampleStep::Idle => {}
            }

            if audio {
                let levels = self.chip.compute_next_sample();
                sink.on_sample(levels);
            }
            stats.samples += 1;
        }

        debug!(
            samples = stats.samples,
            frames = stats.frames,
            truncated = stats.truncated,
            "render finished"
        );
        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::note::{Note, NoteName};
    use crate::pattern::Pattern;

    fn project() -> Project {
        let mut project = Project::default();
        let mut pattern = Pattern::new(0, 2, 3);
        pattern.channels[0].rows[0].note = Note::new(NoteName::A, 4);
        project.songs[0].patterns.push(pattern);
        project.songs[0].tuning_table = crate::tuning::equal_tempered_table(1_773_400);
        project.pattern_order = vec![0];
        project
    }

    #[test]
    fn sample_count_follows_tick_count() {
        let project = project();
        let settings = RenderSettings::default();
        let mut renderer = SongRenderer::new(&project, 0, settings).unwrap();
        let mut sink = ChannelCollector::default();
        let stats = renderer.run(&mut sink, &CancellationToken::new()).unwrap();

        // 12 ticks at 50 Hz, about 882 samples each
        assert_eq!(stats.frames, 12);
        assert!((12 * 882 - 12..=12 * 882 + 12).contains(&stats.samples));
        assert_eq!(sink.samples.len() as u64, stats.samples);
        assert!(sink.samples.iter().any(|s| s[0] > 0.0));
        assert!(sink.samples.iter().all(|s| s[1] == 0.0));
    }

    #[test]
    fn ceiling_truncates() {
        let project = project();
        let settings = RenderSettings::default().with_sample_rate(1000).with_max_seconds(0);
        let mut renderer = SongRenderer::new(&project, 0, settings).unwrap();
        let stats = renderer
            .run(&mut FrameCollector::default(), &CancellationToken::new())
            .unwrap();
        assert!(stats.truncated);
        assert_eq!(stats.samples, 0);
    }

    #[test]
    fn cancellation_is_reported() {
        let project = project();
        let token = CancellationToken::new();
        token.cancel();
        let mut renderer = SongRenderer::new(&project, 0, RenderSettings::default()).unwrap();
        let err = renderer
            .run(&mut FrameCollector::default(), &token)
            .unwrap_err();
        assert!(err.is_cancelled());
    }

    #[test]
    fn muted_channel_is_silent() {
        let project = project();
        let mut renderer = SongRenderer::new(&project, 0, RenderSettings::default()).unwrap();
        renderer.set_channel_mute(0, true);
        let mut sink = ChannelCollector::default();
        renderer.run(&mut sink, &CancellationToken::new()).unwrap();
        assert!(sink.samples.iter().all(|s| s[0] == 0.0));
    }
}
