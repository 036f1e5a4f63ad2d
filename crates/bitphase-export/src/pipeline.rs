//! Export jobs: render a project and encode the result.

use std::io::{Cursor, Write};
use std::path::Path;

use bitphase_ay::{FrameCollector, Project, RenderSettings, RenderSink, SongError, SongRenderer, require_chip};
use bitphase_chip::DcFilter;
use bitphase_common::{
    CancellationToken, DEFAULT_SAMPLE_RATE, MAX_RENDER_SECONDS, ProgressSink, SUPPORTED_SAMPLE_RATES,
    percent_of,
};
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};
use zip::CompressionMethod;
use zip::write::SimpleFileOptions;

use crate::error::{ExportError, Result};
use crate::psg::PsgEncoder;
use crate::resample::resample_linear;
use crate::wav::{BitDepth, WavMetadata, WavSpec, encode_wav};

/// Left/right gains of channels A, B and C (ABC stereo).
const STEREO_GAINS: [(f32, f32); 3] = [(0.75, 0.25), (0.5, 0.5), (0.25, 0.75)];

/// Scale bringing the loudest panned sum back to full range.
const STEREO_SCALE: f32 = 1.0 / 1.5;

const CHANNEL_NAMES: [char; 3] = ['A', 'B', 'C'];

/// How rendered channels end up in the output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChannelMode {
    /// One stereo WAV with every song mixed in.
    #[default]
    Mixed,
    /// A zip archive with one mono WAV per song and hardware channel.
    SeparateFiles,
}

/// WAV export configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WavExportOptions {
    /// Output sample rate (22050, 44100, 48000 or 96000 Hz).
    pub sample_rate: u32,
    /// Sample encoding.
    pub bit_depth: BitDepth,
    /// Mixed stereo or per-channel files.
    pub channel_mode: ChannelMode,
    /// `LIST/INFO` fields.
    pub metadata: WavMetadata,
    /// Length ceiling per song.
    pub max_seconds: u32,
}

impl Default for WavExportOptions {
    fn default() -> Self {
        Self {
            sample_rate: DEFAULT_SAMPLE_RATE,
            bit_depth: BitDepth::Pcm16,
            channel_mode: ChannelMode::Mixed,
            metadata: WavMetadata::default(),
            max_seconds: MAX_RENDER_SECONDS,
        }
    }
}

impl WavExportOptions {
    /// Sets the output sample rate.
    pub fn with_sample_rate(mut self, sample_rate: u32) -> Self {
        self.sample_rate = sample_rate;
        self
    }

    /// Sets the sample encoding.
    pub fn with_bit_depth(mut self, bit_depth: BitDepth) -> Self {
        self.bit_depth = bit_depth;
        self
    }

    /// Sets the channel mode.
    pub fn with_channel_mode(mut self, channel_mode: ChannelMode) -> Self {
        self.channel_mode = channel_mode;
        self
    }

    /// Sets the metadata.
    pub fn with_metadata(mut self, metadata: WavMetadata) -> Self {
        self.metadata = metadata;
        self
    }

    /// Sets the per-song length ceiling.
    pub fn with_max_seconds(mut self, max_seconds: u32) -> Self {
        self.max_seconds = max_seconds;
        self
    }

    /// Checks the sample rate.
    pub fn validate(&self) -> Result<()> {
        if !SUPPORTED_SAMPLE_RATES.contains(&self.sample_rate) {
            return Err(ExportError::UnsupportedSampleRate(self.sample_rate));
        }
        Ok(())
    }
}

/// PSG export configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PsgExportOptions {
    /// Song (chip) to dump.
    pub song_index: usize,
    /// Length ceiling.
    pub max_seconds: u32,
}

impl Default for PsgExportOptions {
    fn default() -> Self {
        Self {
            song_index: 0,
            max_seconds: MAX_RENDER_SECONDS,
        }
    }
}

impl PsgExportOptions {
    /// Selects the song.
    pub fn with_song(mut self, song_index: usize) -> Self {
        self.song_index = song_index;
        self
    }

    /// Sets the length ceiling.
    pub fn with_max_seconds(mut self, max_seconds: u32) -> Self {
        self.max_seconds = max_seconds;
        self
    }
}

/// Kind of file an export produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    /// A single WAV file.
    Wav,
    /// A zip archive of WAV files.
    Zip,
    /// A PSG register dump.
    Psg,
}

impl ArtifactKind {
    /// Conventional file extension.
    pub fn extension(self) -> &'static str {
        match self {
            Self::Wav => "wav",
            Self::Zip => "zip",
            Self::Psg => "psg",
        }
    }
}

/// Encoded export output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportArtifact {
    /// What the bytes are.
    pub kind: ArtifactKind,
    /// File contents.
    pub bytes: Vec<u8>,
}

/// Mixes channels A, B and C into interleaved stereo.
struct StereoSink {
    filters: [DcFilter; 3],
    samples: Vec<f32>,
}

impl StereoSink {
    fn new() -> Self {
        Self {
            filters: [DcFilter::new(), DcFilter::new(), DcFilter::new()],
            samples: Vec::new(),
        }
    }
}

impl RenderSink for StereoSink {
    fn on_sample(&mut self, levels: [f32; 3]) {
        let (mut left, mut right) = (0.0, 0.0);
        for ((filter, level), (gain_l, gain_r)) in
            self.filters.iter_mut().zip(levels).zip(STEREO_GAINS)
        {
            let value = filter.process(level);
            left += value * gain_l;
            right += value * gain_r;
        }
        self.samples.push(left * STEREO_SCALE);
        self.samples.push(right * STEREO_SCALE);
    }
}

/// Captures one hardware channel.
struct MonoSink {
    channel: usize,
    filter: DcFilter,
    samples: Vec<f32>,
}

impl RenderSink for MonoSink {
    fn on_sample(&mut self, levels: [f32; 3]) {
        self.samples.push(self.filter.process(levels[self.channel]));
    }
}

/// Order entries without a pattern are not checked here; the simulation
/// ends the song at the first one.
fn check_renderable(project: &Project) -> Result<()> {
    if project.songs.is_empty() {
        return Err(SongError::NoSongs.into());
    }
    if project.pattern_order.is_empty() {
        return Err(SongError::EmptySong.into());
    }
    Ok(())
}

fn renderer<'a>(project: &'a Project, song_index: usize, max_seconds: u32) -> Result<SongRenderer<'a>> {
    let song = project.song(song_index)?;
    let chip = require_chip(&song.chip_type)?;
    let settings = RenderSettings::default()
        .with_sample_rate(DEFAULT_SAMPLE_RATE)
        .with_max_seconds(max_seconds);
    Ok(chip.create_renderer(project, song_index, settings)?)
}

/// Reports the failure on the progress sink and passes the error on.
fn report_failure<T>(result: Result<T>, progress: &mut dyn ProgressSink) -> Result<T> {
    if let Err(err) = &result {
        if err.is_cancelled() {
            progress.report(0, "Export cancelled");
        } else {
            warn!(error = %err, "export failed");
            progress.report(0, &format!("Export failed: {err}"));
        }
    }
    result
}

/// Renders every song and encodes a WAV file (or a zip of per-channel WAVs).
pub fn export_wav(
    project: &Project,
    options: &WavExportOptions,
    progress: &mut dyn ProgressSink,
    cancel: &CancellationToken,
) -> Result<ExportArtifact> {
    let result = options.validate().and_then(|()| {
        check_renderable(project)?;
        match options.channel_mode {
            ChannelMode::Mixed => export_mixed(project, options, progress, cancel),
            ChannelMode::SeparateFiles => export_separate(project, options, progress, cancel),
        }
    });
    report_failure(result, progress)
}

fn export_mixed(
    project: &Project,
    options: &WavExportOptions,
    progress: &mut dyn ProgressSink,
    cancel: &CancellationToken,
) -> Result<ExportArtifact> {
    let songs = project.songs.len();
    let mut mixed: Vec<f32> = Vec::new();
    for index in 0..songs {
        cancel.check()?;
        progress.report(
            percent_of(index, songs + 1),
            &format!("Rendering song {}/{songs}", index + 1),
        );
        let mut sink = StereoSink::new();
        let stats = renderer(project, index, options.max_seconds)?.run(&mut sink, cancel)?;
        debug!(song = index, samples = stats.samples, "song rendered");

        if mixed.len() < sink.samples.len() {
            mixed.resize(sink.samples.len(), 0.0);
        }
        for (out, sample) in mixed.iter_mut().zip(&sink.samples) {
            *out = (*out + sample).clamp(-1.0, 1.0);
        }
    }

    cancel.check()?;
    progress.report(percent_of(songs, songs + 1), "Encoding WAV");
    let output = resample_linear(&mixed, 2, DEFAULT_SAMPLE_RATE, options.sample_rate);
    let spec = WavSpec {
        sample_rate: options.sample_rate,
        channels: 2,
        bit_depth: options.bit_depth,
    };
    let bytes = encode_wav(&output, &spec, &options.metadata)?;
    progress.report(100, "Done");
    info!(
        songs,
        frames = output.len() / 2,
        bytes = bytes.len(),
        "WAV export finished"
    );
    Ok(ExportArtifact {
        kind: ArtifactKind::Wav,
        bytes,
    })
}

fn export_separate(
    project: &Project,
    options: &WavExportOptions,
    progress: &mut dyn ProgressSink,
    cancel: &CancellationToken,
) -> Result<ExportArtifact> {
    let jobs = project.songs.len() * CHANNEL_NAMES.len();
    let spec = WavSpec {
        sample_rate: options.sample_rate,
        channels: 1,
        bit_depth: options.bit_depth,
    };
    let entry_options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    let mut archive = zip::ZipWriter::new(Cursor::new(Vec::new()));

    for song in 0..project.songs.len() {
        for (channel, name) in CHANNEL_NAMES.iter().enumerate() {
            cancel.check()?;
            let job = song * CHANNEL_NAMES.len() + channel;
            progress.report(
                percent_of(job, jobs + 1),
                &format!("Rendering song {} channel {name}", song + 1),
            );

            let mut renderer = renderer(project, song, options.max_seconds)?;
            for other in (0..CHANNEL_NAMES.len()).filter(|&c| c != channel) {
                renderer.set_channel_mute(other, true);
            }
            let mut sink = MonoSink {
                channel,
                filter: DcFilter::new(),
                samples: Vec::new(),
            };
            renderer.run(&mut sink, cancel)?;

            let output = resample_linear(&sink.samples, 1, DEFAULT_SAMPLE_RATE, options.sample_rate);
            let file = format!("song{}_channel_{name}.wav", song + 1);
            archive.start_file(file, entry_options)?;
            archive.write_all(&encode_wav(&output, &spec, &options.metadata)?)?;
        }
    }

    progress.report(percent_of(jobs, jobs + 1), "Writing archive");
    let bytes = archive.finish()?.into_inner();
    progress.report(100, "Done");
    info!(files = jobs, bytes = bytes.len(), "per-channel WAV export finished");
    Ok(ExportArtifact {
        kind: ArtifactKind::Zip,
        bytes,
    })
}

/// Dumps the register frames of one song as PSG.
pub fn export_psg(
    project: &Project,
    options: &PsgExportOptions,
    progress: &mut dyn ProgressSink,
    cancel: &CancellationToken,
) -> Result<ExportArtifact> {
    let result = check_renderable(project).and_then(|()| {
        progress.report(0, "Simulating song");
        let mut frames = FrameCollector::default();
        renderer(project, options.song_index, options.max_seconds)?.run(&mut frames, cancel)?;

        cancel.check()?;
        progress.report(90, "Encoding PSG");
        let mut encoder = PsgEncoder::new();
        for frame in &frames.frames {
            encoder.push_frame(frame);
        }
        let count = encoder.frame_count();
        let bytes = encoder.finish();
        progress.report(100, "Done");
        info!(frames = count, bytes = bytes.len(), "PSG export finished");
        Ok(ExportArtifact {
            kind: ArtifactKind::Psg,
            bytes,
        })
    });
    report_failure(result, progress)
}

/// Writes an artifact atomically; nothing is left behind on failure.
pub fn write_artifact(path: impl AsRef<Path>, artifact: &ExportArtifact) -> Result<()> {
    let path = path.as_ref();
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut file = NamedTempFile::new_in(dir)?;
    file.write_all(&artifact.bytes)?;
    file.as_file().sync_all()?;
    file.persist(path).map_err(|err| err.error)?;
    debug!(path = %path.display(), bytes = artifact.bytes.len(), "export written");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use bitphase_common::NoProgress;

    #[test]
    fn rejects_unsupported_rates() {
        let options = WavExportOptions::default().with_sample_rate(8000);
        let err = export_wav(&Project::default(), &options, &mut NoProgress, &CancellationToken::new())
            .unwrap_err();
        assert!(matches!(err, ExportError::UnsupportedSampleRate(8000)));
    }

    #[test]
    fn empty_order_fails_before_rendering() {
        let err = export_psg(
            &Project::default(),
            &PsgExportOptions::default(),
            &mut NoProgress,
            &CancellationToken::new(),
        )
        .unwrap_err();
        assert!(matches!(err, ExportError::Song(SongError::EmptySong)));
    }

    #[test]
    fn stereo_panning() {
        let mut sink = StereoSink::new();
        sink.on_sample([1.0, 0.0, 0.0]);
        let (left, right) = (sink.samples[0], sink.samples[1]);
        assert!(left > right);
        assert!(right > 0.0);
    }
}
