use std::io::Cursor;

use bitphase_ay::{Note, NoteName, Pattern, Project, Song, equal_tempered_table};
use bitphase_common::{CancellationToken, NoProgress};
use bitphase_export::{
    ArtifactKind, BitDepth, ChannelMode, ExportError, PsgExportOptions, WavExportOptions,
    WavMetadata, export_psg, export_wav, psg, write_artifact,
};
use pretty_assertions::assert_eq;

/// One song, one 2-row pattern at speed 6: 12 ticks.
fn project() -> Project {
    let mut project = Project::default();
    project.name = "Export test".into();
    let mut pattern = Pattern::new(0, 2, 3);
    pattern.channels[0].rows[0].note = Note::new(NoteName::A, 4);
    project.songs[0].patterns.push(pattern);
    project.songs[0].tuning_table = equal_tempered_table(1_773_400);
    project.pattern_order = vec![0];
    project
}

fn turbo_sound_project() -> Project {
    let mut project = project();
    let second: Song = project.songs[0].clone();
    project.songs.push(second);
    project
}

#[test]
fn mixed_wav_reads_back() {
    let options = WavExportOptions::default().with_sample_rate(22_050);
    let artifact = export_wav(&project(), &options, &mut NoProgress, &CancellationToken::new()).unwrap();
    assert_eq!(artifact.kind, ArtifactKind::Wav);

    let reader = hound::WavReader::new(Cursor::new(artifact.bytes)).unwrap();
    let spec = reader.spec();
    assert_eq!(spec.channels, 2);
    assert_eq!(spec.sample_rate, 22_050);
    assert_eq!(spec.bits_per_sample, 16);
    // 12 ticks of 882 samples at 44.1 kHz, halved
    let frames = reader.duration() as i64;
    assert!((frames - 12 * 441).abs() <= 12, "frames = {frames}");
}

#[test]
fn float_export_header() {
    let options = WavExportOptions::default().with_bit_depth(BitDepth::Float32);
    let artifact = export_wav(&project(), &options, &mut NoProgress, &CancellationToken::new()).unwrap();
    let reader = hound::WavReader::new(Cursor::new(artifact.bytes)).unwrap();
    assert_eq!(reader.spec().sample_format, hound::SampleFormat::Float);
    assert_eq!(reader.spec().bits_per_sample, 32);
}

#[test]
fn metadata_is_appended() {
    let metadata = WavMetadata {
        title: "Export test".into(),
        ..WavMetadata::default()
    };
    let options = WavExportOptions::default().with_metadata(metadata);
    let artifact = export_wav(&project(), &options, &mut NoProgress, &CancellationToken::new()).unwrap();
    let needle = b"INAM";
    assert!(artifact.bytes.windows(needle.len()).any(|w| w == needle));
}

#[test]
fn separate_files_archive() {
    let options = WavExportOptions::default().with_channel_mode(ChannelMode::SeparateFiles);
    let artifact = export_wav(
        &turbo_sound_project(),
        &options,
        &mut NoProgress,
        &CancellationToken::new(),
    )
    .unwrap();
    assert_eq!(artifact.kind, ArtifactKind::Zip);

    let mut archive = zip::ZipArchive::new(Cursor::new(artifact.bytes)).unwrap();
    assert_eq!(archive.len(), 6);
    let mut names: Vec<String> = archive.file_names().map(str::to_string).collect();
    names.sort();
    assert_eq!(names[0], "song1_channel_A.wav");
    assert_eq!(names[5], "song2_channel_C.wav");

    let entry = archive.by_name("song2_channel_B.wav").unwrap();
    let reader = hound::WavReader::new(entry).unwrap();
    assert_eq!(reader.spec().channels, 1);
}

#[test]
fn progress_reaches_completion() {
    let mut reports = Vec::new();
    let mut sink = |percent: u8, message: &str| reports.push((percent, message.to_string()));
    export_wav(
        &turbo_sound_project(),
        &WavExportOptions::default(),
        &mut sink,
        &CancellationToken::new(),
    )
    .unwrap();

    assert_eq!(reports.first().map(|r| r.0), Some(0));
    assert_eq!(reports.last().map(|r| r.0), Some(100));
    assert!(reports.windows(2).all(|w| w[0].0 <= w[1].0));
    assert!(reports.iter().any(|r| r.1.contains("song 2/2")));
}

#[test]
fn cancelled_export_resets_progress() {
    let token = CancellationToken::new();
    token.cancel();
    let mut reports = Vec::new();
    let mut sink = |percent: u8, message: &str| reports.push((percent, message.to_string()));
    let err = export_wav(&project(), &WavExportOptions::default(), &mut sink, &token).unwrap_err();

    assert!(err.is_cancelled());
    assert_eq!(reports.last().map(|r| r.0), Some(0));
}

#[test]
fn unsupported_options_are_rejected() {
    let options = WavExportOptions::default().with_sample_rate(32_000);
    let err = export_wav(&project(), &options, &mut NoProgress, &CancellationToken::new()).unwrap_err();
    assert!(matches!(err, ExportError::UnsupportedSampleRate(32_000)));
}

#[test]
fn psg_dump() {
    let artifact = export_psg(
        &project(),
        &PsgExportOptions::default(),
        &mut NoProgress,
        &CancellationToken::new(),
    )
    .unwrap();
    assert_eq!(artifact.kind, ArtifactKind::Psg);
    assert_eq!(&artifact.bytes[..4], &psg::PSG_MAGIC);
    assert_eq!(artifact.bytes.last(), Some(&psg::END_MARKER));

    // one marker per tick; register values never reach 0xFF here
    let body = &artifact.bytes[psg::PSG_HEADER_LEN..];
    let markers = body.iter().filter(|&&b| b == psg::FRAME_MARKER).count();
    assert_eq!(markers, 12);
}

#[test]
fn missing_pattern_ends_the_export() {
    let mut project = project();
    project.pattern_order = vec![0, 7, 0];

    let psg_artifact = export_psg(
        &project,
        &PsgExportOptions::default(),
        &mut NoProgress,
        &CancellationToken::new(),
    )
    .unwrap();
    let body = &psg_artifact.bytes[psg::PSG_HEADER_LEN..];
    assert_eq!(body.iter().filter(|&&b| b == psg::FRAME_MARKER).count(), 12);

    let wav = export_wav(&project, &WavExportOptions::default(), &mut NoProgress, &CancellationToken::new())
        .unwrap();
    let reader = hound::WavReader::new(Cursor::new(wav.bytes)).unwrap();
    let frames = reader.duration() as i64;
    assert!((frames - 12 * 882).abs() <= 12, "frames = {frames}");
}

#[test]
fn psg_song_out_of_range() {
    let err = export_psg(
        &project(),
        &PsgExportOptions::default().with_song(3),
        &mut NoProgress,
        &CancellationToken::new(),
    )
    .unwrap_err();
    assert!(!err.is_cancelled());
}

#[test]
fn artifacts_are_written_whole() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tune.psg");
    let artifact = export_psg(
        &project(),
        &PsgExportOptions::default(),
        &mut NoProgress,
        &CancellationToken::new(),
    )
    .unwrap();
    write_artifact(&path, &artifact).unwrap();
    assert_eq!(std::fs::read(&path).unwrap(), artifact.bytes);
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
}
