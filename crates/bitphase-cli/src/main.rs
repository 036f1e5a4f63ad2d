//! bitphase command-line front end.
//!
//! - `info`: summary of a project or module
//! - `import`: PT3/VT2 module to `.btp` project
//! - `export-wav` / `export-psg`: offline rendering

mod args;

use std::path::Path;

use anyhow::{Context, Result, bail};
use bitphase_ay::{Project, read_project_file, write_project_file};
use bitphase_common::{CancellationToken, MAX_RENDER_SECONDS};
use bitphase_export::{
    BitDepth, ChannelMode, ExportArtifact, PsgExportOptions, WavExportOptions, WavMetadata,
    export_psg, export_wav, write_artifact,
};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use args::{Args, Command};

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    match args.command {
        Command::Info { file } => print_info(&load(&file)?),
        Command::Import { file, output } => {
            let project = bitphase_formats::import_file(&file)
                .with_context(|| format!("failed to import {}", file.display()))?;
            write_project_file(&output, &project)
                .with_context(|| format!("failed to write {}", output.display()))?;
            info!(songs = project.songs.len(), "wrote {}", output.display());
        }
        Command::ExportWav {
            file,
            output,
            rate,
            bits,
            separate,
            max_seconds,
        } => {
            let project = load(&file)?;
            let Some(bit_depth) = BitDepth::from_bits(bits) else {
                bail!("unsupported bit depth {bits} (use 16, 24 or 32)");
            };
            let channel_mode = if separate {
                ChannelMode::SeparateFiles
            } else {
                ChannelMode::Mixed
            };
            let metadata = WavMetadata {
                title: project.name.clone(),
                artist: project.author.clone(),
                ..WavMetadata::default()
            };
            let options = WavExportOptions::default()
                .with_sample_rate(rate)
                .with_bit_depth(bit_depth)
                .with_channel_mode(channel_mode)
                .with_metadata(metadata)
                .with_max_seconds(max_seconds.unwrap_or(MAX_RENDER_SECONDS));
            let artifact = export_wav(&project, &options, &mut log_progress, &CancellationToken::new())?;
            save(&output, &artifact)?;
        }
        Command::ExportPsg { file, output, song } => {
            let project = load(&file)?;
            let options = PsgExportOptions::default().with_song(song);
            let artifact = export_psg(&project, &options, &mut log_progress, &CancellationToken::new())?;
            save(&output, &artifact)?;
        }
    }
    Ok(())
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn log_progress(percent: u8, message: &str) {
    info!("[{percent:>3}%] {message}");
}

/// Loads a `.btp` project, or imports anything else as a module.
fn load(path: &Path) -> Result<Project> {
    let is_project = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("btp"));
    let project = if is_project {
        read_project_file(path)?
    } else {
        bitphase_formats::import_file(path)?
    };
    Ok(project)
}

fn save(path: &Path, artifact: &ExportArtifact) -> Result<()> {
    let expected = artifact.kind.extension();
    let matches = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case(expected));
    if !matches {
        tracing::warn!("output is a .{expected} file but {} has another extension", path.display());
    }
    write_artifact(path, artifact).with_context(|| format!("failed to write {}", path.display()))?;
    println!("Wrote {} ({} bytes)", path.display(), artifact.bytes.len());
    Ok(())
}

fn print_info(project: &Project) {
    let or_unknown = |s: &str| if s.is_empty() { "(unknown)".to_string() } else { s.to_string() };
    println!("Title:   {}", or_unknown(&project.name));
    println!("Author:  {}", or_unknown(&project.author));
    println!("Songs:   {}", project.songs.len());
    println!("Order:   {} positions (loop at {})", project.pattern_order.len(), project.loop_point_id);
    for (index, song) in project.songs.iter().enumerate() {
        println!(
            "  Song {index}: {} patterns, speed {}, chip {} @ {} Hz, {} Hz interrupt",
            song.patterns.len(),
            song.initial_speed,
            song.chip_type,
            song.chip_frequency,
            song.interrupt_frequency,
        );
    }
    println!("Instruments: {}", project.instruments.len());
    println!("Tables:      {}", project.tables.len());
}
