//! Command-line arguments.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "bitphase")]
#[command(about = "Import, inspect and export bitphase tracker projects")]
#[command(version)]
pub struct Args {
    /// Log debug output (overrides RUST_LOG)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print title, author, songs and order length
    Info {
        /// Project (.btp) or module (.pt3, .vt2, .txt)
        file: PathBuf,
    },

    /// Convert a PT3 or VT2 module into a project file
    Import {
        /// Module to import
        file: PathBuf,

        /// Output project file
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Render every song to WAV (or a zip of per-channel WAVs)
    ExportWav {
        /// Project or module
        file: PathBuf,

        /// Output .wav or .zip file
        #[arg(short, long)]
        output: PathBuf,

        /// Sample rate in Hz (22050, 44100, 48000 or 96000)
        #[arg(long, default_value_t = 44_100)]
        rate: u32,

        /// Bits per sample (16, 24 or 32 float)
        #[arg(long, default_value_t = 16)]
        bits: u16,

        /// One mono file per song and channel, zipped
        #[arg(long)]
        separate: bool,

        /// Length ceiling per song in seconds
        #[arg(long)]
        max_seconds: Option<u32>,
    },

    /// Dump one song's register frames as PSG
    ExportPsg {
        /// Project or module
        file: PathBuf,

        /// Output .psg file
        #[arg(short, long)]
        output: PathBuf,

        /// Song (chip) index, starting at 0
        #[arg(long, default_value_t = 0)]
        song: usize,
    },
}
