//! srt: inspect and move Serato DJ data
//!
//! Reads crates and per-track cue/loop/beat grid data, and copies Serato
//! frames between MP3 files without disturbing the rest of the tag.

mod config;
mod inspect;
mod retag;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing::{info, Level};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use config::{Config, OutputFormat};

#[derive(Parser)]
#[command(name = "srt")]
#[command(about = "Read and copy Serato crates, cues and beat grids")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Print single-line JSON
    #[arg(long, global = true)]
    compact: bool,

    /// Padding in bytes to leave when a tag has to be rebuilt
    #[arg(long, global = true, default_value = "1024")]
    padding: u32,

    /// Reject Markers2 data that does not end with a BPMLOCK entry
    #[arg(long, global = true)]
    strict: bool,

    /// Verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Print the tracks of a .crate file
    Crate { path: PathBuf },
    /// Print every crate below a directory (usually _Serato_/Subcrates)
    Crates { dir: PathBuf },
    /// Print Serato cues, loops, colour and beat grid of an MP3 or FLAC file
    Markers { path: PathBuf },
    /// Copy the Serato frames of one MP3 into another
    CopyMarkers { src: PathBuf, dst: PathBuf },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr so stdout stays valid JSON
    let builder = FmtSubscriber::builder()
        .with_writer(std::io::stderr)
        .compact();
    if std::env::var_os("RUST_LOG").is_some() {
        tracing::subscriber::set_global_default(
            builder.with_env_filter(EnvFilter::from_default_env()).finish(),
        )?;
    } else {
        let level = if cli.verbose { Level::DEBUG } else { Level::INFO };
        tracing::subscriber::set_global_default(builder.with_max_level(level).finish())?;
    }

    let config = Config {
        output: if cli.compact {
            OutputFormat::Compact
        } else {
            OutputFormat::Pretty
        },
        padding: cli.padding,
        strict: cli.strict,
    };

    let json = match &cli.command {
        Command::Crate { path } => config.render(&inspect::read_crate(path)?)?,
        Command::Crates { dir } => config.render(&inspect::read_crate_dir(dir)?)?,
        Command::Markers { path } => config.render(&inspect::read_markers(&config, path)?)?,
        Command::CopyMarkers { src, dst } => {
            let report = retag::copy_markers(&config, src, dst)?;
            info!(
                "Copied {} frames from {:?} to {:?}",
                report.frames_copied, src, dst
            );
            config.render(&report)?
        }
    };
    println!("{}", json);

    Ok(())
}
