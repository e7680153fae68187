//! Facemark CLI - video-derived identities and signature watermarks.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use tracing_subscriber::EnvFilter;

mod commands;
mod exit_codes;
mod utils;

use exit_codes::ExitCode;

const EXIT_CODES_HELP: &str = "\
Exit codes:
  0   Success
  1   General error (no face detected, face overlaps the carrier, ...)
  64  Usage error (invalid arguments)
  65  Verification failed (missing or rejected signature)
  66  Input error (cannot read video or public key)
  74  I/O error (cannot write output)";

/// Output format for command results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable colored text
    Text,
    /// Machine-readable JSON on stdout
    Json,
}

/// When to colorize human output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ColorChoice {
    Auto,
    Always,
    Never,
}

/// Options shared by every command.
#[derive(Debug, Clone)]
pub struct GlobalOptions {
    pub format: OutputFormat,
    pub quiet: bool,
    pub face: Option<String>,
    pub face_scale: Option<f32>,
}

#[derive(Parser)]
#[command(name = "facemark")]
#[command(author, version, about = "Video-derived identities and signature watermarks", long_about = None)]
#[command(after_help = EXIT_CODES_HELP)]
struct Cli {
    /// Suppress human output (errors are still reported)
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    /// Enable debug logging on stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Colorize output
    #[arg(long, global = true, value_enum, default_value = "auto")]
    color: ColorChoice,

    /// Output format
    #[arg(short, long, global = true, value_enum, default_value = "text")]
    format: OutputFormat,

    /// Fixed face region as X,Y,W,H (pixels)
    #[arg(long, global = true, value_name = "X,Y,W,H", conflicts_with = "face_scale")]
    face: Option<String>,

    /// Centered face square as a fraction of the shorter frame edge
    #[arg(long, global = true, value_name = "F")]
    face_scale: Option<f32>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Derive a video's identity and print its fingerprint
    Identity {
        /// Frame-sequence directory of the video
        #[arg(value_name = "VIDEO")]
        video: PathBuf,

        /// Save the public key to this path
        #[arg(short, long, value_name = "PATH")]
        public_key: Option<PathBuf>,

        /// Save the public key next to the video as <VIDEO>.pub
        #[arg(short, long, conflicts_with = "public_key")]
        save: bool,
    },

    /// Sign a video by watermarking its first frame
    Sign {
        /// Frame-sequence directory of the video to sign
        #[arg(value_name = "VIDEO")]
        video: PathBuf,

        /// Directory for the signed frame sequence
        #[arg(value_name = "OUTPUT")]
        output: PathBuf,

        /// Where to save the public key (defaults to <OUTPUT>.pub)
        #[arg(short, long, value_name = "PATH")]
        public_key: Option<PathBuf>,

        /// Derive the identity and check the carrier without writing anything
        #[arg(short = 'n', long)]
        dry_run: bool,
    },

    /// Verify a signed video against a public key
    Verify {
        /// Frame-sequence directory of the signed video
        #[arg(value_name = "VIDEO")]
        video: PathBuf,

        /// Public key file (defaults to <VIDEO>.pub)
        #[arg(short, long, value_name = "PATH")]
        public_key: Option<PathBuf>,
    },

    /// Show container metadata and the raw carrier contents
    Inspect {
        /// Frame-sequence directory
        #[arg(value_name = "VIDEO")]
        video: PathBuf,
    },
}

fn init_tracing(quiet: bool, verbose: bool) {
    let default_level = if quiet {
        "error"
    } else if verbose {
        "debug"
    } else {
        "warn"
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    // Logs go to stderr so stdout stays clean for --format json
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn run(cli: Cli) -> Result<()> {
    let options = GlobalOptions {
        format: cli.format,
        quiet: cli.quiet,
        face: cli.face,
        face_scale: cli.face_scale,
    };

    match cli.command {
        Commands::Identity {
            video,
            public_key,
            save,
        } => commands::identity::execute(video, public_key, save, &options),
        Commands::Sign {
            video,
            output,
            public_key,
            dry_run,
        } => commands::sign::execute(video, output, public_key, dry_run, &options),
        Commands::Verify { video, public_key } => {
            commands::verify::execute(video, public_key, &options)
        }
        Commands::Inspect { video } => commands::inspect::execute(video, &options),
    }
}

fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            let _ = err.print();
            // Help and version are requests, not failures
            let code = if err.use_stderr() {
                exit_codes::USAGE_ERROR
            } else {
                exit_codes::SUCCESS
            };
            std::process::exit(code);
        }
    };

    match cli.color {
        ColorChoice::Always => colored::control::set_override(true),
        ColorChoice::Never => colored::control::set_override(false),
        ColorChoice::Auto => {}
    }
    init_tracing(cli.quiet, cli.verbose);

    let exit = match run(cli) {
        Ok(()) => ExitCode::success(),
        Err(err) => ExitCode::from_anyhow(&err),
    };

    if let Some(message) = &exit.message {
        eprintln!("{} {}", "Error:".red().bold(), message);
    }
    std::process::exit(exit.code);
}
