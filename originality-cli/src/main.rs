//! Originality CLI - duplicate detection for images, text and video.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use tracing_subscriber::EnvFilter;

mod commands;
mod exit_codes;
mod utils;

use commands::Settings;
use exit_codes::ExitCode;

const EXIT_CODES_HELP: &str = "\
EXIT CODES:
    0   Success
    1   General error
    64  Unsupported file type
    65  Unreadable content, or duplicate found with --fail-on-duplicate
    66  Input file not found or unreadable
    69  Matching service unavailable
    74  Fingerprint store error";

#[derive(Parser)]
#[command(name = "originality")]
#[command(author, version, about = "Duplicate and derivative detection for images, text and video", long_about = None)]
#[command(after_help = EXIT_CODES_HELP)]
struct Cli {
    /// Fingerprint database URL
    #[arg(
        long,
        global = true,
        env = "ORIGINALITY_DATABASE_URL",
        default_value = "sqlite://fingerprints.db?mode=rwc"
    )]
    database: String,

    /// Audio matching service used for video
    #[arg(long, global = true, default_value = "http://localhost:8080")]
    audio_url: String,

    /// Remote image matching service for video frames (local engine when unset)
    #[arg(long, global = true)]
    image_url: Option<String>,

    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Exit with code 65 when a duplicate is found
    #[arg(long, global = true)]
    fail_on_duplicate: bool,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Suppress human-readable output
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fingerprint images by perceptual hash of nine segments
    Image {
        #[command(subcommand)]
        action: Action,
    },

    /// Fingerprint .txt, .pdf and .docx documents
    Text {
        #[command(subcommand)]
        action: Action,
    },

    /// Fingerprint videos through their audio track and sampled frames
    Video {
        #[command(subcommand)]
        action: Action,
    },
}

#[derive(Subcommand)]
enum Action {
    /// Register a file as an original asset
    Register(RegisterArgs),

    /// Check a file against every registered asset
    Check {
        /// Path to the file to check
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },
}

#[derive(Args)]
struct RegisterArgs {
    /// Path to the file to register
    #[arg(value_name = "FILE")]
    file: PathBuf,

    /// Asset identifier (images default to a random UUID, other media to the file name)
    #[arg(long)]
    id: Option<String>,
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let settings = Settings {
        database: cli.database,
        audio_url: cli.audio_url,
        image_url: cli.image_url,
        json: cli.json,
        quiet: cli.quiet,
    };

    let result = match cli.command {
        Commands::Image { action } => match action {
            Action::Register(args) => {
                commands::image::register(&settings, args.file, args.id).await
            }
            Action::Check { file } => commands::image::check(&settings, file).await,
        },
        Commands::Text { action } => match action {
            Action::Register(args) => {
                commands::text::register(&settings, args.file, args.id).await
            }
            Action::Check { file } => commands::text::check(&settings, file).await,
        },
        Commands::Video { action } => match action {
            Action::Register(args) => {
                commands::video::register(&settings, args.file, args.id).await
            }
            Action::Check { file } => commands::video::check(&settings, file).await,
        },
    };

    let exit = match result {
        Ok(outcome) if outcome.duplicate && cli.fail_on_duplicate => ExitCode::duplicate(),
        Ok(_) => ExitCode::success(),
        Err(err) => ExitCode::from_anyhow(&err),
    };

    if let Some(message) = &exit.message {
        eprintln!("{} {message}", "Error:".red().bold());
    }
    std::process::exit(exit.code);
}
