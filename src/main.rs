// SPDX-License-Identifier: GPL-3.0-only

use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod cli;

#[derive(Parser)]
#[command(name = "scan-engine")]
#[command(about = "Barcode scan session engine")]
#[command(version = scan_engine::constants::app_info::version())]
struct Cli {
    /// Settings file (default: ~/.config/scan-engine/settings.json)
    #[arg(short, long, global = true)]
    settings: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay a recorded detection log and print the result views
    Replay {
        /// JSON detection log
        log: PathBuf,
    },

    /// Scan still images for QR codes as consecutive frames
    Images {
        /// Image files, processed in order
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Simulated time between two images
        #[arg(short, long, default_value = "100")]
        interval_ms: u64,

        /// Write the JSON report to this file instead of stdout
        #[arg(short, long)]
        report: Option<PathBuf>,
    },

    /// Print the effective settings
    Settings {
        /// Write the effective settings to the settings file
        #[arg(short, long)]
        write: bool,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    // Set RUST_LOG environment variable to control log level
    // Examples: RUST_LOG=debug, RUST_LOG=scan_engine=trace, RUST_LOG=info
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_target(true)
        .with_level(true)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let settings_path = cli.settings;

    match cli.command {
        Commands::Replay { log } => cli::replay(&log, settings_path),
        Commands::Images {
            files,
            interval_ms,
            report,
        } => cli::scan_images(&files, interval_ms, report, settings_path),
        Commands::Settings { write } => cli::show_settings(settings_path, write),
    }
}
