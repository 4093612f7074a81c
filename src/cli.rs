// SPDX-License-Identifier: GPL-3.0-only

//! CLI commands for scan operations
//!
//! This module provides command-line functionality for:
//! - Replaying recorded detection logs
//! - Scanning still images for QR codes
//! - Showing and writing the effective settings

use chrono::Local;
use scan_engine::config::ScanSettings;
use scan_engine::context::ScanContext;
use scan_engine::controller::ScanController;
use scan_engine::detector::QrImageDetector;
use scan_engine::replay::{self, ReplayEvent, ReplayLog};
use scan_engine::session::{Detection, SessionSnapshot};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::Instant;

type CliResult = Result<(), Box<dyn std::error::Error>>;

/// Settings from an explicit file, or from the default location if present
fn resolve_settings(path: Option<PathBuf>) -> Result<ScanSettings, Box<dyn std::error::Error>> {
    match path {
        Some(path) => Ok(ScanSettings::load(&path)?),
        None => Ok(ScanSettings::default_path()
            .map(|path| ScanSettings::load_or_default(&path))
            .unwrap_or_default()),
    }
}

fn runtime() -> std::io::Result<tokio::runtime::Runtime> {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
}

fn print_codes(label: &str, codes: &[Detection]) {
    for code in codes {
        println!("  {} {}: {}", label, code.symbology(), code.data_lossy());
    }
}

/// Replay a detection log and print the views after each event
pub fn replay(log_path: &Path, settings_path: Option<PathBuf>) -> CliResult {
    let settings = resolve_settings(settings_path)?;
    let log = ReplayLog::load(log_path)?;
    println!(
        "Replaying {} events from {}",
        log.events.len(),
        log_path.display()
    );

    runtime()?.block_on(async {
        let controller = ScanController::new(settings)?;
        let steps = replay::run(&controller, &log).await?;

        for step in &steps {
            let label = match &step.event {
                ReplayEvent::Frame(frame) => format!("frame @{}ms", frame.timestamp_ms),
                ReplayEvent::Command(command) => format!("{:?}", command).to_lowercase(),
                ReplayEvent::ApplySettings(_) => "apply settings".to_string(),
            };
            println!("[{}] {}", step.index, label);
            if !step.accepted {
                println!("  (frame refused)");
            }
            if let Some(error) = &step.error {
                println!("  error: {}", error);
            }
            print_codes("new", &step.snapshot.newly_recognized);
            println!(
                "  localized: {}, total: {}",
                step.snapshot.newly_localized.len(),
                step.snapshot.all_recognized.len()
            );
        }

        let last = steps.last().map(|step| step.snapshot.clone()).unwrap_or_default();
        println!();
        println!("Recognized codes: {}", last.all_recognized.len());
        print_codes("*", &last.all_recognized);

        controller.shutdown().await?;
        Ok::<(), Box<dyn std::error::Error>>(())
    })
}

#[derive(Serialize)]
struct ImageReport {
    path: PathBuf,
    timestamp_ms: u64,
    accepted: bool,
    newly_recognized: Vec<Detection>,
    newly_localized: usize,
}

#[derive(Serialize)]
struct ScanReport {
    generated_at: String,
    settings: ScanSettings,
    images: Vec<ImageReport>,
    result: SessionSnapshot,
}

/// Scan still images as consecutive frames of one session
pub fn scan_images(
    files: &[PathBuf],
    interval_ms: u64,
    report_path: Option<PathBuf>,
    settings_path: Option<PathBuf>,
) -> CliResult {
    let settings = resolve_settings(settings_path)?;
    let start_time = Instant::now();

    runtime()?.block_on(async {
        let context = ScanContext::init(settings.clone(), QrImageDetector::new())?;
        context.start().await?;
        let results = context.results();

        let mut images = Vec::with_capacity(files.len());
        for (index, path) in files.iter().enumerate() {
            let timestamp_ms = index as u64 * interval_ms;
            let image = match image::open(path) {
                Ok(image) => image.to_luma8(),
                Err(e) => {
                    eprintln!("Skipping {}: {}", path.display(), e);
                    continue;
                }
            };

            let accepted = context.process_image(&image, timestamp_ms)?;
            context.controller().flush().await?;
            let snapshot = results.snapshot();

            println!("{} ({}x{})", path.display(), image.width(), image.height());
            print_codes("new", &snapshot.newly_recognized);

            images.push(ImageReport {
                path: path.clone(),
                timestamp_ms,
                accepted,
                newly_recognized: snapshot.newly_recognized,
                newly_localized: snapshot.newly_localized.len(),
            });
        }

        let result = results.snapshot();
        println!();
        println!(
            "Recognized {} code(s) in {} image(s) ({:.1}s)",
            result.all_recognized.len(),
            images.len(),
            start_time.elapsed().as_secs_f64()
        );

        let report = ScanReport {
            generated_at: Local::now().to_rfc3339(),
            settings,
            images,
            result,
        };
        let json = serde_json::to_string_pretty(&report)?;
        match report_path {
            Some(report_path) => {
                std::fs::write(&report_path, json)?;
                println!("Report saved to: {}", report_path.display());
            }
            None => println!("{}", json),
        }

        context.teardown().await?;
        Ok::<(), Box<dyn std::error::Error>>(())
    })
}

/// Print the effective settings, optionally persisting them
pub fn show_settings(settings_path: Option<PathBuf>, write: bool) -> CliResult {
    let path = settings_path.clone().or_else(ScanSettings::default_path);
    let settings = resolve_settings(settings_path)?;
    println!("{}", serde_json::to_string_pretty(&settings)?);

    if write {
        let path = path.ok_or("No configuration directory available")?;
        settings.save(&path)?;
        println!("Settings saved to: {}", path.display());
    }
    Ok(())
}
