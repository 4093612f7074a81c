// SPDX-License-Identifier: GPL-3.0-only

//! Detection log replay
//!
//! A replay log is a JSON recording of detector output interleaved with
//! lifecycle commands. Replaying it through a controller reproduces the
//! result views an application would have seen.
//!
//! ```json
//! {
//!   "events": [
//!     { "command": "start" },
//!     { "frame": { "timestamp_ms": 0, "detections": [
//!         { "symbology": "EAN13", "recognized": true, "data": "4006381333931" }
//!     ] } },
//!     { "command": "pause" }
//!   ]
//! }
//! ```

use crate::config::ScanSettings;
use crate::controller::ScanController;
use crate::errors::{AppResult, ConfigError};
use crate::session::{Frame, SessionSnapshot};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, warn};

/// Lifecycle command inside a replay log
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplayCommand {
    Start,
    StartPaused,
    Pause,
    Resume,
    Stop,
    Clear,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplayEvent {
    Frame(Frame),
    Command(ReplayCommand),
    ApplySettings(Box<ScanSettings>),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReplayLog {
    /// Settings applied before the first event
    #[serde(default)]
    pub settings: Option<ScanSettings>,
    pub events: Vec<ReplayEvent>,
}

impl ReplayLog {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&contents)?)
    }
}

/// Result of replaying one event
#[derive(Debug, Clone)]
pub struct ReplayStep {
    pub index: usize,
    pub event: ReplayEvent,
    /// Whether the frame reached the worker; always true for commands
    pub accepted: bool,
    /// Error returned by a command, if any
    pub error: Option<String>,
    pub snapshot: SessionSnapshot,
}

/// Feed every event of `log` through `controller`, in order
///
/// Each event is fully handled before the next one is sent, so every step
/// carries the views as they were right after that event.
pub async fn run(controller: &ScanController, log: &ReplayLog) -> AppResult<Vec<ReplayStep>> {
    if let Some(settings) = &log.settings {
        controller.apply_settings(settings.clone()).await?;
    }

    let sink = controller.frame_sink();
    let results = controller.results();
    let mut steps = Vec::with_capacity(log.events.len());

    for (index, event) in log.events.iter().enumerate() {
        let mut accepted = true;
        let outcome = match event {
            ReplayEvent::Frame(frame) => {
                accepted = sink.submit(frame.clone());
                Ok(())
            }
            ReplayEvent::Command(command) => match command {
                ReplayCommand::Start => controller.start().await,
                ReplayCommand::StartPaused => controller.start_with(true).await,
                ReplayCommand::Pause => controller.pause_scanning().await,
                ReplayCommand::Resume => controller.resume_scanning().await,
                ReplayCommand::Stop => controller.stop_scanning().await,
                ReplayCommand::Clear => controller.clear().await,
            },
            ReplayEvent::ApplySettings(settings) => {
                controller.apply_settings((**settings).clone()).await
            }
        };
        controller.flush().await?;

        let error = outcome.err().map(|e| {
            warn!(index, error = %e, "Replay event failed");
            e.to_string()
        });
        debug!(index, accepted, "Replayed event");
        steps.push(ReplayStep {
            index,
            event: event.clone(),
            accepted,
            error,
            snapshot: results.snapshot(),
        });
    }

    Ok(steps)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_log() {
        let json = r#"{
            "events": [
                { "command": "start" },
                { "frame": { "timestamp_ms": 0, "detections": [
                    { "symbology": "EAN13", "recognized": true, "data": "4006381333931" },
                    { "recognized": false }
                ] } },
                { "apply_settings": { "code_duplicate_filter_ms": 0 } },
                { "command": "stop" }
            ]
        }"#;
        let log: ReplayLog = serde_json::from_str(json).unwrap();
        assert_eq!(log.events.len(), 4);
        assert_eq!(log.events[0], ReplayEvent::Command(ReplayCommand::Start));
        match &log.events[1] {
            ReplayEvent::Frame(frame) => assert_eq!(frame.detections.len(), 2),
            other => panic!("Expected frame, got {:?}", other),
        }
    }
}
