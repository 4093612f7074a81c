// SPDX-License-Identifier: GPL-3.0-only

//! Error types for the scan engine

use std::fmt;

/// Result type alias using AppError
pub type AppResult<T> = Result<T, AppError>;

/// Main error type
#[derive(Debug, Clone)]
pub enum AppError {
    /// Invalid or unreadable configuration
    Config(ConfigError),
    /// Lifecycle command that cannot be honoured
    Lifecycle(LifecycleError),
    /// Detector or detection record errors
    Detection(DetectionError),
    /// Storage/filesystem errors
    Storage(String),
    /// Generic error with message
    Other(String),
}

/// Configuration errors
///
/// A rejected value never reaches the running engine; the previously
/// applied settings stay in effect.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// Negative duration other than the -1 sentinel
    InvalidDuration { setting: &'static str, value: i64 },
    /// Normalized rectangle outside 0.0-1.0 or with negative extent
    InvalidScanArea {
        x: f64,
        y: f64,
        width: f64,
        height: f64,
    },
    /// Hot spot outside 0.0-1.0
    InvalidHotSpot { x: f64, y: f64 },
    /// Zoom outside 0.0-1.0
    InvalidZoom(f64),
    /// Settings file could not be parsed
    Malformed(String),
    /// Settings file could not be read or written
    Io(String),
}

/// Lifecycle misuse errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleError {
    /// `resume_scanning` without a prior `start`; the controller stays stopped
    ResumeWhileStopped,
    /// The processing worker has shut down
    WorkerGone,
}

/// Detection and detector errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DetectionError {
    /// A recognized detection carried the unknown sentinel symbology
    UnknownSymbology,
    /// A localized-only detection carried a symbology or GS1 flag
    LocalizedWithAttributes,
    /// The camera backend failed to open or close
    Camera(String),
    /// The detector could not process a frame
    Detector(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Config(e) => write!(f, "Configuration error: {}", e),
            AppError::Lifecycle(e) => write!(f, "Lifecycle error: {}", e),
            AppError::Detection(e) => write!(f, "Detection error: {}", e),
            AppError::Storage(msg) => write!(f, "Storage error: {}", msg),
            AppError::Other(msg) => write!(f, "{}", msg),
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidDuration { setting, value } => {
                write!(f, "{} must be -1, 0 or positive, got {}", setting, value)
            }
            ConfigError::InvalidScanArea {
                x,
                y,
                width,
                height,
            } => write!(
                f,
                "Scan area ({}, {}, {}x{}) is outside the unit square",
                x, y, width, height
            ),
            ConfigError::InvalidHotSpot { x, y } => {
                write!(f, "Hot spot ({}, {}) is outside the unit square", x, y)
            }
            ConfigError::InvalidZoom(zoom) => write!(f, "Relative zoom {} is outside 0.0-1.0", zoom),
            ConfigError::Malformed(msg) => write!(f, "Malformed settings: {}", msg),
            ConfigError::Io(msg) => write!(f, "Settings I/O failed: {}", msg),
        }
    }
}

impl fmt::Display for LifecycleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LifecycleError::ResumeWhileStopped => {
                write!(f, "Cannot resume scanning that was never started")
            }
            LifecycleError::WorkerGone => write!(f, "Scan worker is no longer running"),
        }
    }
}

impl fmt::Display for DetectionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DetectionError::UnknownSymbology => {
                write!(f, "Recognized code must have a known symbology")
            }
            DetectionError::LocalizedWithAttributes => {
                write!(f, "Localized code must not carry symbology or GS1 flag")
            }
            DetectionError::Camera(msg) => write!(f, "Camera failure: {}", msg),
            DetectionError::Detector(msg) => write!(f, "Detector failure: {}", msg),
        }
    }
}

impl std::error::Error for AppError {}
impl std::error::Error for ConfigError {}
impl std::error::Error for LifecycleError {}
impl std::error::Error for DetectionError {}

// Conversions from sub-errors to AppError
impl From<ConfigError> for AppError {
    fn from(err: ConfigError) -> Self {
        AppError::Config(err)
    }
}

impl From<LifecycleError> for AppError {
    fn from(err: LifecycleError) -> Self {
        AppError::Lifecycle(err)
    }
}

impl From<DetectionError> for AppError {
    fn from(err: DetectionError) -> Self {
        AppError::Detection(err)
    }
}

impl From<String> for AppError {
    fn from(msg: String) -> Self {
        AppError::Other(msg)
    }
}

impl From<&str> for AppError {
    fn from(msg: &str) -> Self {
        AppError::Other(msg.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Storage(err.to_string())
    }
}

impl From<std::io::Error> for ConfigError {
    fn from(err: std::io::Error) -> Self {
        ConfigError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(err: serde_json::Error) -> Self {
        ConfigError::Malformed(err.to_string())
    }
}
