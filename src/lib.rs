// SPDX-License-Identifier: GPL-3.0-only

//! Scan Engine - barcode scan session engine
//!
//! This library turns per-frame detector output into the result views a
//! scanning application presents, and drives the scan lifecycle around it.
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - [`session`]: Per-frame processing, duplicate filtering and code caching
//! - [`controller`]: Start/pause/resume/stop lifecycle on a worker thread
//! - [`config`]: Scan settings, symbology table and persistence
//! - [`detector`]: Detector seam and a QR decoder for still images
//! - [`context`]: Explicit bundle of controller, detector and result handle
//! - [`replay`]: Replays recorded detection logs through a controller
//!
//! # Example
//!
//! ```ignore
//! let controller = ScanController::new(ScanSettings::default())?;
//! controller.start().await?;
//! controller.frame_sink().submit(frame);
//! controller.flush().await?;
//! let codes = controller.results().all_recognized();
//! ```

pub mod config;
pub mod constants;
pub mod context;
pub mod controller;
pub mod detector;
pub mod errors;
pub mod replay;
pub mod session;

// Re-export commonly used types
pub use config::{ScanSettings, SymbologySettings, SymbologyTable};
pub use context::ScanContext;
pub use controller::{FrameSink, ScanController, ScanListener, ScanResults, ScanState};
pub use detector::{Detector, QrImageDetector};
pub use errors::{AppError, AppResult};
pub use session::{
    CachingPolicy, Detection, DuplicatePolicy, Frame, Quadrilateral, ScanSession, SessionSnapshot,
    Symbology,
};
