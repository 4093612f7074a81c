// SPDX-License-Identifier: GPL-3.0-only

//! Scan session engine
//!
//! This module reconciles the noisy per-frame detection stream into a
//! stable set of results. It is made of a duplicate filter, a code cache
//! and the session that drives both for every frame.

pub mod code_cache;
pub mod duplicate_filter;
pub mod policy;
pub mod scan_session;
pub mod types;

pub use code_cache::{CacheEntry, CodeCache};
pub use duplicate_filter::DuplicateFilter;
pub use policy::{CachingPolicy, DuplicatePolicy};
pub use scan_session::{FrameOutcome, ScanSession, SessionConfig, SessionSnapshot, SessionState};
pub use types::{Detection, DuplicateKey, Frame, Point, Quadrilateral, Symbology};
