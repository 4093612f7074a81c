// SPDX-License-Identifier: GPL-3.0-only

//! Detectors turning images into detection records
//!
//! The scan engine treats decoding as a black box. This module defines the
//! seam a decoder plugs into and ships a QR decoder for still images.

pub mod qr;

pub use qr::QrImageDetector;

use crate::errors::DetectionError;
use crate::session::Detection;
use image::GrayImage;

/// Produces the detections of one frame
///
/// Detections are returned in detector order. Coordinates are in the pixel
/// space of the image passed in.
pub trait Detector: Send + Sync {
    fn detect(&self, image: &GrayImage, timestamp_ms: u64) -> Result<Vec<Detection>, DetectionError>;
}
