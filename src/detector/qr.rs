// SPDX-License-Identifier: GPL-3.0-only

//! QR code detection task
//!
//! Implements QR code detection using the rqrr crate. Frames are converted
//! to grayscale and downscaled for speed; grids that decode become
//! recognized detections, grids that don't are reported as localized.

use super::Detector;
use crate::constants::QR_MAX_DIMENSION;
use crate::errors::DetectionError;
use crate::session::{Detection, Point, Quadrilateral, Symbology};
use image::GrayImage;
use image::imageops::{self, FilterType};
use tracing::{debug, trace};

/// QR code detector
///
/// Optimized for real-time processing with frame downscaling.
pub struct QrImageDetector {
    /// Maximum dimension for processing (frames are downscaled to this)
    max_dimension: u32,
}

impl Default for QrImageDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl QrImageDetector {
    pub fn new() -> Self {
        Self {
            max_dimension: QR_MAX_DIMENSION,
        }
    }
}

impl Detector for QrImageDetector {
    fn detect(&self, image: &GrayImage, timestamp_ms: u64) -> Result<Vec<Detection>, DetectionError> {
        let start = std::time::Instant::now();
        let (width, height) = image.dimensions();
        if width == 0 || height == 0 {
            return Err(DetectionError::Detector("empty image".to_string()));
        }

        let (scale, downscaled) = downscale_factor(width, height, self.max_dimension);
        let owned;
        let prepared_source = match downscaled {
            Some((new_width, new_height)) => {
                owned = imageops::resize(image, new_width, new_height, FilterType::Triangle);
                &owned
            }
            None => image,
        };

        trace!(
            width = prepared_source.width(),
            height = prepared_source.height(),
            scale,
            "Prepared grayscale image for QR detection"
        );

        let mut prepared = rqrr::PreparedImage::prepare_from_greyscale(
            prepared_source.width() as usize,
            prepared_source.height() as usize,
            |x, y| prepared_source.get_pixel(x as u32, y as u32).0[0],
        );
        let grids = prepared.detect_grids();

        let mut detections = Vec::with_capacity(grids.len());
        for grid in grids {
            // rqrr reports corners clockwise starting at the top-left
            let [tl, tr, br, bl] = grid.bounds;
            let location = Quadrilateral {
                top_left: Point::new(tl.x as f64, tl.y as f64),
                top_right: Point::new(tr.x as f64, tr.y as f64),
                bottom_left: Point::new(bl.x as f64, bl.y as f64),
                bottom_right: Point::new(br.x as f64, br.y as f64),
            }
            .scaled(scale);

            let mut data = Vec::new();
            match grid.decode_to(&mut data) {
                Ok(meta) => {
                    debug!(version = meta.version.0, bytes = data.len(), "Decoded QR code");
                    detections.push(Detection::recognized(
                        Symbology::Qr,
                        data,
                        false,
                        location,
                        timestamp_ms,
                    )?);
                }
                Err(e) => {
                    debug!(error = %e, "QR grid found but not decoded");
                    detections.push(Detection::localized(location, timestamp_ms));
                }
            }
        }

        if !detections.is_empty() {
            debug!(
                count = detections.len(),
                total_ms = start.elapsed().as_millis(),
                "QR detection found codes"
            );
        }

        Ok(detections)
    }
}

/// Scale factor back to source pixels and the downscaled size, if any
fn downscale_factor(width: u32, height: u32, max_dimension: u32) -> (f64, Option<(u32, u32)>) {
    if width <= max_dimension && height <= max_dimension {
        return (1.0, None);
    }
    let scale = (width as f64 / max_dimension as f64).max(height as f64 / max_dimension as f64);
    let new_width = ((width as f64 / scale) as u32).max(1);
    let new_height = ((height as f64 / scale) as u32).max(1);
    (scale, Some((new_width, new_height)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_downscale_factor() {
        assert_eq!(downscale_factor(640, 480, 640), (1.0, None));
        let (scale, size) = downscale_factor(1280, 720, 640);
        assert!((scale - 2.0).abs() < 1e-9);
        assert_eq!(size, Some((640, 360)));
    }

    #[test]
    fn test_blank_image_has_no_codes() {
        let image = GrayImage::from_pixel(64, 64, image::Luma([255]));
        let detections = QrImageDetector::new().detect(&image, 0).unwrap();
        assert!(detections.is_empty());
    }

    #[test]
    fn test_empty_image_rejected() {
        let image = GrayImage::new(0, 0);
        assert!(QrImageDetector::new().detect(&image, 0).is_err());
    }
}
