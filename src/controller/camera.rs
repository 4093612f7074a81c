// SPDX-License-Identifier: GPL-3.0-only

//! Camera seam of the scan controller
//!
//! The controller only decides *when* the camera runs. Opening devices,
//! focusing and zooming belong to whatever implements [`CameraControl`].

use crate::config::{CameraFacing, HotSpot, ScanArea, ScanSettings, WorkingRange};
use crate::errors::DetectionError;
use tracing::debug;

/// Camera parameters derived from the active scan settings
#[derive(Debug, Clone, PartialEq)]
pub struct CameraRequest {
    pub facing: CameraFacing,
    pub working_range: WorkingRange,
    pub high_density: bool,
    pub relative_zoom: f64,
    pub scan_area_portrait: ScanArea,
    pub scan_area_landscape: ScanArea,
    pub hot_spot: HotSpot,
}

impl From<&ScanSettings> for CameraRequest {
    fn from(settings: &ScanSettings) -> Self {
        Self {
            facing: settings.camera_facing_preference,
            working_range: settings.working_range,
            high_density: settings.high_density_mode_enabled,
            relative_zoom: settings.relative_zoom,
            scan_area_portrait: settings.active_scanning_area_portrait,
            scan_area_landscape: settings.active_scanning_area_landscape,
            hot_spot: settings.scanning_hot_spot,
        }
    }
}

/// Camera lifecycle driven by the scan controller
///
/// All calls happen on the scan worker thread, serialized with frame
/// processing.
pub trait CameraControl: Send {
    /// Start the camera preview; called when scanning starts (running or paused)
    fn open(&mut self, request: &CameraRequest) -> Result<(), DetectionError>;

    /// Apply new parameters to an open camera
    fn reconfigure(&mut self, _request: &CameraRequest) -> Result<(), DetectionError> {
        Ok(())
    }

    /// Release the camera; called when scanning stops
    fn close(&mut self);

    fn is_open(&self) -> bool;
}

/// Camera stand-in for setups where frames come from elsewhere
#[derive(Debug, Default)]
pub struct NullCamera {
    open: bool,
}

impl CameraControl for NullCamera {
    fn open(&mut self, request: &CameraRequest) -> Result<(), DetectionError> {
        debug!(facing = ?request.facing, "Null camera opened");
        self.open = true;
        Ok(())
    }

    fn close(&mut self) {
        debug!("Null camera closed");
        self.open = false;
    }

    fn is_open(&self) -> bool {
        self.open
    }
}
