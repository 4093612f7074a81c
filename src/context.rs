// SPDX-License-Identifier: GPL-3.0-only

//! Scan context
//!
//! Bundles the collaborators of one scanner instance: the controller, the
//! frame sink the detector feeds, the result handle the presenter reads and
//! the detector itself. Nothing here is global; a context is created with
//! [`ScanContext::init`] and destroyed with [`ScanContext::teardown`].

use crate::config::ScanSettings;
use crate::controller::{FrameSink, ScanController, ScanResults, ScanState};
use crate::detector::Detector;
use crate::errors::AppResult;
use crate::session::Frame;
use image::GrayImage;
use std::time::Instant;
use tracing::{info, trace};

pub struct ScanContext {
    controller: ScanController,
    sink: FrameSink,
    detector: Box<dyn Detector>,
    epoch: Instant,
}

impl ScanContext {
    /// Create a context around an already built controller
    pub fn new(controller: ScanController, detector: impl Detector + 'static) -> Self {
        let sink = controller.frame_sink();
        Self {
            controller,
            sink,
            detector: Box::new(detector),
            epoch: Instant::now(),
        }
    }

    /// Create a context with a null camera and the given settings
    pub fn init(settings: ScanSettings, detector: impl Detector + 'static) -> AppResult<Self> {
        let controller = ScanController::new(settings)?;
        info!("Scan context initialized");
        Ok(Self::new(controller, detector))
    }

    pub fn controller(&self) -> &ScanController {
        &self.controller
    }

    pub fn results(&self) -> ScanResults {
        self.controller.results()
    }

    pub fn frame_sink(&self) -> FrameSink {
        self.sink.clone()
    }

    pub fn state(&self) -> ScanState {
        self.controller.state()
    }

    pub async fn start(&self) -> AppResult<()> {
        self.controller.start().await
    }

    pub async fn stop(&self) -> AppResult<()> {
        self.controller.stop_scanning().await
    }

    /// Milliseconds since the context was created
    pub fn now_ms(&self) -> u64 {
        self.epoch.elapsed().as_millis() as u64
    }

    /// Run the detector on `image` and queue the result
    ///
    /// The detector is skipped entirely unless scanning is running. Returns
    /// whether a frame was queued; detector failures drop the frame.
    pub fn process_image(&self, image: &GrayImage, timestamp_ms: u64) -> AppResult<bool> {
        if !self.sink.is_accepting() {
            trace!(timestamp_ms, "Skipping detection, scanning not running");
            return Ok(false);
        }
        let detections = self.detector.detect(image, timestamp_ms)?;
        Ok(self.sink.submit(Frame::new(timestamp_ms, detections)))
    }

    /// Stop scanning and shut the worker down
    pub async fn teardown(self) -> AppResult<()> {
        info!("Tearing down scan context");
        self.controller.shutdown().await
    }
}
