// SPDX-License-Identifier: GPL-3.0-only

//! Scan controller
//!
//! Drives the scan lifecycle (start, pause, resume, stop) and routes frames
//! from the detector into the scan session while scanning is running.
//!
//! Every state change is a message on a single queue drained by the scan
//! worker thread, the same queue that carries frames. A command's effect
//! is therefore only guaranteed once its future has completed: frames
//! queued before a `stop_scanning` are still handled (and then cleared),
//! frames queued after it never reach the session.
//!
//! # Example
//!
//! ```ignore
//! let controller = ScanController::builder().build()?;
//! let sink = controller.frame_sink();
//! controller.start().await?;
//! sink.submit(frame);
//! let results = controller.results().snapshot();
//! ```

pub mod camera;
mod worker;
pub mod worker_loop;

pub use camera::{CameraControl, CameraRequest, NullCamera};
pub use worker_loop::{LoopAction, WorkerLoop};

use crate::config::ScanSettings;
use crate::constants::MAX_PENDING_FRAMES;
use crate::errors::{AppError, AppResult, LifecycleError};
use crate::session::{Detection, Frame, ScanSession, SessionSnapshot};
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, AtomicU64, AtomicUsize, Ordering};
use tokio::sync::{mpsc, oneshot, watch};
use tracing::{debug, trace, warn};
use worker::{Command, Worker, WorkerMessage};

/// Run state of the scan controller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum ScanState {
    /// Camera released, no session
    #[default]
    Stopped = 0,
    /// Camera active, frames are processed
    Running = 1,
    /// Camera active, frames are discarded; session kept
    Paused = 2,
}

impl ScanState {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => ScanState::Running,
            2 => ScanState::Paused,
            _ => ScanState::Stopped,
        }
    }
}

/// Callback invoked after a frame produced newly recognized codes
///
/// Runs on the scan worker before the results are published. The listener
/// may call [`ScanSession::pause`] or [`ScanSession::stop`]; the controller
/// follows before handling the next queued message.
pub trait ScanListener: Send {
    fn did_scan(&mut self, session: &mut ScanSession);
}

impl<F> ScanListener for F
where
    F: FnMut(&mut ScanSession) + Send,
{
    fn did_scan(&mut self, session: &mut ScanSession) {
        self(session)
    }
}

/// State shared between the controller, its frame sinks and the worker
#[derive(Debug, Default)]
pub(crate) struct SharedState {
    state: AtomicU8,
    /// Bumped by every start and stop; frames carry the value they were accepted under
    generation: AtomicU64,
    pending_frames: AtomicUsize,
    dropped_frames: AtomicU64,
}

impl SharedState {
    pub(crate) fn state(&self) -> ScanState {
        ScanState::from_u8(self.state.load(Ordering::Acquire))
    }

    pub(crate) fn set_state(&self, state: ScanState) {
        self.state.store(state as u8, Ordering::Release);
    }

    pub(crate) fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    pub(crate) fn next_generation(&self) {
        self.generation.fetch_add(1, Ordering::AcqRel);
    }

    pub(crate) fn frame_dequeued(&self) {
        self.pending_frames.fetch_sub(1, Ordering::AcqRel);
    }
}

/// Entry point for detector output
///
/// Cheap to clone; hand one to every thread that produces frames.
#[derive(Clone)]
pub struct FrameSink {
    sender: mpsc::UnboundedSender<WorkerMessage>,
    shared: Arc<SharedState>,
}

impl FrameSink {
    /// Whether frames are currently wanted
    ///
    /// Detectors should check this before running recognition so that no
    /// work is spent while scanning is paused or stopped.
    pub fn is_accepting(&self) -> bool {
        self.shared.state() == ScanState::Running
    }

    /// Queue a frame for processing
    ///
    /// Returns `false` when the frame was refused: scanning not running,
    /// too many frames already waiting, or the worker gone. Refused frames
    /// never reach the session, and neither do frames accepted before a
    /// stop that are still queued after a later start.
    pub fn submit(&self, frame: Frame) -> bool {
        // Read before the state so a stop/start in between is caught by the worker
        let generation = self.shared.generation();
        if !self.is_accepting() {
            trace!(timestamp_ms = frame.timestamp_ms, "Frame refused, not running");
            return false;
        }
        let pending = self.shared.pending_frames.fetch_add(1, Ordering::AcqRel);
        if pending >= MAX_PENDING_FRAMES {
            self.shared.pending_frames.fetch_sub(1, Ordering::AcqRel);
            let dropped = self.shared.dropped_frames.fetch_add(1, Ordering::Relaxed) + 1;
            debug!(pending, dropped, "Dropping frame, worker is behind");
            return false;
        }
        if self
            .sender
            .send(WorkerMessage::Frame { frame, generation })
            .is_err()
        {
            self.shared.pending_frames.fetch_sub(1, Ordering::AcqRel);
            return false;
        }
        true
    }

    /// Convenience for detectors that produce a plain detection list
    pub fn submit_detections(&self, timestamp_ms: u64, detections: Vec<Detection>) -> bool {
        self.submit(Frame::new(timestamp_ms, detections))
    }

    /// Frames dropped because the worker could not keep up
    pub fn dropped_frames(&self) -> u64 {
        self.shared.dropped_frames.load(Ordering::Relaxed)
    }
}

/// Read-only access to the published result views
///
/// Each published snapshot reflects exactly one completed frame (or a
/// lifecycle change). Every accessor returns an independent copy.
#[derive(Clone)]
pub struct ScanResults {
    receiver: watch::Receiver<Arc<SessionSnapshot>>,
}

impl ScanResults {
    /// All three views from the same frame
    pub fn snapshot(&self) -> SessionSnapshot {
        (**self.receiver.borrow()).clone()
    }

    /// Codes localized but not recognized in the last frame
    ///
    /// Use [`ScanResults::snapshot`] when several views must match.
    pub fn newly_localized(&self) -> Vec<Detection> {
        self.receiver.borrow().newly_localized.clone()
    }

    pub fn newly_recognized(&self) -> Vec<Detection> {
        self.receiver.borrow().newly_recognized.clone()
    }

    pub fn all_recognized(&self) -> Vec<Detection> {
        self.receiver.borrow().all_recognized.clone()
    }

    /// Wait for the next published snapshot
    pub async fn changed(&mut self) -> Result<SessionSnapshot, LifecycleError> {
        self.receiver
            .changed()
            .await
            .map_err(|_| LifecycleError::WorkerGone)?;
        Ok((**self.receiver.borrow_and_update()).clone())
    }
}

/// Builder for [`ScanController`]
pub struct ScanControllerBuilder {
    settings: ScanSettings,
    camera: Box<dyn CameraControl>,
    listener: Option<Box<dyn ScanListener>>,
    name: String,
}

impl Default for ScanControllerBuilder {
    fn default() -> Self {
        Self {
            settings: ScanSettings::default(),
            camera: Box::new(NullCamera::default()),
            listener: None,
            name: "scan-worker".to_string(),
        }
    }
}

impl ScanControllerBuilder {
    pub fn settings(mut self, settings: ScanSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn camera(mut self, camera: impl CameraControl + 'static) -> Self {
        self.camera = Box::new(camera);
        self
    }

    pub fn listener(mut self, listener: impl ScanListener + 'static) -> Self {
        self.listener = Some(Box::new(listener));
        self
    }

    /// Name of the worker thread
    pub fn name(mut self, name: &str) -> Self {
        self.name = name.to_string();
        self
    }

    /// Validate the settings and spawn the worker
    pub fn build(self) -> AppResult<ScanController> {
        self.settings.validate()?;

        let (sender, receiver) = mpsc::unbounded_channel();
        let shared = Arc::new(SharedState::default());
        let (results_tx, results_rx) = watch::channel(Arc::new(SessionSnapshot::default()));
        let (settings_tx, settings_rx) = watch::channel(Arc::new(self.settings.clone()));

        let mut worker = Worker::new(
            receiver,
            Arc::clone(&shared),
            self.settings,
            self.camera,
            self.listener,
            results_tx,
            settings_tx,
        );
        let worker_loop = WorkerLoop::start(&self.name, move || worker.run_once())?;

        Ok(ScanController {
            sender,
            shared,
            results: results_rx,
            settings: settings_rx,
            worker_loop: Some(worker_loop),
        })
    }
}

/// Asynchronous scan lifecycle controller
///
/// All lifecycle methods are idempotent in their no-op source state and
/// return once the worker has applied them.
pub struct ScanController {
    sender: mpsc::UnboundedSender<WorkerMessage>,
    shared: Arc<SharedState>,
    results: watch::Receiver<Arc<SessionSnapshot>>,
    settings: watch::Receiver<Arc<ScanSettings>>,
    worker_loop: Option<WorkerLoop>,
}

impl ScanController {
    pub fn builder() -> ScanControllerBuilder {
        ScanControllerBuilder::default()
    }

    /// Controller with the given settings, a null camera and no listener
    pub fn new(settings: ScanSettings) -> AppResult<Self> {
        Self::builder().settings(settings).build()
    }

    async fn send(&self, command: Command) -> AppResult<()> {
        let (reply, response) = oneshot::channel();
        self.sender
            .send(WorkerMessage::Command { command, reply })
            .map_err(|_| AppError::Lifecycle(LifecycleError::WorkerGone))?;
        response
            .await
            .map_err(|_| AppError::Lifecycle(LifecycleError::WorkerGone))?
    }

    /// Open the camera and start scanning with a fresh session
    pub async fn start(&self) -> AppResult<()> {
        self.start_with(false).await
    }

    /// Open the camera with a fresh session, optionally without recognizing yet
    ///
    /// No-op when scanning was already started.
    pub async fn start_with(&self, start_paused: bool) -> AppResult<()> {
        self.send(Command::Start {
            paused: start_paused,
        })
        .await
    }

    /// Stop recognizing while keeping the camera and session
    ///
    /// No-op unless running.
    pub async fn pause_scanning(&self) -> AppResult<()> {
        self.send(Command::Pause).await
    }

    /// Continue a paused scan without touching the session
    ///
    /// Returns [`LifecycleError::ResumeWhileStopped`] if scanning was never
    /// started (or was stopped); the controller then stays stopped.
    pub async fn resume_scanning(&self) -> AppResult<()> {
        self.send(Command::Resume).await
    }

    /// Release the camera and clear the session
    pub async fn stop_scanning(&self) -> AppResult<()> {
        self.send(Command::Stop).await
    }

    /// Clear the session without changing the run state
    pub async fn clear(&self) -> AppResult<()> {
        self.send(Command::Clear).await
    }

    /// Replace the settings between two frames
    ///
    /// Invalid settings are rejected and the previous ones stay in effect.
    pub async fn apply_settings(&self, settings: ScanSettings) -> AppResult<()> {
        self.send(Command::ApplySettings(Box::new(settings))).await
    }

    /// Wait until every frame and command queued so far has been handled
    pub async fn flush(&self) -> AppResult<()> {
        self.send(Command::Sync).await
    }

    pub fn state(&self) -> ScanState {
        self.shared.state()
    }

    /// Settings currently in effect
    pub fn settings(&self) -> ScanSettings {
        (**self.settings.borrow()).clone()
    }

    pub fn frame_sink(&self) -> FrameSink {
        FrameSink {
            sender: self.sender.clone(),
            shared: Arc::clone(&self.shared),
        }
    }

    pub fn results(&self) -> ScanResults {
        ScanResults {
            receiver: self.results.clone(),
        }
    }

    /// Stop scanning and terminate the worker
    pub async fn shutdown(mut self) -> AppResult<()> {
        let (reply, response) = oneshot::channel();
        if self
            .sender
            .send(WorkerMessage::Shutdown { reply: Some(reply) })
            .is_ok()
        {
            let _ = response.await;
        }
        if let Some(mut worker_loop) = self.worker_loop.take() {
            tokio::task::spawn_blocking(move || worker_loop.join())
                .await
                .map_err(|e| AppError::Other(format!("Scan worker join failed: {}", e)))?;
        }
        Ok(())
    }
}

impl Drop for ScanController {
    fn drop(&mut self) {
        if let Some(worker_loop) = self.worker_loop.as_ref() {
            if self
                .sender
                .send(WorkerMessage::Shutdown { reply: None })
                .is_err()
            {
                warn!("Scan worker already gone");
            }
            worker_loop.request_stop();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::{Quadrilateral, Symbology};

    fn frame(timestamp_ms: u64, data: &str) -> Frame {
        let code = Detection::recognized(
            Symbology::Qr,
            data.as_bytes().to_vec(),
            false,
            Quadrilateral::default(),
            timestamp_ms,
        )
        .unwrap();
        Frame::new(timestamp_ms, vec![code])
    }

    #[tokio::test]
    async fn test_frame_from_previous_scan_is_dropped() {
        let controller = ScanController::new(ScanSettings::default()).unwrap();
        controller.start().await.unwrap();
        let stale_generation = controller.shared.generation();

        controller.stop_scanning().await.unwrap();
        controller.start().await.unwrap();
        assert_ne!(controller.shared.generation(), stale_generation);

        // A sink that passed its running check before the stop, sending late
        controller.shared.pending_frames.fetch_add(1, Ordering::AcqRel);
        let sent = controller.sender.send(WorkerMessage::Frame {
            frame: frame(0, "stale"),
            generation: stale_generation,
        });
        assert!(sent.is_ok());
        controller.flush().await.unwrap();
        assert!(controller.results().snapshot().is_empty());

        assert!(controller.frame_sink().submit(frame(10, "fresh")));
        controller.flush().await.unwrap();
        assert_eq!(controller.results().all_recognized().len(), 1);
        controller.shutdown().await.unwrap();
    }
}
