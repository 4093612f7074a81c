// SPDX-License-Identifier: GPL-3.0-only

//! Scan worker
//!
//! Single owner of the scan session. Commands and frames arrive on one
//! queue and are handled strictly in order, which serializes lifecycle
//! transitions against frame processing without any lock around the
//! session.

use super::camera::{CameraControl, CameraRequest};
use super::worker_loop::LoopAction;
use super::{ScanListener, ScanState, SharedState};
use crate::config::ScanSettings;
use crate::errors::{AppError, AppResult, LifecycleError};
use crate::session::{Frame, FrameOutcome, ScanSession, SessionSnapshot, SessionState};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, watch};
use tracing::{debug, info, trace, warn};

/// Lifecycle and configuration commands
#[derive(Debug)]
pub(crate) enum Command {
    Start { paused: bool },
    Pause,
    Resume,
    Stop,
    Clear,
    ApplySettings(Box<ScanSettings>),
    /// Completes once everything queued before it was handled
    Sync,
}

pub(crate) enum WorkerMessage {
    Command {
        command: Command,
        reply: oneshot::Sender<AppResult<()>>,
    },
    /// Frame tagged with the scan generation it was accepted in
    Frame { frame: Frame, generation: u64 },
    Shutdown {
        reply: Option<oneshot::Sender<AppResult<()>>>,
    },
}

pub(crate) struct Worker {
    receiver: mpsc::UnboundedReceiver<WorkerMessage>,
    shared: Arc<SharedState>,
    settings: ScanSettings,
    session: Option<ScanSession>,
    camera: Box<dyn CameraControl>,
    listener: Option<Box<dyn ScanListener>>,
    results: watch::Sender<Arc<SessionSnapshot>>,
    settings_out: watch::Sender<Arc<ScanSettings>>,
}

impl Worker {
    pub(crate) fn new(
        receiver: mpsc::UnboundedReceiver<WorkerMessage>,
        shared: Arc<SharedState>,
        settings: ScanSettings,
        camera: Box<dyn CameraControl>,
        listener: Option<Box<dyn ScanListener>>,
        results: watch::Sender<Arc<SessionSnapshot>>,
        settings_out: watch::Sender<Arc<ScanSettings>>,
    ) -> Self {
        Self {
            receiver,
            shared,
            settings,
            session: None,
            camera,
            listener,
            results,
            settings_out,
        }
    }

    /// One loop iteration: wait for the next message and handle it
    pub(crate) fn run_once(&mut self) -> LoopAction {
        let Some(message) = self.receiver.blocking_recv() else {
            debug!("Scan controller dropped, worker exiting");
            self.shutdown();
            return LoopAction::Stop;
        };
        match message {
            WorkerMessage::Frame { frame, generation } => {
                self.shared.frame_dequeued();
                self.process_frame(frame, generation);
                LoopAction::Continue
            }
            WorkerMessage::Command { command, reply } => {
                let result = self.handle_command(command);
                // Caller may have given up waiting; the effect still applies
                let _ = reply.send(result);
                LoopAction::Continue
            }
            WorkerMessage::Shutdown { reply } => {
                self.shutdown();
                if let Some(reply) = reply {
                    let _ = reply.send(Ok(()));
                }
                LoopAction::Stop
            }
        }
    }

    fn state(&self) -> ScanState {
        self.shared.state()
    }

    fn set_state(&mut self, state: ScanState) {
        let previous = self.shared.state();
        if previous != state {
            info!(from = ?previous, to = ?state, "Scan state changed");
            self.shared.set_state(state);
        }
    }

    fn handle_command(&mut self, command: Command) -> AppResult<()> {
        debug!(?command, state = ?self.state(), "Handling scan command");
        match command {
            Command::Start { paused } => self.start(paused),
            Command::Pause => {
                self.pause();
                Ok(())
            }
            Command::Resume => self.resume(),
            Command::Stop => {
                self.stop();
                Ok(())
            }
            Command::Clear => {
                if let Some(session) = self.session.as_mut() {
                    session.clear();
                    self.publish();
                }
                Ok(())
            }
            Command::ApplySettings(settings) => self.apply_settings(*settings),
            Command::Sync => Ok(()),
        }
    }

    fn start(&mut self, paused: bool) -> AppResult<()> {
        if self.state() != ScanState::Stopped {
            debug!(state = ?self.state(), "Start ignored, scanning already started");
            return Ok(());
        }

        self.camera.open(&CameraRequest::from(&self.settings))?;

        let mut session = ScanSession::new(self.settings.session_config());
        self.shared.next_generation();
        if paused {
            session.pause();
        }
        info!(session_id = %session.id(), paused, "Scanning started");
        self.session = Some(session);
        self.set_state(if paused {
            ScanState::Paused
        } else {
            ScanState::Running
        });
        self.publish();
        Ok(())
    }

    fn pause(&mut self) {
        if self.state() != ScanState::Running {
            debug!(state = ?self.state(), "Pause ignored");
            return;
        }
        if let Some(session) = self.session.as_mut() {
            session.pause();
        }
        self.set_state(ScanState::Paused);
    }

    /// Resume a paused scan
    ///
    /// Resuming while stopped is rejected with
    /// [`LifecycleError::ResumeWhileStopped`] and leaves the controller
    /// stopped; it never starts a session implicitly.
    fn resume(&mut self) -> AppResult<()> {
        match self.state() {
            ScanState::Stopped => {
                warn!("Resume requested while stopped");
                Err(AppError::Lifecycle(LifecycleError::ResumeWhileStopped))
            }
            ScanState::Running => Ok(()),
            ScanState::Paused => {
                if let Some(session) = self.session.as_mut() {
                    session.resume();
                }
                self.set_state(ScanState::Running);
                Ok(())
            }
        }
    }

    fn stop(&mut self) {
        if self.state() == ScanState::Stopped {
            debug!("Stop ignored, already stopped");
            return;
        }
        self.set_state(ScanState::Stopped);
        self.shared.next_generation();
        if let Some(mut session) = self.session.take() {
            session.stop();
            self.results.send_replace(Arc::new(session.snapshot()));
            info!(session_id = %session.id(), "Scanning stopped");
        }
        self.camera.close();
    }

    fn apply_settings(&mut self, settings: ScanSettings) -> AppResult<()> {
        if let Err(e) = settings.validate() {
            warn!(error = %e, "Rejecting scan settings, keeping previous");
            return Err(e.into());
        }
        if let Some(session) = self.session.as_mut() {
            session.apply_config(settings.session_config());
        }
        if self.camera.is_open()
            && let Err(e) = self.camera.reconfigure(&CameraRequest::from(&settings))
        {
            warn!(error = %e, "Camera rejected new parameters");
        }
        info!(
            caching = ?settings.code_caching_duration_ms,
            duplicates = ?settings.code_duplicate_filter_ms,
            max_codes = settings.max_codes_per_frame(),
            "Scan settings applied"
        );
        self.settings = settings;
        self.settings_out
            .send_replace(Arc::new(self.settings.clone()));
        Ok(())
    }

    fn process_frame(&mut self, frame: Frame, generation: u64) {
        if self.state() != ScanState::Running {
            trace!(state = ?self.state(), timestamp_ms = frame.timestamp_ms, "Discarding frame");
            return;
        }
        if generation != self.shared.generation() {
            debug!(
                generation,
                current = self.shared.generation(),
                timestamp_ms = frame.timestamp_ms,
                "Discarding frame from a stopped scan"
            );
            return;
        }
        let Some(session) = self.session.as_mut() else {
            return;
        };

        let symbologies = &self.settings.symbologies;
        let detections = frame
            .detections
            .into_iter()
            .filter(|d| !d.is_recognized() || symbologies.is_enabled(d.symbology()))
            .collect();

        let outcome = session.process_frame(detections, frame.timestamp_ms);
        let FrameOutcome::Processed { accepted, .. } = outcome else {
            return;
        };

        if accepted > 0
            && let Some(listener) = self.listener.as_mut()
        {
            listener.did_scan(session);
        }

        match session.state() {
            SessionState::Active => self.publish(),
            SessionState::Paused => {
                info!("Scan listener paused the session");
                self.publish();
                self.set_state(ScanState::Paused);
            }
            SessionState::Stopped => {
                info!("Scan listener stopped the session");
                self.stop();
            }
        }
    }

    fn publish(&mut self) {
        if let Some(session) = self.session.as_ref() {
            self.results.send_replace(Arc::new(session.snapshot()));
        }
    }

    fn shutdown(&mut self) {
        self.stop();
        // Unblock anyone still waiting on queued commands
        self.receiver.close();
        while let Ok(message) = self.receiver.try_recv() {
            match message {
                WorkerMessage::Command { reply, .. } => {
                    let _ = reply.send(Err(LifecycleError::WorkerGone.into()));
                }
                WorkerMessage::Shutdown { reply: Some(reply) } => {
                    let _ = reply.send(Ok(()));
                }
                WorkerMessage::Frame { .. } => self.shared.frame_dequeued(),
                WorkerMessage::Shutdown { reply: None } => {}
            }
        }
    }
}
