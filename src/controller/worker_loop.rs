// SPDX-License-Identifier: GPL-3.0-only

//! Thread lifecycle for the scan worker
//!
//! The scan worker drains the controller queue on its own thread so that
//! frame processing never runs on the async runtime or the detector thread.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use tracing::{debug, info, warn};

/// Returned by each iteration to keep the worker alive or let it exit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopAction {
    Continue,
    Stop,
}

/// Named thread calling one iteration function until told otherwise
///
/// The stop flag is only checked between iterations. An iteration that
/// blocks on a channel must be woken through that channel first.
pub struct WorkerLoop {
    name: String,
    handle: Option<JoinHandle<()>>,
    stop_requested: Arc<AtomicBool>,
}

impl WorkerLoop {
    pub fn start<F>(name: &str, mut iteration: F) -> std::io::Result<Self>
    where
        F: FnMut() -> LoopAction + Send + 'static,
    {
        let stop_requested = Arc::new(AtomicBool::new(false));
        let stop_flag = Arc::clone(&stop_requested);
        let thread_name = name.to_string();

        let handle = thread::Builder::new().name(name.to_string()).spawn(move || {
            debug!(name = %thread_name, "Scan worker running");
            let mut iterations: u64 = 0;
            while !stop_flag.load(Ordering::Acquire) {
                iterations += 1;
                if iteration() == LoopAction::Stop {
                    break;
                }
            }
            info!(name = %thread_name, iterations, "Scan worker exited");
        })?;

        Ok(Self {
            name: name.to_string(),
            handle: Some(handle),
            stop_requested,
        })
    }

    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Ask the thread to exit after its current iteration
    pub fn request_stop(&self) {
        self.stop_requested.store(true, Ordering::Release);
    }

    pub fn stop(&mut self) {
        self.request_stop();
        self.join();
    }

    /// Block until the thread has exited
    pub fn join(&mut self) {
        let Some(handle) = self.handle.take() else {
            return;
        };
        if handle.join().is_err() {
            warn!(name = %self.name, "Scan worker panicked");
        }
    }
}

impl Drop for WorkerLoop {
    fn drop(&mut self) {
        self.stop();
    }
}
