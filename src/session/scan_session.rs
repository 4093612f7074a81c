// SPDX-License-Identifier: GPL-3.0-only

//! Scan session
//!
//! The session turns the per-frame detection stream into the three result
//! views an application consumes:
//!
//! - `newly_localized`: codes found but not decoded in the last frame
//! - `newly_recognized`: codes decoded in the last frame that passed the
//!   duplicate filter
//! - `all_recognized`: every live code since the last clear, as kept by the
//!   code cache
//!
//! A session is not thread-safe on its own. The controller owns it and
//! serializes every call through a single worker.

use super::code_cache::CodeCache;
use super::duplicate_filter::DuplicateFilter;
use super::policy::{CachingPolicy, DuplicatePolicy};
use super::types::Detection;
use crate::constants::{MAX_CODES_PER_FRAME_UPPER, clamp_max_codes_per_frame};
use serde::Serialize;
use tracing::{debug, info, trace};
use uuid::Uuid;

/// Session parameters applied between frames
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionConfig {
    pub caching: CachingPolicy,
    pub duplicates: DuplicatePolicy,
    /// Already clamped to 1-6
    pub max_codes_per_frame: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            caching: CachingPolicy::default(),
            duplicates: DuplicatePolicy::default(),
            max_codes_per_frame: MAX_CODES_PER_FRAME_UPPER,
        }
    }
}

/// Lifecycle of a session as seen from inside a scan callback
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    #[default]
    Active,
    /// Recognition paused, results kept
    Paused,
    /// Session cleared and done; a new session is created on the next start
    Stopped,
}

/// What happened to a frame handed to [`ScanSession::process_frame`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameOutcome {
    Processed {
        accepted: usize,
        suppressed: usize,
        evicted: usize,
    },
    /// Session paused or stopped, nothing changed
    Inactive,
    /// Timestamp earlier than the previous frame, discarded in full
    OutOfOrder,
}

/// Consistent copy of all result views after one completed frame
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SessionSnapshot {
    pub session_id: Uuid,
    /// Number of frames processed by the session when this snapshot was taken
    pub frame_seq: u64,
    pub newly_localized: Vec<Detection>,
    pub newly_recognized: Vec<Detection>,
    pub all_recognized: Vec<Detection>,
}

impl SessionSnapshot {
    pub fn is_empty(&self) -> bool {
        self.newly_localized.is_empty()
            && self.newly_recognized.is_empty()
            && self.all_recognized.is_empty()
    }
}

#[derive(Debug)]
pub struct ScanSession {
    id: Uuid,
    state: SessionState,
    filter: DuplicateFilter,
    cache: CodeCache,
    max_codes_per_frame: usize,
    newly_localized: Vec<Detection>,
    newly_recognized: Vec<Detection>,
    all_recognized: Vec<Detection>,
    last_frame_ms: Option<u64>,
    frame_seq: u64,
}

impl Default for ScanSession {
    fn default() -> Self {
        Self::new(SessionConfig::default())
    }
}

impl ScanSession {
    pub fn new(config: SessionConfig) -> Self {
        let id = Uuid::new_v4();
        debug!(session_id = %id, ?config, "Creating scan session");
        Self {
            id,
            state: SessionState::Active,
            filter: DuplicateFilter::new(config.duplicates),
            cache: CodeCache::new(config.caching),
            max_codes_per_frame: clamp_max_codes_per_frame(config.max_codes_per_frame as i64),
            newly_localized: Vec::new(),
            newly_recognized: Vec::new(),
            all_recognized: Vec::new(),
            last_frame_ms: None,
            frame_seq: 0,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn config(&self) -> SessionConfig {
        SessionConfig {
            caching: self.cache.policy(),
            duplicates: self.filter.policy(),
            max_codes_per_frame: self.max_codes_per_frame,
        }
    }

    /// Apply new parameters; takes effect with the next frame
    pub fn apply_config(&mut self, config: SessionConfig) {
        self.cache.set_policy(config.caching);
        self.filter.set_policy(config.duplicates);
        self.max_codes_per_frame = clamp_max_codes_per_frame(config.max_codes_per_frame as i64);
    }

    /// Process the detections of one frame
    ///
    /// The frame is applied as a whole: every view is replaced together, or
    /// nothing changes at all (inactive session, out-of-order timestamp).
    /// Detections beyond the per-frame limit are dropped, keeping the first
    /// ones in detector order.
    pub fn process_frame(&mut self, mut detections: Vec<Detection>, now_ms: u64) -> FrameOutcome {
        if self.state != SessionState::Active {
            trace!(session_id = %self.id, state = ?self.state, "Ignoring frame for inactive session");
            return FrameOutcome::Inactive;
        }
        if let Some(last) = self.last_frame_ms
            && now_ms < last
        {
            debug!(
                session_id = %self.id,
                timestamp_ms = now_ms,
                last_ms = last,
                "Discarding out-of-order frame"
            );
            return FrameOutcome::OutOfOrder;
        }

        if detections.len() > self.max_codes_per_frame {
            trace!(
                count = detections.len(),
                limit = self.max_codes_per_frame,
                "Truncating frame detections"
            );
            detections.truncate(self.max_codes_per_frame);
        }

        let (recognized, localized): (Vec<Detection>, Vec<Detection>) =
            detections.into_iter().partition(Detection::is_recognized);

        self.cache.begin_frame();

        let mut accepted = Vec::with_capacity(recognized.len());
        let mut suppressed = 0;
        for detection in recognized {
            if self.filter.should_suppress(&detection, now_ms) {
                self.filter.record(&detection, now_ms);
                suppressed += 1;
                continue;
            }
            self.cache.insert(detection.clone(), now_ms);
            self.filter.record(&detection, now_ms);
            accepted.push(detection);
        }

        let evicted = self.cache.evict_expired(now_ms);

        self.newly_localized = localized;
        self.newly_recognized = accepted;
        self.all_recognized = self.cache.snapshot();
        self.last_frame_ms = Some(now_ms);
        self.frame_seq += 1;

        trace!(
            session_id = %self.id,
            frame_seq = self.frame_seq,
            localized = self.newly_localized.len(),
            recognized = self.newly_recognized.len(),
            suppressed,
            evicted,
            total = self.all_recognized.len(),
            "Frame processed"
        );

        FrameOutcome::Processed {
            accepted: self.newly_recognized.len(),
            suppressed,
            evicted,
        }
    }

    /// Run an eviction pass without a frame
    ///
    /// Updates `all_recognized` only; the per-frame views are left alone.
    pub fn evict_expired(&mut self, now_ms: u64) -> usize {
        let evicted = self.cache.evict_expired(now_ms);
        if evicted > 0 {
            self.all_recognized = self.cache.snapshot();
        }
        evicted
    }

    /// Codes localized but not recognized in the last frame
    pub fn newly_localized(&self) -> Vec<Detection> {
        self.newly_localized.clone()
    }

    /// Codes recognized in the last frame that were not duplicates
    pub fn newly_recognized(&self) -> Vec<Detection> {
        self.newly_recognized.clone()
    }

    /// All live recognized codes since the last clear
    pub fn all_recognized(&self) -> Vec<Detection> {
        self.all_recognized.clone()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            session_id: self.id,
            frame_seq: self.frame_seq,
            newly_localized: self.newly_localized.clone(),
            newly_recognized: self.newly_recognized.clone(),
            all_recognized: self.all_recognized.clone(),
        }
    }

    /// Forget every code seen in this session
    ///
    /// Empties all three views, the cache and the duplicate filter history.
    pub fn clear(&mut self) {
        if self.is_cleared() {
            return;
        }
        debug!(session_id = %self.id, "Clearing scan session");
        self.newly_localized.clear();
        self.newly_recognized.clear();
        self.all_recognized.clear();
        self.cache.clear();
        self.filter.clear();
    }

    /// Pause recognition while keeping every result
    ///
    /// When called from a scan callback the controller follows and stops
    /// forwarding frames. No-op unless the session is active.
    pub fn pause(&mut self) {
        if self.state == SessionState::Active {
            info!(session_id = %self.id, "Scan session paused");
            self.state = SessionState::Paused;
        }
    }

    /// Stop the session, clearing it
    ///
    /// No-op if already stopped.
    pub fn stop(&mut self) {
        if self.state == SessionState::Stopped {
            return;
        }
        info!(session_id = %self.id, "Scan session stopped");
        self.clear();
        self.state = SessionState::Stopped;
    }

    /// Resume a paused session; no-op in any other state
    pub(crate) fn resume(&mut self) {
        if self.state == SessionState::Paused {
            info!(session_id = %self.id, "Scan session resumed");
            self.state = SessionState::Active;
        }
    }

    fn is_cleared(&self) -> bool {
        self.newly_localized.is_empty()
            && self.newly_recognized.is_empty()
            && self.all_recognized.is_empty()
            && self.cache.is_empty()
            && self.filter.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::types::{Quadrilateral, Symbology};

    fn code(data: &str) -> Detection {
        Detection::recognized(Symbology::Ean13, data.as_bytes().to_vec(), false, Quadrilateral::default(), 0)
            .unwrap()
    }

    fn blob() -> Detection {
        Detection::localized(Quadrilateral::from_rect(0.0, 0.0, 10.0, 10.0), 0)
    }

    fn session(caching: i64, duplicates: i64) -> ScanSession {
        ScanSession::new(SessionConfig {
            caching: CachingPolicy::try_from(caching).unwrap(),
            duplicates: DuplicatePolicy::try_from(duplicates).unwrap(),
            max_codes_per_frame: 6,
        })
    }

    #[test]
    fn test_partition_into_views() {
        let mut s = session(-1, 500);
        let outcome = s.process_frame(vec![blob(), code("1"), blob()], 0);
        assert_eq!(
            outcome,
            FrameOutcome::Processed {
                accepted: 1,
                suppressed: 0,
                evicted: 0
            }
        );
        assert_eq!(s.newly_localized().len(), 2);
        assert_eq!(s.newly_recognized().len(), 1);
        assert_eq!(s.all_recognized().len(), 1);
    }

    #[test]
    fn test_localized_is_frame_local() {
        let mut s = session(-1, 500);
        s.process_frame(vec![blob(), blob()], 0);
        s.process_frame(vec![code("1")], 10);
        assert!(s.newly_localized().is_empty());
    }

    #[test]
    fn test_same_code_twice_in_one_frame() {
        let mut s = session(-1, 500);
        s.process_frame(vec![code("1"), code("1")], 0);
        assert_eq!(s.newly_recognized().len(), 1);

        let mut unfiltered = session(-1, 0);
        unfiltered.process_frame(vec![code("1"), code("1")], 0);
        assert_eq!(unfiltered.newly_recognized().len(), 2);
        assert_eq!(unfiltered.all_recognized().len(), 1);
    }

    #[test]
    fn test_truncates_to_limit_in_arrival_order() {
        let mut s = ScanSession::new(SessionConfig {
            max_codes_per_frame: 2,
            ..SessionConfig::default()
        });
        s.process_frame(vec![code("1"), code("2"), code("3")], 0);
        let data: Vec<_> = s.newly_recognized().iter().map(|d| d.data().to_vec()).collect();
        assert_eq!(data, vec![b"1".to_vec(), b"2".to_vec()]);
    }

    #[test]
    fn test_out_of_order_frame_discarded() {
        let mut s = session(-1, 0);
        s.process_frame(vec![code("1")], 100);
        assert_eq!(s.process_frame(vec![code("2")], 50), FrameOutcome::OutOfOrder);
        assert_eq!(s.newly_recognized()[0].data(), b"1");
        assert_eq!(s.all_recognized().len(), 1);
    }

    #[test]
    fn test_discard_caching_keeps_only_current_frame() {
        let mut s = session(0, 0);
        s.process_frame(vec![code("1")], 0);
        assert_eq!(s.newly_recognized().len(), 1);
        assert_eq!(s.all_recognized().len(), 1);
        s.process_frame(vec![code("2")], 10);
        let all = s.all_recognized();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].data(), b"2");
        s.process_frame(vec![], 20);
        assert!(s.all_recognized().is_empty());
    }

    #[test]
    fn test_localized_then_recognized_are_separate_events() {
        let mut s = session(-1, 500);
        s.process_frame(vec![blob()], 0);
        assert_eq!(s.newly_localized().len(), 1);
        assert!(s.newly_recognized().is_empty());
        s.process_frame(vec![code("1")], 30);
        assert!(s.newly_localized().is_empty());
        assert_eq!(s.newly_recognized().len(), 1);
    }

    #[test]
    fn test_pause_and_stop() {
        let mut s = session(-1, 500);
        s.process_frame(vec![code("1")], 0);
        s.pause();
        assert_eq!(s.state(), SessionState::Paused);
        assert_eq!(s.process_frame(vec![code("2")], 10), FrameOutcome::Inactive);
        assert_eq!(s.all_recognized().len(), 1);
        s.resume();
        s.stop();
        assert_eq!(s.state(), SessionState::Stopped);
        assert!(s.snapshot().is_empty());
        s.stop();
        assert_eq!(s.state(), SessionState::Stopped);
    }

    #[test]
    fn test_returned_views_are_copies() {
        let mut s = session(-1, 500);
        s.process_frame(vec![code("1")], 0);
        let mut all = s.all_recognized();
        all.clear();
        assert_eq!(s.all_recognized().len(), 1);
    }

    #[test]
    fn test_clear_resets_duplicate_history() {
        let mut s = session(-1, -1);
        s.process_frame(vec![code("1")], 0);
        s.clear();
        s.process_frame(vec![code("1")], 10);
        assert_eq!(s.newly_recognized().len(), 1);
    }
}
