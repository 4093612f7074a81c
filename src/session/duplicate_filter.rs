// SPDX-License-Identifier: GPL-3.0-only

//! Duplicate suppression for recognized codes
//!
//! Keeps the time each code was last observed and decides whether a new
//! observation is a repeat. Entries are never expired individually, the map
//! is only emptied by [`DuplicateFilter::clear`].

use super::policy::DuplicatePolicy;
use super::types::{Detection, DuplicateKey};
use std::collections::HashMap;

#[derive(Debug, Default)]
pub struct DuplicateFilter {
    policy: DuplicatePolicy,
    last_seen: HashMap<DuplicateKey, u64>,
}

impl DuplicateFilter {
    pub fn new(policy: DuplicatePolicy) -> Self {
        Self {
            policy,
            last_seen: HashMap::new(),
        }
    }

    pub fn policy(&self) -> DuplicatePolicy {
        self.policy
    }

    /// Switch policy between frames; observation history is kept
    pub fn set_policy(&mut self, policy: DuplicatePolicy) {
        self.policy = policy;
    }

    /// Whether `detection` repeats a code seen too recently
    ///
    /// Localized-only detections are never suppressed.
    pub fn should_suppress(&self, detection: &Detection, now_ms: u64) -> bool {
        if !detection.is_recognized() {
            return false;
        }
        match self.policy {
            DuplicatePolicy::Off => false,
            DuplicatePolicy::Session => self.last_seen.contains_key(&detection.key()),
            DuplicatePolicy::Window(window_ms) => match self.last_seen.get(&detection.key()) {
                Some(&seen) => now_ms.saturating_sub(seen) < window_ms,
                None => false,
            },
        }
    }

    /// Remember that `detection` was observed at `now_ms`
    ///
    /// Called for suppressed observations as well, so a steady stream of
    /// repeats keeps extending the window instead of leaking through at
    /// every window boundary.
    pub fn record(&mut self, detection: &Detection, now_ms: u64) {
        if !detection.is_recognized() || self.policy == DuplicatePolicy::Off {
            return;
        }
        self.last_seen.insert(detection.key(), now_ms);
    }

    pub fn clear(&mut self) {
        self.last_seen.clear();
    }

    pub fn len(&self) -> usize {
        self.last_seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.last_seen.is_empty()
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

    #[test]
    fn test_off_never_suppresses() {
        let mut filter = DuplicateFilter::new(DuplicatePolicy::Off);
        let d = code("1");
        filter.record(&d, 0);
        assert!(!filter.should_suppress(&d, 0));
        assert!(filter.is_empty());
    }

    #[test]
    fn test_window() {
        let mut filter = DuplicateFilter::new(DuplicatePolicy::Window(500));
        let d = code("1");
        assert!(!filter.should_suppress(&d, 0));
        filter.record(&d, 0);
        assert!(filter.should_suppress(&d, 400));
        assert!(!filter.should_suppress(&d, 600));
    }

    #[test]
    fn test_window_slides_on_repeats() {
        let mut filter = DuplicateFilter::new(DuplicatePolicy::Window(500));
        let d = code("1");
        filter.record(&d, 0);
        for t in [300, 600, 900, 1200] {
            assert!(filter.should_suppress(&d, t), "t={t}");
            filter.record(&d, t);
        }
        assert!(!filter.should_suppress(&d, 1700));
    }

    #[test]
    fn test_session_policy() {
        let mut filter = DuplicateFilter::new(DuplicatePolicy::Session);
        let d = code("1");
        assert!(!filter.should_suppress(&d, 0));
        filter.record(&d, 0);
        assert!(filter.should_suppress(&d, 100_000));
        filter.clear();
        assert!(!filter.should_suppress(&d, 100_000));
    }

    #[test]
    fn test_symbology_is_part_of_key() {
        let mut filter = DuplicateFilter::new(DuplicatePolicy::Session);
        filter.record(&code("1"), 0);
        let other = Detection::recognized(Symbology::Code128, b"1".to_vec(), false, Quadrilateral::default(), 0)
            .unwrap();
        assert!(!filter.should_suppress(&other, 1));
    }
}
