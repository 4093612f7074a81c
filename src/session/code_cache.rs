// SPDX-License-Identifier: GPL-3.0-only

//! Cache of recognized codes across frames
//!
//! Holds the most recent observation of every code that passed the
//! duplicate filter, for as long as the caching policy allows. The cache
//! is independent from duplicate filtering: a code can drop out of the
//! cache while the filter still remembers it, and vice versa.

use super::policy::CachingPolicy;
use super::types::{Detection, DuplicateKey};
use std::collections::HashMap;

/// A cached detection with its expiry bookkeeping
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub detection: Detection,
    pub inserted_at_ms: u64,
    /// `None` means the entry lives until the session is cleared
    pub expires_at_ms: Option<u64>,
    /// Insertion order of the key, stable across refreshes
    order: u64,
}

#[derive(Debug, Default)]
pub struct CodeCache {
    policy: CachingPolicy,
    entries: HashMap<DuplicateKey, CacheEntry>,
    next_order: u64,
}

impl CodeCache {
    pub fn new(policy: CachingPolicy) -> Self {
        Self {
            policy,
            entries: HashMap::new(),
            next_order: 0,
        }
    }

    pub fn policy(&self) -> CachingPolicy {
        self.policy
    }

    /// Switch policy between frames
    ///
    /// Expiry of every cached entry is recomputed from its last insertion
    /// time under the new policy; the next eviction pass applies it.
    pub fn set_policy(&mut self, policy: CachingPolicy) {
        if policy == self.policy {
            return;
        }
        self.policy = policy;
        for entry in self.entries.values_mut() {
            entry.expires_at_ms = expiry(policy, entry.inserted_at_ms);
        }
    }

    /// Start a new frame
    ///
    /// With [`CachingPolicy::Discard`] the previous frame's codes are dropped
    /// here, before the new frame's results are computed.
    pub fn begin_frame(&mut self) {
        if self.policy == CachingPolicy::Discard && !self.entries.is_empty() {
            self.entries.clear();
        }
    }

    /// Insert or refresh a code
    ///
    /// A code that is already cached is replaced by the newer observation
    /// (data and location can change between reads of a static code) and
    /// its expiry restarts from `now_ms`. Its position in the snapshot is
    /// kept.
    pub fn insert(&mut self, detection: Detection, now_ms: u64) {
        let expires_at_ms = expiry(self.policy, now_ms);
        let key = detection.key();
        let order = match self.entries.get(&key) {
            Some(existing) => existing.order,
            None => {
                let order = self.next_order;
                self.next_order += 1;
                order
            }
        };
        self.entries.insert(
            key,
            CacheEntry {
                detection,
                inserted_at_ms: now_ms,
                expires_at_ms,
                order,
            },
        );
    }

    /// Drop every entry whose expiry lies strictly before `now_ms`
    ///
    /// Returns the number of evicted entries.
    pub fn evict_expired(&mut self, now_ms: u64) -> usize {
        let before = self.entries.len();
        self.entries
            .retain(|_, entry| entry.expires_at_ms.is_none_or(|expires| now_ms <= expires));
        before - self.entries.len()
    }

    /// Cached detections in first-insertion order
    pub fn snapshot(&self) -> Vec<Detection> {
        let mut entries: Vec<&CacheEntry> = self.entries.values().collect();
        entries.sort_by_key(|entry| entry.order);
        entries.into_iter().map(|entry| entry.detection.clone()).collect()
    }

    pub fn get(&self, key: &DuplicateKey) -> Option<&CacheEntry> {
        self.entries.get(key)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.next_order = 0;
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn expiry(policy: CachingPolicy, inserted_at_ms: u64) -> Option<u64> {
    match policy {
        CachingPolicy::Discard => Some(inserted_at_ms),
        CachingPolicy::Window(ms) => Some(inserted_at_ms.saturating_add(ms)),
        CachingPolicy::Session => None,
    }
}
