// SPDX-License-Identifier: GPL-3.0-only

//! Integration tests for engine constants

use scan_engine::constants::*;
use scan_engine::session::{CachingPolicy, DuplicatePolicy};

#[test]
fn test_default_policies_match_constants() {
    assert_eq!(
        i64::from(CachingPolicy::default()),
        DEFAULT_CODE_CACHING_DURATION_MS
    );
    assert_eq!(
        i64::from(DuplicatePolicy::default()),
        DEFAULT_CODE_DUPLICATE_FILTER_MS
    );
}

#[test]
fn test_max_codes_bounds() {
    assert!(MAX_CODES_PER_FRAME_LOWER <= MAX_CODES_PER_FRAME_UPPER);
    assert_eq!(
        clamp_max_codes_per_frame(DEFAULT_MAX_CODES_PER_FRAME),
        MAX_CODES_PER_FRAME_UPPER
    );
    assert_eq!(clamp_max_codes_per_frame(i64::MAX), MAX_CODES_PER_FRAME_UPPER);
    assert_eq!(clamp_max_codes_per_frame(i64::MIN), MAX_CODES_PER_FRAME_LOWER);
}

#[test]
fn test_version_is_set() {
    assert!(!app_info::version().is_empty());
}
