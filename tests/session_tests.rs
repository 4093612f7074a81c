// SPDX-License-Identifier: GPL-3.0-only

//! Integration tests for per-frame session processing

use scan_engine::session::{
    CachingPolicy, Detection, DuplicatePolicy, FrameOutcome, Quadrilateral, ScanSession,
    SessionConfig, Symbology,
};

fn session(caching: CachingPolicy, duplicates: DuplicatePolicy) -> ScanSession {
    ScanSession::new(SessionConfig {
        caching,
        duplicates,
        max_codes_per_frame: 6,
    })
}

fn ean(data: &str) -> Detection {
    Detection::recognized(
        Symbology::Ean13,
        data.as_bytes().to_vec(),
        false,
        Quadrilateral::default(),
        0,
    )
    .unwrap()
}

fn localized() -> Detection {
    Detection::localized(Quadrilateral::from_rect(10.0, 10.0, 40.0, 40.0), 0)
}

fn data(codes: &[Detection]) -> Vec<String> {
    codes.iter().map(|c| c.data_lossy().into_owned()).collect()
}

#[test]
fn test_clear_is_idempotent() {
    let mut session = session(CachingPolicy::Session, DuplicatePolicy::Session);
    session.process_frame(vec![ean("111"), localized()], 0);
    session.clear();
    let once = session.snapshot();
    session.clear();
    let twice = session.snapshot();

    assert_eq!(once, twice);
    assert!(once.is_empty());
}

#[test]
fn test_per_frame_views_are_frame_local() {
    let mut session = session(CachingPolicy::Session, DuplicatePolicy::Off);
    session.process_frame(vec![ean("111"), localized()], 0);
    assert_eq!(session.newly_recognized().len(), 1);
    assert_eq!(session.newly_localized().len(), 1);

    session.process_frame(vec![], 40);
    assert!(session.newly_recognized().is_empty());
    assert!(session.newly_localized().is_empty());
    assert_eq!(data(&session.all_recognized()), vec!["111"]);
}

#[test]
fn test_duplicate_window_expires() {
    let mut session = session(CachingPolicy::Session, DuplicatePolicy::Window(500));
    session.process_frame(vec![ean("X")], 0);
    assert_eq!(data(&session.newly_recognized()), vec!["X"]);

    session.process_frame(vec![ean("X")], 400);
    assert!(
        session.newly_recognized().is_empty(),
        "Duplicate inside the window should be suppressed"
    );
    assert_eq!(data(&session.all_recognized()), vec!["X"]);

    // The suppressed sighting at 400 slides the window to 900
    session.process_frame(vec![ean("X")], 1000);
    assert_eq!(data(&session.newly_recognized()), vec!["X"]);
}

#[test]
fn test_duplicate_reported_after_window_without_sightings() {
    let mut session = session(CachingPolicy::Session, DuplicatePolicy::Window(500));
    session.process_frame(vec![ean("X")], 0);
    session.process_frame(vec![ean("X")], 600);
    assert_eq!(data(&session.newly_recognized()), vec!["X"]);
}

#[test]
fn test_session_duplicate_filter_reports_once() {
    let mut session = session(CachingPolicy::Session, DuplicatePolicy::Session);
    session.process_frame(vec![ean("X")], 0);
    assert_eq!(session.newly_recognized().len(), 1);

    for t in [1_000, 60_000, 3_600_000] {
        session.process_frame(vec![ean("X")], t);
        assert!(session.newly_recognized().is_empty());
    }
    assert_eq!(session.all_recognized().len(), 1);
}

#[test]
fn test_duplicate_filter_off_reports_every_frame() {
    let mut session = session(CachingPolicy::Session, DuplicatePolicy::Off);
    for t in [0, 33, 66] {
        session.process_frame(vec![ean("X")], t);
        assert_eq!(data(&session.newly_recognized()), vec!["X"]);
    }
    assert_eq!(session.all_recognized().len(), 1);
}

#[test]
fn test_cache_window_expiry_boundary() {
    let mut session = session(CachingPolicy::Window(1000), DuplicatePolicy::Off);
    session.process_frame(vec![ean("A")], 0);

    session.process_frame(vec![], 999);
    assert_eq!(data(&session.all_recognized()), vec!["A"]);

    session.process_frame(vec![], 1001);
    assert!(session.all_recognized().is_empty());
}

#[test]
fn test_cache_policy_change_applies_to_cached_codes() {
    let mut session = session(CachingPolicy::Session, DuplicatePolicy::Off);
    session.process_frame(vec![ean("A")], 0);

    session.apply_config(SessionConfig {
        caching: CachingPolicy::Window(1000),
        ..session.config()
    });
    session.process_frame(vec![ean("B")], 900);
    assert_eq!(data(&session.all_recognized()), vec!["A", "B"]);

    session.process_frame(vec![], 5000);
    assert!(session.all_recognized().is_empty());
}

#[test]
fn test_discard_cache_keeps_only_current_frame() {
    let mut session = session(CachingPolicy::Discard, DuplicatePolicy::Off);
    session.process_frame(vec![ean("A")], 0);
    assert_eq!(data(&session.all_recognized()), vec!["A"]);

    session.process_frame(vec![ean("B")], 33);
    assert_eq!(data(&session.all_recognized()), vec!["B"]);

    session.process_frame(vec![], 66);
    assert!(session.all_recognized().is_empty());
}

#[test]
fn test_all_recognized_keeps_first_seen_order() {
    let mut session = session(CachingPolicy::Session, DuplicatePolicy::Off);
    session.process_frame(vec![ean("A"), ean("B")], 0);
    session.process_frame(vec![ean("C"), ean("A")], 33);
    assert_eq!(data(&session.all_recognized()), vec!["A", "B", "C"]);
}

#[test]
fn test_max_codes_per_frame_is_clamped() {
    let codes: Vec<Detection> = (0..10).map(|i| ean(&format!("code-{i}"))).collect();

    let mut high = ScanSession::new(SessionConfig {
        max_codes_per_frame: 10,
        ..SessionConfig::default()
    });
    high.process_frame(codes.clone(), 0);
    assert_eq!(high.newly_recognized().len(), 6);
    assert_eq!(
        data(&high.newly_recognized()),
        data(&codes[..6]),
        "The first detections in detector order should be kept"
    );

    let mut low = ScanSession::new(SessionConfig {
        max_codes_per_frame: 0,
        ..SessionConfig::default()
    });
    low.process_frame(codes, 0);
    assert_eq!(low.newly_recognized().len(), 1);
}

#[test]
fn test_out_of_order_frame_is_discarded() {
    let mut session = session(CachingPolicy::Session, DuplicatePolicy::Off);
    session.process_frame(vec![ean("A")], 100);
    let before = session.snapshot();

    let outcome = session.process_frame(vec![ean("B")], 50);
    assert_eq!(outcome, FrameOutcome::OutOfOrder);
    assert_eq!(session.snapshot(), before);
}

#[test]
fn test_paused_session_ignores_frames() {
    let mut session = session(CachingPolicy::Session, DuplicatePolicy::Off);
    session.process_frame(vec![ean("A")], 0);
    session.pause();

    let outcome = session.process_frame(vec![ean("B")], 33);
    assert_eq!(outcome, FrameOutcome::Inactive);
    assert_eq!(data(&session.all_recognized()), vec!["A"]);
}

#[test]
fn test_stop_clears_session() {
    let mut session = session(CachingPolicy::Session, DuplicatePolicy::Session);
    session.process_frame(vec![ean("A")], 0);
    session.stop();
    assert!(session.snapshot().is_empty());
    assert_eq!(session.process_frame(vec![ean("A")], 33), FrameOutcome::Inactive);
}
