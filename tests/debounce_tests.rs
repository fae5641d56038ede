//! Debounce timeline tests for the appearance event feed


use std::time::{Duration, Instant};
use surgi_track::config::EventConfig;
use surgi_track::events::EventDebouncer;
use surgi_track::snapshot::ToolStatus;
use surgi_track::tracker::Track;
use test_helpers::candidate;

fn debouncer(reprint_secs: f64) -> EventDebouncer {
    EventDebouncer::new(&EventConfig { reprint_secs })
}

fn scalpel_track() -> Track {
    Track::new(&candidate(20, "scalpel", 100.0, 100.0), 1, 10)
}

#[test]
fn test_first_appearance_emits_exactly_one_event() {
    let mut debouncer = debouncer(10.0);
    let track = scalpel_track();
    let t0 = Instant::now();

    let events = debouncer.update(&[&track], t0);
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].id, 20);
    assert_eq!(events[0].label, "scalpel");
    assert_eq!(events[0].status, ToolStatus::Detected);
    assert!((events[0].confidence - 1.0).abs() < 1e-9);

    // Continued presence stays silent
    for s in 1..=4 {
        let events = debouncer.update(&[&track], t0 + Duration::from_secs(s));
        assert!(events.is_empty(), "re-emitted at t+{s}s");
    }
}

#[test]
fn test_nine_second_absence_does_not_reemit() {
    // Present t=0..4, absent t=5..13 (9 s), back at t=14
    let mut debouncer = debouncer(10.0);
    let track = scalpel_track();
    let t0 = Instant::now();

    let mut total = 0;
    for s in 0..=4 {
        total += debouncer.update(&[&track], t0 + Duration::from_secs(s)).len();
    }
    for s in 5..=13 {
        total += debouncer.update(&[], t0 + Duration::from_secs(s)).len();
    }
    total += debouncer.update(&[&track], t0 + Duration::from_secs(14)).len();

    assert_eq!(total, 1, "exactly one event for the whole timeline");
}

#[test]
fn test_eleven_second_absence_reemits() {
    // Present t=0..4, absent t=5..15 (11 s observed), back at t=16
    let mut debouncer = debouncer(10.0);
    let track = scalpel_track();
    let t0 = Instant::now();

    let mut total = 0;
    for s in 0..=4 {
        total += debouncer.update(&[&track], t0 + Duration::from_secs(s)).len();
    }
    for s in 5..=15 {
        total += debouncer.update(&[], t0 + Duration::from_secs(s)).len();
    }
    assert_eq!(total, 1);
    assert_eq!(debouncer.suppressed_count(), 0, "absence past the window forgets the id");

    let events = debouncer.update(&[&track], t0 + Duration::from_secs(16));
    assert_eq!(events.len(), 1, "fresh appearance re-triggers an event");
}

#[test]
fn test_ids_are_debounced_independently() {
    let mut debouncer = debouncer(10.0);
    let scalpel = scalpel_track();
    let tweezers = Track::new(&candidate(24, "tweezers", 50.0, 50.0), 1, 10);
    let t0 = Instant::now();

    let events = debouncer.update(&[&scalpel], t0);
    assert_eq!(events.len(), 1);

    // A second id arriving later gets its own announcement
    let events = debouncer.update(&[&scalpel, &tweezers], t0 + Duration::from_secs(2));
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].id, 24);
}

#[test]
fn test_zero_window_reemits_on_next_absence() {
    let mut debouncer = debouncer(0.0);
    let track = scalpel_track();
    let t0 = Instant::now();

    assert_eq!(debouncer.update(&[&track], t0).len(), 1);
    // Any measurable absence exceeds a zero-length window
    assert!(debouncer.update(&[], t0 + Duration::from_millis(100)).is_empty());
    assert_eq!(debouncer.update(&[&track], t0 + Duration::from_millis(200)).len(), 1);
}
