// Tests for the console erase renderer
//
// Tests cover the completion line and observer callbacks arriving in any
// order without panicking.

use super::progress::*;
use crate::algorithms::EraseJob;
use crate::observer::EraseObserver;
use std::path::PathBuf;
use std::time::Duration;

fn job(size: u64) -> EraseJob {
    EraseJob {
        id: uuid::Uuid::new_v4(),
        path: PathBuf::from("/tmp/qrcode.png"),
        size,
        total_passes: 7,
        started_at: chrono::Utc::now(),
    }
}

// ==================== COMPLETION LINE TESTS ====================

#[test]
fn test_completion_detail_small_file() {
    let detail = completion_detail(512, Duration::from_secs(3));
    assert!(detail.starts_with("512 B, "), "got {detail}");
    assert!(detail.contains("second"));
}

#[test]
fn test_completion_detail_binary_units() {
    assert!(completion_detail(10_000, Duration::from_secs(3)).starts_with("9.77 KiB, "));
    assert!(completion_detail(1024 * 1024, Duration::from_secs(3)).starts_with("1.00 MiB, "));
}

// ==================== OBSERVER TESTS ====================

#[test]
fn test_console_observer_full_lifecycle() {
    let observer = ConsoleObserver::new();

    observer.on_erase_started(&job(10_000));
    for pass in 1..=7 {
        observer.on_pass_complete(pass, 7);
    }
    observer.on_erase_finished(true, None);
}

#[test]
fn test_console_observer_failure_after_partial_progress() {
    let observer = ConsoleObserver::new();

    observer.on_erase_started(&job(4096));
    observer.on_pass_complete(1, 7);
    observer.on_erase_finished(false, Some("pass 2/7 failed".to_string()));
}

#[test]
fn test_console_observer_tolerates_events_without_start() {
    let observer = ConsoleObserver::new();

    // Validation failures finish without ever starting
    observer.on_pass_complete(3, 7);
    observer.on_erase_finished(false, Some("not a regular file".to_string()));
    observer.on_erase_finished(true, None);
}
