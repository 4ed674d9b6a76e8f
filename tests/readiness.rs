//! File readiness heuristic tests
//!
//! Run under paused time so the poll cadences are exact.

use std::time::Duration;

use baton_assistant::{FileReadinessWaiter, PendingFile, Readiness};

#[tokio::test(start_paused = true)]
async fn test_single_write_becomes_ready_within_bound() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("utterance.wav");
    std::fs::write(&path, vec![0u8; 4096]).expect("write");

    let waiter = FileReadinessWaiter::default();
    let pending = PendingFile::new(&path);

    let started = tokio::time::Instant::now();
    let readiness = waiter.wait_ready(&pending, Duration::from_secs(15)).await;
    let elapsed = started.elapsed();

    assert_eq!(readiness, Readiness::Ready);
    assert!(
        elapsed <= waiter.stability_latency(),
        "ready took {elapsed:?}, bound is {:?}",
        waiter.stability_latency()
    );
}

#[tokio::test(start_paused = true)]
async fn test_missing_file_never_appeared_at_or_after_timeout() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("never-written.wav");

    let waiter = FileReadinessWaiter::default();
    let pending = PendingFile::new(&path);

    let started = tokio::time::Instant::now();
    let readiness = waiter.wait_ready(&pending, Duration::from_millis(300)).await;
    let elapsed = started.elapsed();

    assert_eq!(readiness, Readiness::NeverAppeared);
    assert!(
        elapsed >= Duration::from_millis(300),
        "returned early at {elapsed:?}"
    );
}

#[tokio::test(start_paused = true)]
async fn test_late_appearing_file_still_becomes_ready() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("late.wav");

    let writer_path = path.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(120)).await;
        std::fs::write(&writer_path, vec![0u8; 2048]).expect("write");
    });

    let waiter = FileReadinessWaiter::default();
    let pending = PendingFile::new(&path);

    let readiness = waiter.wait_ready(&pending, Duration::from_secs(15)).await;
    assert_eq!(readiness, Readiness::Ready);
}

#[tokio::test(start_paused = true)]
async fn test_growing_file_degrades_to_timed_out_but_exists() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("growing.wav");
    std::fs::write(&path, b"x").expect("write");

    // A writer that never stops appending
    let writer_path = path.clone();
    tokio::spawn(async move {
        loop {
            tokio::time::sleep(Duration::from_millis(80)).await;
            let mut data = std::fs::read(&writer_path).unwrap_or_default();
            data.extend_from_slice(b"more");
            let _ = std::fs::write(&writer_path, data);
        }
    });

    let waiter = FileReadinessWaiter::default();
    let pending = PendingFile::new(&path);

    let readiness = waiter.wait_ready(&pending, Duration::from_millis(700)).await;
    assert_eq!(readiness, Readiness::TimedOutButExists);
}

#[tokio::test(start_paused = true)]
async fn test_interrupted_growth_waits_for_fresh_stability() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("two-phase.wav");
    std::fs::write(&path, vec![0u8; 100]).expect("write");

    // One more write lands mid-observation, then the writer is done
    let writer_path = path.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(250)).await;
        std::fs::write(&writer_path, vec![0u8; 9000]).expect("write");
    });

    let waiter = FileReadinessWaiter::default();
    let pending = PendingFile::new(&path);

    let started = tokio::time::Instant::now();
    let readiness = waiter.wait_ready(&pending, Duration::from_secs(15)).await;

    assert_eq!(readiness, Readiness::Ready);
    // Stability must have been re-established after the second write
    assert!(started.elapsed() >= Duration::from_millis(250));
}
