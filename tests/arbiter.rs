//! Arbitration invariant tests
//!
//! Mutual exclusion, stale-release safety, and recognition gating,
//! exercised without audio hardware.

use std::sync::Arc;
use std::time::Duration;

use baton_assistant::speech::RecognitionLoop;
use baton_assistant::{AudioMode, AudioModeArbiter};

mod common;
use common::{FakeCapture, FakeRecognizer, fast_timing, wait_for};

#[tokio::test]
async fn test_concurrent_entries_admit_exactly_one_owner() {
    let arbiter = AudioModeArbiter::new();

    for round in 0..50 {
        let modes = [
            AudioMode::Listening,
            AudioMode::Speaking,
            AudioMode::PlayingMusic,
        ];

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let arbiter = Arc::clone(&arbiter);
                let mode = modes[i % modes.len()];
                tokio::spawn(async move { arbiter.try_enter(mode).ok() })
            })
            .collect();

        let mut guards = Vec::new();
        for handle in handles {
            if let Some(guard) = handle.await.expect("task panicked") {
                guards.push(guard);
            }
        }

        assert_eq!(guards.len(), 1, "round {round}: more than one owner admitted");
        assert_ne!(arbiter.current_mode(), AudioMode::Idle);

        guards.clear();
        assert_eq!(arbiter.current_mode(), AudioMode::Idle);
    }
}

#[tokio::test]
async fn test_stale_guard_never_clobbers_newer_mode() {
    let arbiter = AudioModeArbiter::new();

    // First speaker window, superseded by a reentrant one
    let stale = arbiter.try_enter(AudioMode::Speaking).expect("enter");
    let current = arbiter.try_enter(AudioMode::Speaking).expect("reenter");

    stale.release();
    assert_eq!(
        arbiter.current_mode(),
        AudioMode::Speaking,
        "stale release must be a no-op"
    );

    current.release();
    assert_eq!(arbiter.current_mode(), AudioMode::Idle);

    // And a fresh owner after the stale guard is also untouched by it
    let old = arbiter.try_enter(AudioMode::Speaking).expect("enter");
    arbiter.release_after(old, Duration::from_millis(20));
    tokio::time::sleep(Duration::from_millis(40)).await;

    let music = arbiter.try_enter(AudioMode::PlayingMusic).expect("enter");
    tokio::time::sleep(Duration::from_millis(40)).await;
    assert_eq!(arbiter.current_mode(), AudioMode::PlayingMusic);
    drop(music);
}

#[tokio::test]
async fn test_listen_refused_while_not_idle() {
    let arbiter = AudioModeArbiter::new();
    let capture = FakeCapture::new(Arc::clone(&arbiter), 400);
    let starts = Arc::clone(&capture.starts);

    let mut recognition = RecognitionLoop::new(
        Arc::clone(&arbiter),
        Box::new(capture),
        Arc::new(FakeRecognizer::new(vec!["hello"])),
        "en-US",
        &fast_timing(),
    );

    let _guard = arbiter.try_enter(AudioMode::Speaking).expect("enter");

    for _ in 0..10 {
        assert_eq!(recognition.listen().await, None);
    }
    assert!(starts.lock().unwrap().is_empty(), "capture issued while speaking");
}

#[tokio::test]
async fn test_capture_never_issued_during_non_idle_windows() {
    let arbiter = AudioModeArbiter::new();
    let capture = FakeCapture::new(Arc::clone(&arbiter), 400);
    let starts = Arc::clone(&capture.starts);

    let mut recognition = RecognitionLoop::new(
        Arc::clone(&arbiter),
        Box::new(capture),
        Arc::new(FakeRecognizer::new(vec![])),
        "en-US",
        &fast_timing(),
    );

    // Flip the mode on and off at high frequency while the loop listens
    let flipper_arbiter = Arc::clone(&arbiter);
    let flipper = tokio::spawn(async move {
        for _ in 0..30 {
            if let Ok(guard) = flipper_arbiter.try_enter(AudioMode::Speaking) {
                tokio::time::sleep(Duration::from_millis(3)).await;
                drop(guard);
            }
            tokio::time::sleep(Duration::from_millis(3)).await;
        }
    });

    for _ in 0..40 {
        let _ = recognition.listen().await;
    }
    flipper.await.expect("flipper panicked");

    let observed = starts.lock().unwrap().clone();
    assert!(
        observed.iter().all(|mode| *mode == AudioMode::Idle),
        "capture issued during non-idle window: {observed:?}"
    );
}

#[tokio::test]
async fn test_capture_aborts_when_mode_flips_mid_window() {
    let arbiter = AudioModeArbiter::new();
    // Tiny drains so a full window needs many chunks
    let capture = FakeCapture::new(Arc::clone(&arbiter), 10);
    let drains = Arc::clone(&capture.drains);

    let mut recognition = RecognitionLoop::new(
        Arc::clone(&arbiter),
        Box::new(capture),
        Arc::new(FakeRecognizer::new(vec!["should never be consulted"])),
        "en-US",
        &fast_timing(),
    );

    let flipper_arbiter = Arc::clone(&arbiter);
    let flipper = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(15)).await;
        flipper_arbiter
            .try_enter(AudioMode::PlayingMusic)
            .expect("enter music")
    });

    let result = recognition.listen().await;
    assert_eq!(result, None, "aborted window must not produce a transcript");

    let guard = flipper.await.expect("flipper panicked");
    // The window is 50ms of samples at 10 per 5ms chunk; an abort at
    // ~15ms must have stopped well short of a full capture
    assert!(drains.lock().unwrap().len() < 40);
    drop(guard);

    assert!(
        wait_for(|| arbiter.current_mode() == AudioMode::Idle, Duration::from_secs(1)).await
    );
}
