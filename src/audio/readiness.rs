//! File readiness detection
//!
//! The synthesis engine keeps writing its output file after the call
//! returns. Playing a half-written file clips the tail of the audio, so
//! readiness is inferred by watching the file size hold steady: five
//! consecutive identical size samples, confirmed across two consecutive
//! checks, then a short settle delay for the writer's file handle to be
//! released. The heuristic is isolated here so it can be swapped for an
//! explicit completion signal without touching callers.

use std::path::{Path, PathBuf};
use std::time::Duration;

/// Size samples that must agree before the file counts as stable
const REQUIRED_STABLE_SAMPLES: usize = 5;

/// Consecutive stable windows required before declaring readiness
const REQUIRED_STABLE_WINDOWS: u32 = 2;

/// Outcome of waiting for a pending file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Readiness {
    /// Size held steady across the required stability windows
    Ready,
    /// Deadline passed while the file existed but never stabilized.
    /// Stability is a heuristic; callers may still attempt playback.
    TimedOutButExists,
    /// The file never appeared before the deadline
    NeverAppeared,
}

/// A synthesis artifact expected to appear on disk
///
/// Created when synthesis is requested, consumed once handed to the
/// renderer or abandoned on timeout.
#[derive(Debug)]
pub struct PendingFile {
    path: PathBuf,
    required_stable_samples: usize,
    created_at: std::time::Instant,
}

impl PendingFile {
    /// Track a file the synthesis engine was asked to write
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            required_stable_samples: REQUIRED_STABLE_SAMPLES,
            created_at: std::time::Instant::now(),
        }
    }

    /// Path the writer is expected to produce
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Time since synthesis was requested
    #[must_use]
    pub fn age(&self) -> Duration {
        self.created_at.elapsed()
    }
}

/// Polls a pending file until its writer appears to have finished
#[derive(Debug, Clone)]
pub struct FileReadinessWaiter {
    /// Poll interval while waiting for the file to exist
    exist_poll: Duration,
    /// Interval between size samples once the file exists
    size_poll: Duration,
    /// Delay after stability before declaring readiness
    settle: Duration,
}

impl Default for FileReadinessWaiter {
    fn default() -> Self {
        Self {
            exist_poll: Duration::from_millis(50),
            size_poll: Duration::from_millis(100),
            settle: Duration::from_millis(200),
        }
    }
}

impl FileReadinessWaiter {
    /// Wait until `file` stops growing, bounded by `timeout`
    ///
    /// Degrades to [`Readiness::TimedOutButExists`] rather than failing
    /// when the file exists but never stabilizes: declaring ready too
    /// early only risks clipped audio, while blocking indefinitely would
    /// hold the audio mode forever.
    pub async fn wait_ready(&self, file: &PendingFile, timeout: Duration) -> Readiness {
        let deadline = tokio::time::Instant::now() + timeout;

        while !file.path().exists() {
            if tokio::time::Instant::now() >= deadline {
                tracing::warn!(path = %file.path().display(), "file never appeared");
                return Readiness::NeverAppeared;
            }
            tokio::time::sleep(self.exist_poll).await;
        }

        let mut samples: Vec<u64> = Vec::with_capacity(file.required_stable_samples);
        let mut stable_windows = 0u32;

        loop {
            if let Ok(meta) = std::fs::metadata(file.path()) {
                samples.push(meta.len());
                if samples.len() > file.required_stable_samples {
                    samples.remove(0);
                }

                if samples.len() == file.required_stable_samples
                    && samples.windows(2).all(|w| w[0] == w[1])
                {
                    stable_windows += 1;
                    if stable_windows >= REQUIRED_STABLE_WINDOWS {
                        tokio::time::sleep(self.settle).await;
                        tracing::trace!(
                            path = %file.path().display(),
                            size = samples[0],
                            waited = ?file.age(),
                            "file ready"
                        );
                        return Readiness::Ready;
                    }
                } else {
                    stable_windows = 0;
                }
            }

            if tokio::time::Instant::now() >= deadline {
                tracing::warn!(
                    path = %file.path().display(),
                    "file exists but never stabilized, proceeding anyway"
                );
                tokio::time::sleep(self.size_poll).await;
                return Readiness::TimedOutButExists;
            }
            tokio::time::sleep(self.size_poll).await;
        }
    }

    /// Waiter with custom cadences (tests use short ones)
    #[must_use]
    pub fn with_cadence(exist_poll: Duration, size_poll: Duration, settle: Duration) -> Self {
        Self {
            exist_poll,
            size_poll,
            settle,
        }
    }

    /// Worst-case latency from last write to `Ready` for a quiet file
    #[must_use]
    pub fn stability_latency(&self) -> Duration {
        self.size_poll * (REQUIRED_STABLE_SAMPLES as u32) + self.settle
    }
}
