//! Audio mode arbitration
//!
//! The microphone, speech playback, and music playback all contend for one
//! audio device. The arbiter owns the single `AudioMode` and hands out
//! scoped guards, so the assistant never captures its own synthesized
//! speech and a stuck subprocess can never permanently disable listening.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

/// Mutually exclusive state of the audio subsystem
///
/// Exactly one mode is active at any instant. Mutated only through
/// [`AudioModeArbiter`] transitions, never set directly by consumers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioMode {
    /// Nothing owns the audio device; the microphone may sample
    Idle,
    /// An exclusive capture window is in progress
    Listening,
    /// Synthesized speech is being generated or played
    Speaking,
    /// A music session owns the device (intro, playback, monitoring)
    PlayingMusic,
}

impl std::fmt::Display for AudioMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Listening => "listening",
            Self::Speaking => "speaking",
            Self::PlayingMusic => "playing-music",
        };
        f.write_str(name)
    }
}

/// Returned by [`AudioModeArbiter::try_enter`] when another activity owns
/// the audio subsystem
///
/// Contention is expected, not an error: callers either queue behind it
/// (the music sequence) or drop the action (a command recognized while
/// speaking is a short-lived utterance, not a durable request).
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("audio subsystem busy: {0}")]
pub struct Busy(pub AudioMode);

struct ArbiterState {
    mode: AudioMode,
    /// Bumped on every successful transition; a guard whose recorded
    /// generation no longer matches must not release
    generation: u64,
    /// Whether a deferred release back to listening is already in flight
    resume_scheduled: bool,
}

/// Process-wide owner of the audio mode
///
/// Created once at startup and shared behind an `Arc`.
pub struct AudioModeArbiter {
    state: Mutex<ArbiterState>,
}

impl std::fmt::Debug for AudioModeArbiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AudioModeArbiter")
            .field("mode", &self.current_mode())
            .finish_non_exhaustive()
    }
}

impl AudioModeArbiter {
    /// Create a new arbiter in `Idle`
    #[must_use]
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(ArbiterState {
                mode: AudioMode::Idle,
                generation: 0,
                resume_scheduled: false,
            }),
        })
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, ArbiterState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Attempt to take exclusive ownership of the audio subsystem
    ///
    /// Succeeds from `Idle`, or from `Speaking` when re-entering
    /// `Speaking`: the new guard supersedes the old one, whose eventual
    /// release becomes a stale no-op.
    ///
    /// # Errors
    ///
    /// Returns [`Busy`] with the current owner's mode otherwise.
    pub fn try_enter(self: &Arc<Self>, mode: AudioMode) -> Result<ModeGuard, Busy> {
        let mut state = self.lock();

        let reentrant = mode == AudioMode::Speaking && state.mode == AudioMode::Speaking;
        if state.mode != AudioMode::Idle && !reentrant {
            return Err(Busy(state.mode));
        }

        state.mode = mode;
        state.generation += 1;
        let generation = state.generation;
        drop(state);

        tracing::trace!(%mode, generation, "audio mode entered");
        Ok(ModeGuard {
            arbiter: Arc::clone(self),
            generation,
            released: false,
        })
    }

    /// Snapshot of the active mode
    ///
    /// The recognition loop reads this every tick to decide whether the
    /// microphone may sample.
    #[must_use]
    pub fn current_mode(&self) -> AudioMode {
        self.lock().mode
    }

    /// Whether a deferred release back to `Idle` is currently scheduled
    #[must_use]
    pub fn resume_scheduled(&self) -> bool {
        self.lock().resume_scheduled
    }

    /// Release `guard` after `delay` without blocking the caller
    ///
    /// Keeps the microphone muted briefly after audio output stops so the
    /// tail of the playback is never captured. The release is
    /// generation-checked like any other: if a newer transition happened
    /// in the meantime, the timer fires as a no-op.
    pub fn release_after(self: &Arc<Self>, guard: ModeGuard, delay: Duration) {
        self.lock().resume_scheduled = true;

        let arbiter = Arc::clone(self);
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            arbiter.lock().resume_scheduled = false;
            drop(guard);
        });
    }

    /// Release the mode held by a guard of `generation`, if still current
    fn release(&self, generation: u64) {
        let mut state = self.lock();
        if state.generation == generation {
            let was = state.mode;
            state.mode = AudioMode::Idle;
            drop(state);
            tracing::trace!(%was, generation, "audio mode released");
        } else {
            tracing::trace!(
                generation,
                current = state.generation,
                "stale release ignored"
            );
        }
    }
}

/// Scoped ownership of an audio mode
///
/// Releases on drop, on every exit path. A guard superseded by a newer
/// transition releases as a no-op, so a delayed release from an aborted
/// attempt can never clobber a newer, legitimate mode.
pub struct ModeGuard {
    arbiter: Arc<AudioModeArbiter>,
    generation: u64,
    released: bool,
}

impl std::fmt::Debug for ModeGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModeGuard")
            .field("generation", &self.generation)
            .field("released", &self.released)
            .finish_non_exhaustive()
    }
}

impl ModeGuard {
    /// Generation recorded when this guard was issued
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Release the mode now instead of at scope end
    pub fn release(mut self) {
        self.do_release();
    }

    fn do_release(&mut self) {
        if !self.released {
            self.released = true;
            self.arbiter.release(self.generation);
        }
    }
}

impl Drop for ModeGuard {
    fn drop(&mut self) {
        self.do_release();
    }
}
