//! Spoken-response pipeline
//!
//! Sequences synthesis, file readiness, and rendering under an audio-mode
//! window so the microphone never hears the assistant's own voice.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::arbiter::{AudioMode, AudioModeArbiter, Busy};
use crate::audio::{FileReadinessWaiter, PendingFile, Readiness, RenderOptions, Renderer};
use crate::config::TimingConfig;
use crate::speech::synthesizer::Synthesizer;
use crate::{Error, Result};

/// Speaks text through the synthesize, wait-ready, render pipeline
pub struct Speaker {
    arbiter: Arc<AudioModeArbiter>,
    synthesizer: Arc<dyn Synthesizer>,
    renderer: Arc<dyn Renderer>,
    waiter: FileReadinessWaiter,
    scratch_path: PathBuf,
    ready_timeout: Duration,
    resume_delay: Duration,
}

impl Speaker {
    /// Wire the pipeline together
    pub fn new(
        arbiter: Arc<AudioModeArbiter>,
        synthesizer: Arc<dyn Synthesizer>,
        renderer: Arc<dyn Renderer>,
        scratch_path: impl Into<PathBuf>,
        timing: &TimingConfig,
    ) -> Self {
        Self {
            arbiter,
            synthesizer,
            renderer,
            waiter: FileReadinessWaiter::default(),
            scratch_path: scratch_path.into(),
            ready_timeout: timing.ready_timeout,
            resume_delay: timing.speech_resume_delay,
        }
    }

    /// Use a non-default readiness waiter (tests inject short cadences)
    #[must_use]
    pub fn with_waiter(mut self, waiter: FileReadinessWaiter) -> Self {
        self.waiter = waiter;
        self
    }

    /// Speak `text`, taking and releasing the `Speaking` window
    ///
    /// A busy arbiter drops the utterance: recognized commands are
    /// short-lived, not a durable queue. On success the microphone
    /// resumes after a short delay; on failure it resumes immediately.
    ///
    /// # Errors
    ///
    /// Returns error if synthesis or playback fails
    pub async fn say(&self, text: &str) -> Result<()> {
        let guard = match self.arbiter.try_enter(AudioMode::Speaking) {
            Ok(guard) => guard,
            Err(Busy(mode)) => {
                tracing::debug!(%mode, dropped = %text, "speech dropped, audio busy");
                return Ok(());
            }
        };

        match self.render_speech(text, RenderOptions::default()).await {
            Ok(()) => {
                self.arbiter.release_after(guard, self.resume_delay);
                Ok(())
            }
            Err(e) => {
                drop(guard);
                Err(e)
            }
        }
    }

    /// Speak inside a mode window the caller already owns
    ///
    /// Used by the music session, whose `PlayingMusic` window covers the
    /// spoken intro as well as playback.
    ///
    /// # Errors
    ///
    /// Returns error if synthesis or playback fails
    pub async fn say_in_window(&self, text: &str, opts: RenderOptions) -> Result<()> {
        self.render_speech(text, opts).await
    }

    async fn render_speech(&self, text: &str, opts: RenderOptions) -> Result<()> {
        tracing::info!(%text, "speaking");

        let pending = PendingFile::new(&self.scratch_path);
        self.synthesizer.synthesize(text, pending.path()).await?;

        match self.waiter.wait_ready(&pending, self.ready_timeout).await {
            Readiness::Ready | Readiness::TimedOutButExists => {}
            Readiness::NeverAppeared => {
                return Err(Error::Synthesis(format!(
                    "engine produced no file at {}",
                    pending.path().display()
                )));
            }
        }

        self.renderer
            .render(pending.path(), opts)
            .await
            .map_err(|e| Error::Playback(e.to_string()))
    }
}
