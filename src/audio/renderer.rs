//! Audio playback through an external player process
//!
//! The player runs as a subprocess (`afplay` on macOS) so a wedged audio
//! stack can be killed on timeout instead of hanging the assistant.

use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use tokio::io::AsyncReadExt;
use tokio::process::Command;

use crate::config::PlayerConfig;

/// Errors surfaced by a render attempt
///
/// All are recoverable: the caller releases the audio mode and reports.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    /// The file could not be opened or read when playback was due
    #[error("audio file not accessible: {0}")]
    NotAccessible(String),

    /// The player exited non-zero or could not be spawned
    #[error("player process failed: {0}")]
    ProcessFailed(String),

    /// The player ran past the configured deadline and was killed
    #[error("playback timed out after {0:?}")]
    Timeout(Duration),
}

/// Playback parameters for one render
#[derive(Debug, Clone, Copy)]
pub struct RenderOptions {
    /// Playback rate, 1.0 is normal
    pub speed: f64,
    /// Player quality knob, 0 fastest to 1 highest
    pub quality: u8,
    /// Volume 0.0 to 1.0, `None` leaves the system level untouched
    pub volume: Option<f64>,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            speed: 1.0,
            quality: 1,
            volume: None,
        }
    }
}

/// Renders a ready audio file to the output device
#[async_trait::async_trait]
pub trait Renderer: Send + Sync {
    /// Play `path` to completion
    ///
    /// # Errors
    ///
    /// Returns [`RenderError`] on probe failure, player failure, or
    /// timeout; the caller must still release its mode guard.
    async fn render(&self, path: &Path, opts: RenderOptions) -> Result<(), RenderError>;
}

/// Plays audio files through the system player binary
#[derive(Debug, Clone, Default)]
pub struct AfplayRenderer {
    config: PlayerConfig,
}

impl AfplayRenderer {
    /// Create a renderer around the configured player
    #[must_use]
    pub fn new(config: PlayerConfig) -> Self {
        Self { config }
    }

    /// Open the file and read a few bytes
    ///
    /// Catches writer-lock races the size-stability heuristic cannot see.
    async fn probe_readable(path: &Path) -> Result<(), RenderError> {
        let mut file = tokio::fs::File::open(path)
            .await
            .map_err(|e| RenderError::NotAccessible(format!("{}: {e}", path.display())))?;

        let mut probe = [0u8; 100];
        file.read(&mut probe)
            .await
            .map_err(|e| RenderError::NotAccessible(format!("{}: {e}", path.display())))?;

        Ok(())
    }
}

#[async_trait::async_trait]
impl Renderer for AfplayRenderer {
    async fn render(&self, path: &Path, opts: RenderOptions) -> Result<(), RenderError> {
        Self::probe_readable(path).await?;
        tokio::time::sleep(self.config.probe_settle).await;

        let mut cmd = Command::new(&self.config.program);
        cmd.arg("-q").arg(opts.quality.to_string());
        if (opts.speed - 1.0).abs() > f64::EPSILON {
            cmd.arg("-r").arg(opts.speed.to_string());
        }
        if let Some(volume) = opts.volume {
            cmd.arg("-v").arg(volume.to_string());
        }
        cmd.arg(path);

        tracing::debug!(
            player = %self.config.program,
            path = %path.display(),
            speed = opts.speed,
            quality = opts.quality,
            "rendering audio"
        );

        run_bounded(cmd, self.config.timeout).await?;

        tokio::time::sleep(self.config.post_play_settle).await;
        Ok(())
    }
}

/// Run a player command to completion within `deadline`, killing it on
/// overrun
async fn run_bounded(mut cmd: Command, deadline: Duration) -> Result<(), RenderError> {
    cmd.stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let child = cmd
        .spawn()
        .map_err(|e| RenderError::ProcessFailed(e.to_string()))?;

    match tokio::time::timeout(deadline, child.wait_with_output()).await {
        Ok(Ok(output)) if output.status.success() => Ok(()),
        Ok(Ok(output)) => {
            let stderr = String::from_utf8_lossy(&output.stderr);
            Err(RenderError::ProcessFailed(format!(
                "{}: {}",
                output.status,
                stderr.trim()
            )))
        }
        Ok(Err(e)) => Err(RenderError::ProcessFailed(e.to_string())),
        Err(_) => {
            tracing::warn!(timeout = ?deadline, "player overran its deadline, killed");
            Err(RenderError::Timeout(deadline))
        }
    }
}
