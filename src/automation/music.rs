//! Music app control
//!
//! Starts library playback and answers the polling monitor's
//! "is anything still playing" question.

use super::osascript::{escape, run_osascript};
use crate::Result;

/// Starts and observes music playback
#[async_trait::async_trait]
pub trait MusicControl: Send + Sync {
    /// Start playing the first library track matching `query`
    ///
    /// Returns `false` when no track matches.
    ///
    /// # Errors
    ///
    /// Returns error if the player cannot be scripted at all
    async fn play(&self, query: &str) -> Result<bool>;

    /// Whether the player is currently playing
    ///
    /// Scripting failures count as "not playing" so the monitor loop can
    /// always terminate.
    async fn is_playing(&self) -> bool;
}

/// Music control through the macOS Music app
#[derive(Debug, Clone, Copy, Default)]
pub struct MacMusicControl;

#[async_trait::async_trait]
impl MusicControl for MacMusicControl {
    async fn play(&self, query: &str) -> Result<bool> {
        let script = format!(
            r#"
tell application "Music"
    activate
    delay 0.5
    try
        set foundTracks to (every track of playlist "Library" whose name contains "{}")
        if (count of foundTracks) > 0 then
            play item 1 of foundTracks
            return "success"
        else
            return "not found"
        end if
    on error
        return "error"
    end try
end tell
"#,
            escape(query)
        );

        let outcome = run_osascript(&script).await?;
        match outcome.as_str() {
            "success" => {
                tracing::info!(query, "music playback started");
                Ok(true)
            }
            "not found" => {
                tracing::info!(query, "no matching track");
                Ok(false)
            }
            other => {
                tracing::warn!(query, outcome = other, "player scripting error");
                Ok(false)
            }
        }
    }

    async fn is_playing(&self) -> bool {
        let script = r#"
tell application "Music"
    if player state is playing then
        return "playing"
    else
        return "stopped"
    end if
end tell
"#;

        match run_osascript(script).await {
            Ok(state) => state == "playing",
            Err(e) => {
                tracing::debug!(error = %e, "player state check failed");
                false
            }
        }
    }
}
