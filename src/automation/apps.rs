//! macOS application control

use tokio::process::Command;

use super::osascript::{escape, run_osascript};
use crate::{Error, Result};

/// Opens, closes, and inspects macOS applications
#[async_trait::async_trait]
pub trait AppControl: Send + Sync {
    /// Open an application by name
    ///
    /// # Errors
    ///
    /// Returns error if the app cannot be found or launched
    async fn open_app(&self, name: &str) -> Result<()>;

    /// Quit an application by name
    ///
    /// # Errors
    ///
    /// Returns error if the app is not running or refuses to quit
    async fn close_app(&self, name: &str) -> Result<()>;

    /// Whether a process with this name is currently running
    async fn is_app_running(&self, name: &str) -> bool;
}

/// App control through `open -a` and AppleScript
#[derive(Debug, Clone, Copy, Default)]
pub struct MacAppControl;

#[async_trait::async_trait]
impl AppControl for MacAppControl {
    async fn open_app(&self, name: &str) -> Result<()> {
        let status = Command::new("open")
            .arg("-a")
            .arg(name)
            .status()
            .await
            .map_err(|e| Error::Automation(format!("open unavailable: {e}")))?;

        if !status.success() {
            return Err(Error::NotFound(format!("application {name}")));
        }

        tracing::info!(app = name, "application opened");
        Ok(())
    }

    async fn close_app(&self, name: &str) -> Result<()> {
        let script = format!(r#"tell application "{}" to quit"#, escape(name));
        run_osascript(&script).await?;

        tracing::info!(app = name, "application closed");
        Ok(())
    }

    async fn is_app_running(&self, name: &str) -> bool {
        let script = format!(
            r#"tell application "System Events" to (name of every process) contains "{}""#,
            escape(name)
        );

        match run_osascript(&script).await {
            Ok(out) => out == "true",
            Err(e) => {
                tracing::debug!(app = name, error = %e, "running check failed");
                false
            }
        }
    }
}
