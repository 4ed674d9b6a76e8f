//! AppleScript execution

use std::time::Duration;

use tokio::process::Command;

use crate::{Error, Result};

/// Upper bound on one script run; UI-scripted flows embed multi-second
/// delays, so this is generous
const SCRIPT_TIMEOUT: Duration = Duration::from_secs(60);

/// Run an AppleScript source through `osascript` and return trimmed stdout
///
/// # Errors
///
/// Returns error if `osascript` cannot be spawned, overruns its deadline,
/// or the script fails
pub async fn run_osascript(script: &str) -> Result<String> {
    let mut cmd = Command::new("osascript");
    cmd.arg("-e").arg(script).kill_on_drop(true);

    let output = tokio::time::timeout(SCRIPT_TIMEOUT, cmd.output())
        .await
        .map_err(|_| Error::Automation(format!("osascript timed out after {SCRIPT_TIMEOUT:?}")))?
        .map_err(|e| Error::Automation(format!("osascript unavailable: {e}")))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(Error::Automation(format!(
            "osascript {}: {}",
            output.status,
            stderr.trim()
        )));
    }

    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}

/// Escape a value for embedding inside a double-quoted AppleScript string
#[must_use]
pub(crate) fn escape(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_quotes_and_backslashes() {
        assert_eq!(escape(r#"say "hi""#), r#"say \"hi\""#);
        assert_eq!(escape(r"a\b"), r"a\\b");
        assert_eq!(escape("plain"), "plain");
    }
}
