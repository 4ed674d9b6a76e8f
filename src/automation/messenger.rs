//! Messaging through WhatsApp UI scripting
//!
//! There is no messaging API available, so the contact search and send are
//! driven through System Events keystrokes. The number of arrow presses to
//! select the contact depends on whether the app was already running.

use std::time::Duration;

use super::apps::{AppControl, MacAppControl};
use super::osascript::{escape, run_osascript};
use crate::Result;

/// App launch settle time before keystrokes are sent
const LAUNCH_SETTLE: Duration = Duration::from_secs(3);

/// Sends a message to a named contact
#[async_trait::async_trait]
pub trait MessageSender: Send + Sync {
    /// Deliver `message` to `contact`
    ///
    /// # Errors
    ///
    /// Returns error if the messaging app cannot be driven
    async fn send_message(&self, contact: &str, message: &str) -> Result<()>;
}

/// WhatsApp desktop UI automation
#[derive(Debug, Clone, Copy, Default)]
pub struct WhatsAppMessenger {
    apps: MacAppControl,
}

#[async_trait::async_trait]
impl MessageSender for WhatsAppMessenger {
    async fn send_message(&self, contact: &str, message: &str) -> Result<()> {
        let was_running = self.apps.is_app_running("WhatsApp").await;
        if !was_running {
            self.apps.open_app("WhatsApp").await?;
        }
        tokio::time::sleep(LAUNCH_SETTLE).await;

        // A cold start shows one extra search result row
        let down_arrows = if was_running { 1 } else { 2 };

        let mut script = format!(
            r#"
tell application "WhatsApp"
    activate
end tell
delay 2
tell application "System Events"
    keystroke "w" using {{shift down, command down}}
    delay 1
    keystroke "f" using {{command down}}
    delay 1
    keystroke "{}"
    delay 2
"#,
            escape(contact)
        );

        for _ in 0..down_arrows {
            script.push_str("    key code 125\n    delay 0.5\n");
        }

        script.push_str(&format!(
            r#"    keystroke return
    delay 2
    keystroke "{}"
    delay 1
    keystroke return
    delay 1
end tell
"#,
            escape(message)
        ));

        run_osascript(&script).await?;

        tracing::info!(contact, "message sent");
        Ok(())
    }
}
