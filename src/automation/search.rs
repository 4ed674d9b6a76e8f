//! Web search through the browser

use super::osascript::run_osascript;
use crate::Result;

/// Opens a web search in the user's browser
#[async_trait::async_trait]
pub trait WebSearch: Send + Sync {
    /// Search the web for `query`
    ///
    /// # Errors
    ///
    /// Returns error if the browser cannot be scripted
    async fn search(&self, query: &str) -> Result<()>;
}

/// Opens a Google search in a new Safari tab
#[derive(Debug, Clone, Copy, Default)]
pub struct SafariSearch;

#[async_trait::async_trait]
impl WebSearch for SafariSearch {
    async fn search(&self, query: &str) -> Result<()> {
        let url = format!(
            "https://www.google.com/search?q={}",
            urlencoding::encode(query)
        );

        let script = format!(
            r#"
tell application "Safari"
    activate
    if (count of windows) = 0 then
        make new document
    end if
    tell front window
        set current tab to (make new tab with properties {{URL:"{url}"}})
    end tell
end tell
"#
        );

        run_osascript(&script).await?;

        tracing::info!(query, "search opened");
        Ok(())
    }
}
