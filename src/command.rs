//! Voice command parsing
//!
//! Turns a recognized utterance into a typed command. Patterns are checked
//! most-specific first: the exit phrase, then web search, then messaging,
//! then music, then file operations, then app control.

use regex::Regex;

/// A parsed voice instruction
///
/// Created per recognized utterance, consumed immediately by the
/// dispatcher, never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Open a macOS application
    OpenApp(String),
    /// Quit a macOS application
    CloseApp(String),
    /// Play a library track and monitor until it stops
    PlayMusic(String),
    /// Send a message to a contact
    SendMessage {
        /// Contact display name
        contact: String,
        /// Message body
        message: String,
    },
    /// Search the web in the browser
    Search(String),
    /// Local file operation described in natural language
    FileOp(String),
    /// Shut the assistant down
    Exit,
    /// Nothing matched; the utterance is kept for logging
    Unrecognized(String),
}

/// Compiled pattern set for utterance parsing
pub struct CommandParser {
    exit_phrase: String,
    search: Regex,
    message: Regex,
    music: Vec<Regex>,
    open_app: Regex,
    close_app: Regex,
    file_keywords: Vec<&'static str>,
    courtesy: Regex,
}

impl std::fmt::Debug for CommandParser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandParser")
            .field("exit_phrase", &self.exit_phrase)
            .finish_non_exhaustive()
    }
}

impl CommandParser {
    /// Compile the pattern set
    ///
    /// `exit_phrase` is matched as a substring of the utterance.
    #[must_use]
    pub fn new(exit_phrase: impl Into<String>) -> Self {
        let compile = |pattern: &str| {
            Regex::new(pattern)
                .unwrap_or_else(|e| unreachable!("command pattern is valid: {e}"))
        };

        Self {
            exit_phrase: exit_phrase.into().to_lowercase(),
            search: compile(r"search\s+(?:safari|the\s+web|browser)\s+for\s+(.+)"),
            message: compile(
                r"(?:send\s+a\s+message\s+to|send\s+message\s+to|message|whatsapp)\s+(.+?)\s+(?:with|saying)\s+(.+)",
            ),
            music: vec![
                compile(r"^play\s+(?:the\s+)?(?:song\s+|music\s+|some\s+)?(.+)$"),
                compile(r"^listen\s+to\s+(?:the\s+|some\s+)?(.+)$"),
                compile(r"^put\s+on\s+(?:the\s+|some\s+)?(.+)$"),
            ],
            open_app: compile(r"^(?:please\s+)?(?:open|launch|start)\s+(?:app\s+)?(.+)$"),
            close_app: compile(r"^(?:please\s+)?(?:close|quit|shut\s+down)\s+(.+)$"),
            file_keywords: vec![
                "copy", "move", "delete", "paste", "folder", "directory", "file",
                "files", "folders", "directories", "transfer", "shift", "erase",
                "remove", "trash", "rename", "go to", "navigate", "downloads",
                "documents", "desktop",
            ],
            courtesy: compile(r"\s+for\s+me.*$"),
        }
    }

    /// Parse one recognized utterance
    #[must_use]
    pub fn parse(&self, utterance: &str) -> Command {
        let text = utterance.trim().to_lowercase();
        if text.is_empty() {
            return Command::Unrecognized(String::new());
        }

        if text.contains(&self.exit_phrase) {
            return Command::Exit;
        }

        if let Some(caps) = self.search.captures(&text) {
            return Command::Search(self.strip_courtesy(&caps[1]));
        }

        if let Some(caps) = self.message.captures(&text) {
            return Command::SendMessage {
                contact: self.strip_courtesy(&caps[1]),
                message: self.strip_courtesy(&caps[2]),
            };
        }

        for pattern in &self.music {
            if let Some(caps) = pattern.captures(&text) {
                return Command::PlayMusic(self.strip_courtesy(&caps[1]));
            }
        }

        // File phrasing can start with "open"/"close" too ("open downloads
        // folder"), so the keyword net runs before the app patterns
        if self
            .file_keywords
            .iter()
            .any(|keyword| text.contains(keyword))
        {
            return Command::FileOp(text);
        }

        if let Some(caps) = self.open_app.captures(&text) {
            return Command::OpenApp(self.strip_courtesy(&caps[1]));
        }

        if let Some(caps) = self.close_app.captures(&text) {
            return Command::CloseApp(self.strip_courtesy(&caps[1]));
        }

        Command::Unrecognized(text)
    }

    /// Drop trailing courtesy phrases ("for me", "for me sir")
    fn strip_courtesy(&self, fragment: &str) -> String {
        self.courtesy.replace(fragment, "").trim().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parser() -> CommandParser {
        CommandParser::new("power down")
    }

    #[test]
    fn test_exit_phrase_anywhere() {
        assert_eq!(parser().parse("okay power down now"), Command::Exit);
        assert_eq!(parser().parse("Power Down"), Command::Exit);
    }

    #[test]
    fn test_open_app() {
        assert_eq!(
            parser().parse("open safari"),
            Command::OpenApp("safari".to_string())
        );
        assert_eq!(
            parser().parse("please launch visual studio code for me"),
            Command::OpenApp("visual studio code".to_string())
        );
    }

    #[test]
    fn test_close_app() {
        assert_eq!(
            parser().parse("close safari for me sir"),
            Command::CloseApp("safari".to_string())
        );
        assert_eq!(
            parser().parse("quit mail"),
            Command::CloseApp("mail".to_string())
        );
    }

    #[test]
    fn test_play_music_variants() {
        assert_eq!(
            parser().parse("play bohemian rhapsody"),
            Command::PlayMusic("bohemian rhapsody".to_string())
        );
        assert_eq!(
            parser().parse("listen to some jazz"),
            Command::PlayMusic("jazz".to_string())
        );
        assert_eq!(
            parser().parse("put on the blue album for me"),
            Command::PlayMusic("blue album".to_string())
        );
    }

    #[test]
    fn test_send_message() {
        assert_eq!(
            parser().parse("message john with hello there"),
            Command::SendMessage {
                contact: "john".to_string(),
                message: "hello there".to_string(),
            }
        );
        assert_eq!(
            parser().parse("send a message to jane saying how are you"),
            Command::SendMessage {
                contact: "jane".to_string(),
                message: "how are you".to_string(),
            }
        );
    }

    #[test]
    fn test_message_beats_music() {
        // "play" inside the body must not turn the message into a track
        assert_eq!(
            parser().parse("message john saying play something tonight"),
            Command::SendMessage {
                contact: "john".to_string(),
                message: "play something tonight".to_string(),
            }
        );
    }

    #[test]
    fn test_search() {
        assert_eq!(
            parser().parse("search safari for rust traits"),
            Command::Search("rust traits".to_string())
        );
        assert_eq!(
            parser().parse("search the web for weather in pune"),
            Command::Search("weather in pune".to_string())
        );
    }

    #[test]
    fn test_file_op_beats_open_app() {
        assert_eq!(
            parser().parse("open downloads folder"),
            Command::FileOp("open downloads folder".to_string())
        );
        assert_eq!(
            parser().parse("move report.txt to documents"),
            Command::FileOp("move report.txt to documents".to_string())
        );
    }

    #[test]
    fn test_plain_open_is_app_not_file_op() {
        assert_eq!(
            parser().parse("open whatsapp"),
            Command::OpenApp("whatsapp".to_string())
        );
    }

    #[test]
    fn test_unrecognized() {
        assert_eq!(
            parser().parse("what is the meaning of life"),
            Command::Unrecognized("what is the meaning of life".to_string())
        );
        assert_eq!(parser().parse("   "), Command::Unrecognized(String::new()));
    }
}
