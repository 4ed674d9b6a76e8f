//! Speech synthesis through the external voice-cloning engine
//!
//! The engine is a separate process that renders text to a WAV file using
//! a reference voice sample. It returns before the file is fully written,
//! which is why callers go through the readiness waiter before playback.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::OnceLock;
use std::time::Duration;

use regex::Regex;
use tokio::process::Command;

use crate::config::VoiceConfig;
use crate::{Error, Result};

/// Abbreviations the synthesis engine tends to skip or mangle, expanded
/// to their spoken forms before rendering
const SPOKEN_FORMS: &[(&str, &str)] = &[
    ("...", " dot dot dot "),
    ("Mr.", "Mister "),
    ("Mrs.", "Missus "),
    ("Dr.", "Doctor "),
    ("Prof.", "Professor "),
    ("St.", "Saint "),
    ("Ave.", "Avenue "),
    ("Rd.", "Road "),
    ("Ln.", "Lane "),
    ("etc.", "et cetera "),
    ("vs.", "versus "),
    ("i.e.", "that is "),
    ("e.g.", "for example "),
];

/// Renders text to an audio file
#[async_trait::async_trait]
pub trait Synthesizer: Send + Sync {
    /// Render `text` to a WAV file at `output`
    ///
    /// The engine may still be writing when this returns; wait for the
    /// file to become ready before playing it.
    ///
    /// # Errors
    ///
    /// Returns error if the engine cannot be invoked or exits non-zero
    async fn synthesize(&self, text: &str, output: &Path) -> Result<()>;
}

/// Invokes the external voice-cloning TTS engine CLI
pub struct VoiceCloneSynthesizer {
    program: String,
    model: String,
    reference_voice: PathBuf,
    language: String,
    timeout: Duration,
}

impl VoiceCloneSynthesizer {
    /// Build a synthesizer from the voice configuration
    #[must_use]
    pub fn new(config: &VoiceConfig) -> Self {
        Self {
            program: config.engine_program.clone(),
            model: config.engine_model.clone(),
            reference_voice: config.reference_voice.clone(),
            language: config.language.clone(),
            timeout: config.synthesis_timeout,
        }
    }
}

#[async_trait::async_trait]
impl Synthesizer for VoiceCloneSynthesizer {
    async fn synthesize(&self, text: &str, output: &Path) -> Result<()> {
        if !self.reference_voice.exists() {
            return Err(Error::Synthesis(format!(
                "reference voice sample not found: {}",
                self.reference_voice.display()
            )));
        }

        let text = normalize_for_speech(text);
        tracing::debug!(%text, output = %output.display(), "synthesizing");

        let mut cmd = Command::new(&self.program);
        cmd.arg("--text")
            .arg(&text)
            .arg("--model_name")
            .arg(&self.model)
            .arg("--speaker_wav")
            .arg(&self.reference_voice)
            .arg("--language_idx")
            .arg(&self.language)
            .arg("--out_path")
            .arg(output)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let child = cmd
            .spawn()
            .map_err(|e| Error::Synthesis(format!("cannot invoke {}: {e}", self.program)))?;

        let outcome = tokio::time::timeout(self.timeout, child.wait_with_output())
            .await
            .map_err(|_| {
                Error::Synthesis(format!("engine timed out after {:?}", self.timeout))
            })?
            .map_err(|e| Error::Synthesis(e.to_string()))?;

        if !outcome.status.success() {
            let stderr = String::from_utf8_lossy(&outcome.stderr);
            return Err(Error::Synthesis(format!(
                "engine exited {}: {}",
                outcome.status,
                stderr.trim()
            )));
        }

        Ok(())
    }
}

/// Expand abbreviations and collapse whitespace before synthesis
#[must_use]
pub fn normalize_for_speech(text: &str) -> String {
    static WHITESPACE: OnceLock<Regex> = OnceLock::new();

    let mut normalized = text.to_string();
    for (written, spoken) in SPOKEN_FORMS {
        normalized = normalized.replace(written, spoken);
    }

    let whitespace = WHITESPACE.get_or_init(|| Regex::new(r"\s+").unwrap_or_else(|e| {
        unreachable!("whitespace regex is valid: {e}")
    }));
    whitespace.replace_all(&normalized, " ").trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_expands_abbreviations() {
        assert_eq!(
            normalize_for_speech("Dr. Smith vs. Mr. Jones"),
            "Doctor Smith versus Mister Jones"
        );
    }

    #[test]
    fn test_normalize_speaks_ellipsis() {
        assert_eq!(normalize_for_speech("well..."), "well dot dot dot");
    }

    #[test]
    fn test_normalize_collapses_whitespace() {
        assert_eq!(
            normalize_for_speech("  opening   Safari\n\tfor you  "),
            "opening Safari for you"
        );
    }

    #[test]
    fn test_normalize_leaves_plain_text_alone() {
        assert_eq!(
            normalize_for_speech("Playing jazz for you."),
            "Playing jazz for you."
        );
    }
}
