//! Speech recognition
//!
//! HTTP recognition backends and the mode-gated recognition loop.

use std::sync::Arc;
use std::time::Duration;

use crate::arbiter::{AudioMode, AudioModeArbiter};
use crate::config::{RecognitionConfig, TimingConfig};
use crate::speech::capture::{CaptureSource, samples_to_wav};
use crate::{Error, Result};

/// Failure modes of a recognition attempt
#[derive(Debug, thiserror::Error)]
pub enum RecognizeError {
    /// The backend heard nothing intelligible; expected, not logged as an
    /// error
    #[error("no speech detected")]
    NoSpeechDetected,

    /// The backend request failed or returned garbage
    #[error("recognition backend error: {0}")]
    Backend(String),
}

/// Converts a captured utterance into text
#[async_trait::async_trait]
pub trait Recognizer: Send + Sync {
    /// Transcribe WAV audio
    ///
    /// # Errors
    ///
    /// Returns [`RecognizeError::NoSpeechDetected`] on silence or
    /// ambiguity, [`RecognizeError::Backend`] on transport or API failure.
    async fn recognize(&self, wav: &[u8], language: &str)
    -> std::result::Result<String, RecognizeError>;
}

/// Response from OpenAI Whisper transcription API
#[derive(serde::Deserialize)]
struct WhisperResponse {
    text: String,
}

/// Response from Deepgram transcription API
#[derive(serde::Deserialize)]
struct DeepgramResponse {
    results: DeepgramResults,
}

#[derive(serde::Deserialize)]
struct DeepgramResults {
    channels: Vec<DeepgramChannel>,
}

#[derive(serde::Deserialize)]
struct DeepgramChannel {
    alternatives: Vec<DeepgramAlternative>,
}

#[derive(serde::Deserialize)]
struct DeepgramAlternative {
    transcript: String,
}

/// STT provider backend
#[derive(Clone, Copy, Debug)]
enum SttProvider {
    Whisper,
    Deepgram,
}

/// HTTP speech-to-text client
pub struct HttpRecognizer {
    client: reqwest::Client,
    api_key: String,
    model: String,
    provider: SttProvider,
}

impl HttpRecognizer {
    /// Build a recognizer from configuration
    ///
    /// # Errors
    ///
    /// Returns error if the provider is unknown or its API key is missing
    pub fn from_config(config: &RecognitionConfig) -> Result<Self> {
        let provider = match config.provider.as_str() {
            "whisper" => SttProvider::Whisper,
            "deepgram" => SttProvider::Deepgram,
            other => {
                return Err(Error::Config(format!("unknown STT provider: {other}")));
            }
        };

        let api_key = config.api_key.clone().filter(|k| !k.is_empty()).ok_or_else(|| {
            Error::Config(format!("API key required for STT provider {}", config.provider))
        })?;

        Ok(Self {
            client: reqwest::Client::new(),
            api_key,
            model: config.model.clone(),
            provider,
        })
    }

    async fn recognize_whisper(
        &self,
        wav: &[u8],
        language: &str,
    ) -> std::result::Result<String, RecognizeError> {
        let form = reqwest::multipart::Form::new()
            .part(
                "file",
                reqwest::multipart::Part::bytes(wav.to_vec())
                    .file_name("utterance.wav")
                    .mime_str("audio/wav")
                    .map_err(|e| RecognizeError::Backend(e.to_string()))?,
            )
            .text("model", self.model.clone())
            .text("language", primary_subtag(language).to_string());

        let response = self
            .client
            .post("https://api.openai.com/v1/audio/transcriptions")
            .header("Authorization", format!("Bearer {}", self.api_key))
            .multipart(form)
            .send()
            .await
            .map_err(|e| RecognizeError::Backend(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RecognizeError::Backend(format!("{status}: {body}")));
        }

        let result: WhisperResponse = response
            .json()
            .await
            .map_err(|e| RecognizeError::Backend(e.to_string()))?;

        Ok(result.text)
    }

    async fn recognize_deepgram(
        &self,
        wav: &[u8],
        language: &str,
    ) -> std::result::Result<String, RecognizeError> {
        let url = format!(
            "https://api.deepgram.com/v1/listen?model={}&language={}&punctuate=true",
            self.model, language
        );

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Token {}", self.api_key))
            .header("Content-Type", "audio/wav")
            .body(wav.to_vec())
            .send()
            .await
            .map_err(|e| RecognizeError::Backend(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RecognizeError::Backend(format!("{status}: {body}")));
        }

        let result: DeepgramResponse = response
            .json()
            .await
            .map_err(|e| RecognizeError::Backend(e.to_string()))?;

        let transcript = result
            .results
            .channels
            .first()
            .and_then(|c| c.alternatives.first())
            .map(|a| a.transcript.clone())
            .unwrap_or_default();

        Ok(transcript)
    }
}

#[async_trait::async_trait]
impl Recognizer for HttpRecognizer {
    async fn recognize(
        &self,
        wav: &[u8],
        language: &str,
    ) -> std::result::Result<String, RecognizeError> {
        tracing::debug!(bytes = wav.len(), provider = ?self.provider, "transcribing");

        let text = match self.provider {
            SttProvider::Whisper => self.recognize_whisper(wav, language).await?,
            SttProvider::Deepgram => self.recognize_deepgram(wav, language).await?,
        };

        let text = text.trim().to_string();
        if text.is_empty() {
            return Err(RecognizeError::NoSpeechDetected);
        }

        tracing::info!(transcript = %text, "transcription complete");
        Ok(text)
    }
}

/// "en-US" -> "en" (Whisper takes bare ISO-639-1 codes)
fn primary_subtag(language: &str) -> &str {
    language.split('-').next().unwrap_or(language)
}

/// Continuously samples the microphone while the audio subsystem is idle
///
/// The loop never takes a mode guard for ordinary capture: leaving the
/// mode at `Idle` is what lets a speak or music transition preempt a
/// window in flight. Sampling eligibility is re-checked between chunk
/// drains so a transition aborts the window early instead of after a
/// full capture.
pub struct RecognitionLoop {
    arbiter: Arc<AudioModeArbiter>,
    capture: Box<dyn CaptureSource>,
    recognizer: Arc<dyn Recognizer>,
    language: String,
    window: Duration,
    chunk: Duration,
}

impl RecognitionLoop {
    /// Wire the loop to its capture source and backend
    pub fn new(
        arbiter: Arc<AudioModeArbiter>,
        capture: Box<dyn CaptureSource>,
        recognizer: Arc<dyn Recognizer>,
        language: impl Into<String>,
        timing: &TimingConfig,
    ) -> Self {
        Self {
            arbiter,
            capture,
            recognizer,
            language: language.into(),
            window: timing.capture_window,
            chunk: timing.capture_chunk,
        }
    }

    /// Capture one bounded window and submit it for recognition
    ///
    /// Returns `None` when the audio subsystem is not idle, when the
    /// window is aborted by a mode transition, on silence, or on a backend
    /// failure (logged, never raised).
    pub async fn listen(&mut self) -> Option<String> {
        if self.arbiter.current_mode() != AudioMode::Idle {
            tokio::time::sleep(self.chunk).await;
            return None;
        }

        if let Err(e) = self.capture.start() {
            tracing::error!(error = %e, "microphone unavailable");
            tokio::time::sleep(self.window).await;
            return None;
        }

        #[allow(clippy::cast_possible_truncation)]
        let needed =
            (u128::from(self.capture.sample_rate()) * self.window.as_millis() / 1000) as usize;
        let mut samples: Vec<f32> = Vec::with_capacity(needed);

        while samples.len() < needed {
            let mode = self.arbiter.current_mode();
            if mode != AudioMode::Idle {
                tracing::debug!(%mode, collected = samples.len(), "capture aborted by mode transition");
                self.capture.stop();
                return None;
            }
            tokio::time::sleep(self.chunk).await;
            samples.extend(self.capture.take_samples());
        }

        self.capture.stop();

        let wav = match samples_to_wav(&samples, self.capture.sample_rate()) {
            Ok(wav) => wav,
            Err(e) => {
                tracing::error!(error = %e, "WAV encoding failed");
                return None;
            }
        };

        match self.recognizer.recognize(&wav, &self.language).await {
            Ok(text) => Some(text.to_lowercase()),
            Err(RecognizeError::NoSpeechDetected) => None,
            Err(e) => {
                tracing::warn!(error = %e, "recognition failed");
                None
            }
        }
    }
}
