//! Configuration management for the Baton assistant

use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

use crate::{Error, Result};

/// Baton assistant configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Voice synthesis configuration
    pub voice: VoiceConfig,

    /// Speech recognition configuration
    pub recognition: RecognitionConfig,

    /// External audio player configuration
    pub player: PlayerConfig,

    /// Delays and poll cadences for the audio pipeline
    pub timing: TimingConfig,

    /// Path to data directory (scratch audio, logs)
    pub data_dir: PathBuf,
}

/// Voice synthesis configuration
#[derive(Debug, Clone)]
pub struct VoiceConfig {
    /// TTS engine executable (invoked as a subprocess)
    pub engine_program: String,

    /// TTS model identifier passed to the engine
    pub engine_model: String,

    /// Reference voice sample for cloning; absence is reported on the
    /// first speak attempt, not at startup
    pub reference_voice: PathBuf,

    /// Scratch path the engine writes synthesized audio to
    pub scratch_path: PathBuf,

    /// Synthesis language code (e.g. "en")
    pub language: String,

    /// Phrase that shuts the assistant down
    pub exit_phrase: String,

    /// Upper bound on one synthesis engine invocation
    pub synthesis_timeout: Duration,
}

/// Speech recognition configuration
#[derive(Debug, Clone)]
pub struct RecognitionConfig {
    /// STT provider ("whisper" or "deepgram")
    pub provider: String,

    /// API key for the provider (from `OPENAI_API_KEY` / `DEEPGRAM_API_KEY`)
    pub api_key: Option<String>,

    /// STT model identifier (e.g. "whisper-1", "nova-2")
    pub model: String,

    /// Recognition language tag (e.g. "en-US")
    pub language: String,
}

/// External audio player configuration
#[derive(Debug, Clone)]
pub struct PlayerConfig {
    /// Player executable (macOS `afplay`)
    pub program: String,

    /// Upper bound on one playback invocation; a hung player must not
    /// hold the audio mode forever
    pub timeout: Duration,

    /// Delay after the readability probe before invoking the player,
    /// letting the writer's file handle be released
    pub probe_settle: Duration,

    /// Delay after a successful playback before returning
    pub post_play_settle: Duration,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            program: "afplay".to_string(),
            timeout: Duration::from_secs(90),
            probe_settle: Duration::from_millis(200),
            post_play_settle: Duration::from_millis(300),
        }
    }
}

/// Delays and poll cadences for the audio pipeline
///
/// Defaults are the tuned production values; tests inject shorter ones.
#[derive(Debug, Clone)]
pub struct TimingConfig {
    /// Main loop tick between listen attempts
    pub loop_tick: Duration,

    /// Microphone capture window per listen attempt
    pub capture_window: Duration,

    /// Interval between buffer drains (and mode re-checks) during capture
    pub capture_chunk: Duration,

    /// Upper bound on waiting for a synthesized file to become ready
    pub ready_timeout: Duration,

    /// Microphone resume delay after speech playback stops
    pub speech_resume_delay: Duration,

    /// Gap between the end of the spoken intro and the music start, so the
    /// tail of the synthesized audio never bleeds into the music
    pub music_settle: Duration,

    /// Bounded wait for playback to actually begin
    pub music_start_wait: Duration,

    /// Poll interval while waiting for playback to begin
    pub music_start_poll: Duration,

    /// Poll interval while waiting for playback to stop
    pub music_stop_poll: Duration,

    /// Microphone resume delay after music stops
    pub music_resume_delay: Duration,

    /// Playback rate for the spoken music intro
    pub music_intro_speed: f64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            loop_tick: Duration::from_millis(100),
            capture_window: Duration::from_secs(3),
            capture_chunk: Duration::from_millis(100),
            ready_timeout: Duration::from_secs(15),
            speech_resume_delay: Duration::from_millis(500),
            music_settle: Duration::from_secs(1),
            music_start_wait: Duration::from_secs(5),
            music_start_poll: Duration::from_millis(500),
            music_stop_poll: Duration::from_secs(1),
            music_resume_delay: Duration::from_secs(2),
            music_intro_speed: 0.9,
        }
    }
}

/// Optional config file overlay (`~/.config/baton/config.toml` or
/// `BATON_CONFIG`)
#[derive(Debug, Default, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    voice: VoiceFileSection,
    #[serde(default)]
    recognition: RecognitionFileSection,
    #[serde(default)]
    player: PlayerFileSection,
}

#[derive(Debug, Default, Deserialize)]
struct VoiceFileSection {
    engine_program: Option<String>,
    engine_model: Option<String>,
    reference_voice: Option<PathBuf>,
    scratch_path: Option<PathBuf>,
    language: Option<String>,
    exit_phrase: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct RecognitionFileSection {
    provider: Option<String>,
    model: Option<String>,
    language: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct PlayerFileSection {
    program: Option<String>,
}

/// Return the data directory, creating it if needed
///
/// Uses `~/Library/Application Support/dev/omni/baton` on macOS
pub fn data_dir() -> PathBuf {
    let dir = directories::ProjectDirs::from("dev", "omni", "baton")
        .map_or_else(|| PathBuf::from(".baton"), |d| d.data_dir().to_path_buf());

    if let Err(e) = std::fs::create_dir_all(&dir) {
        tracing::warn!(path = %dir.display(), error = %e, "failed to create data directory");
    }

    dir
}

impl Config {
    /// Load configuration from the optional config file and environment
    ///
    /// # Errors
    ///
    /// Returns error if the config file exists but cannot be parsed
    pub fn load() -> Result<Self> {
        let data_dir = data_dir();

        let file = Self::load_file(&data_dir)?;

        let reference_voice = std::env::var("BATON_REFERENCE_VOICE")
            .map(PathBuf::from)
            .ok()
            .or(file.voice.reference_voice)
            .unwrap_or_else(|| data_dir.join("reference-voice.wav"));

        let scratch_path = std::env::var("BATON_SCRATCH_PATH")
            .map(PathBuf::from)
            .ok()
            .or(file.voice.scratch_path)
            .unwrap_or_else(|| data_dir.join("response.wav"));

        let voice = VoiceConfig {
            engine_program: std::env::var("BATON_TTS_PROGRAM")
                .ok()
                .or(file.voice.engine_program)
                .unwrap_or_else(|| "tts".to_string()),
            engine_model: std::env::var("BATON_TTS_MODEL")
                .ok()
                .or(file.voice.engine_model)
                .unwrap_or_else(|| {
                    "tts_models/multilingual/multi-dataset/your_tts".to_string()
                }),
            reference_voice,
            scratch_path,
            language: file.voice.language.unwrap_or_else(|| "en".to_string()),
            exit_phrase: std::env::var("BATON_EXIT_PHRASE")
                .ok()
                .or(file.voice.exit_phrase)
                .unwrap_or_else(|| "power down".to_string()),
            synthesis_timeout: Duration::from_secs(60),
        };

        let provider = std::env::var("BATON_STT_PROVIDER")
            .ok()
            .or(file.recognition.provider)
            .unwrap_or_else(|| "whisper".to_string());

        let api_key = match provider.as_str() {
            "deepgram" => std::env::var("DEEPGRAM_API_KEY").ok(),
            _ => std::env::var("OPENAI_API_KEY").ok(),
        };

        let recognition = RecognitionConfig {
            model: std::env::var("BATON_STT_MODEL")
                .ok()
                .or(file.recognition.model)
                .unwrap_or_else(|| default_stt_model(&provider)),
            provider,
            api_key,
            language: file
                .recognition
                .language
                .unwrap_or_else(|| "en-US".to_string()),
        };

        let player = PlayerConfig {
            program: std::env::var("BATON_PLAYER")
                .ok()
                .or(file.player.program)
                .unwrap_or_else(|| "afplay".to_string()),
            ..PlayerConfig::default()
        };

        Ok(Self {
            voice,
            recognition,
            player,
            timing: TimingConfig::default(),
            data_dir,
        })
    }

    /// Parse the config file if one exists
    fn load_file(data_dir: &std::path::Path) -> Result<ConfigFile> {
        let path = std::env::var("BATON_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| data_dir.join("config.toml"));

        if !path.exists() {
            return Ok(ConfigFile::default());
        }

        let raw = std::fs::read_to_string(&path)
            .map_err(|e| Error::Config(format!("cannot read {}: {e}", path.display())))?;
        let file = toml::from_str(&raw)?;

        tracing::debug!(path = %path.display(), "loaded config file");
        Ok(file)
    }
}

/// Default STT model for a provider
fn default_stt_model(provider: &str) -> String {
    match provider {
        "deepgram" => "nova-2".to_string(),
        _ => "whisper-1".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_timing_matches_tuned_values() {
        let timing = TimingConfig::default();
        assert_eq!(timing.capture_window, Duration::from_secs(3));
        assert_eq!(timing.music_settle, Duration::from_secs(1));
        assert_eq!(timing.music_start_wait, Duration::from_secs(5));
        assert!((timing.music_intro_speed - 0.9).abs() < f64::EPSILON);
    }

    #[test]
    fn test_config_file_sections_are_optional() {
        let file: ConfigFile = toml::from_str("").expect("empty file parses");
        assert!(file.voice.exit_phrase.is_none());

        let file: ConfigFile = toml::from_str(
            "[voice]\nexit_phrase = \"roll out\"\n\n[player]\nprogram = \"afplay\"\n",
        )
        .expect("partial file parses");
        assert_eq!(file.voice.exit_phrase.as_deref(), Some("roll out"));
        assert_eq!(file.player.program.as_deref(), Some("afplay"));
        assert!(file.recognition.provider.is_none());
    }

    #[test]
    fn test_default_stt_model_per_provider() {
        assert_eq!(default_stt_model("whisper"), "whisper-1");
        assert_eq!(default_stt_model("deepgram"), "nova-2");
    }
}
