//! Baton - voice assistant daemon for macOS
//!
//! This library provides the core functionality for the Baton assistant:
//! - Audio mode arbitration (one owner of the audio device at a time)
//! - Mode-gated speech recognition
//! - Speech synthesis through an external voice-cloning engine
//! - Command parsing and dispatch over OS automation
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │                 RecognitionLoop                      │
//! │     microphone, sampled only while mode == Idle      │
//! └────────────────────┬────────────────────────────────┘
//!                      │ text
//! ┌────────────────────▼────────────────────────────────┐
//! │               CommandDispatcher                      │
//! │   parse │ confirm │ act │ spawn music session        │
//! └────────────────────┬────────────────────────────────┘
//!                      │ try_enter / release
//! ┌────────────────────▼────────────────────────────────┐
//! │               AudioModeArbiter                       │
//! │   Idle │ Listening │ Speaking │ PlayingMusic         │
//! └────────────────────┬────────────────────────────────┘
//!                      │
//! ┌────────────────────▼────────────────────────────────┐
//! │   Synthesizer → FileReadinessWaiter → Renderer       │
//! │        external engine, stability poll, afplay       │
//! └─────────────────────────────────────────────────────┘
//! ```

pub mod arbiter;
pub mod audio;
pub mod automation;
pub mod command;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod speech;

pub use arbiter::{AudioMode, AudioModeArbiter, Busy, ModeGuard};
pub use audio::{
    AfplayRenderer, FileReadinessWaiter, PendingFile, Readiness, RenderError, RenderOptions,
    Renderer,
};
pub use command::{Command, CommandParser};
pub use config::{Config, PlayerConfig, TimingConfig, VoiceConfig};
pub use dispatcher::{Collaborators, CommandDispatcher, SessionEvent};
pub use error::{Error, Result};
pub use speech::{
    CaptureSource, HttpRecognizer, MicCapture, RecognitionLoop, Recognizer, RecognizeError,
    Speaker, Synthesizer, VoiceCloneSynthesizer,
};
