//! Speech processing
//!
//! Microphone capture, speech recognition, synthesis through the external
//! voice-cloning engine, and the spoken-response pipeline.

mod capture;
mod recognizer;
mod speaker;
mod synthesizer;

pub use capture::{CaptureSource, MicCapture, SAMPLE_RATE, samples_to_wav};
pub use recognizer::{HttpRecognizer, RecognitionLoop, Recognizer, RecognizeError};
pub use speaker::Speaker;
pub use synthesizer::{Synthesizer, VoiceCloneSynthesizer, normalize_for_speech};
