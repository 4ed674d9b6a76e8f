//! Shared test doubles for the audio pipeline
//!
//! Every external collaborator is replaced with a scripted fake; real
//! audio hardware and subprocesses are never touched.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use baton_assistant::automation::{AppControl, FileOps, MessageSender, MusicControl, WebSearch};
use baton_assistant::speech::CaptureSource;
use baton_assistant::{
    AudioMode, AudioModeArbiter, RecognizeError, Recognizer, RenderError, RenderOptions, Renderer,
    Result, Synthesizer, TimingConfig,
};

/// Shared, ordered record of everything the fakes were asked to do
#[derive(Clone, Default)]
pub struct CallLog {
    entries: Arc<Mutex<Vec<String>>>,
}

impl CallLog {
    pub fn push(&self, entry: impl Into<String>) {
        self.entries.lock().unwrap().push(entry.into());
    }

    pub fn entries(&self) -> Vec<String> {
        self.entries.lock().unwrap().clone()
    }

    /// Index of the first entry starting with `prefix`
    pub fn first_index_of(&self, prefix: &str) -> Option<usize> {
        self.entries
            .lock()
            .unwrap()
            .iter()
            .position(|e| e.starts_with(prefix))
    }
}

/// Synthesizer that writes a tiny file immediately and logs the text
pub struct FakeSynthesizer {
    pub log: CallLog,
    pub fail: bool,
}

impl FakeSynthesizer {
    pub fn new(log: CallLog) -> Self {
        Self { log, fail: false }
    }
}

#[async_trait::async_trait]
impl Synthesizer for FakeSynthesizer {
    async fn synthesize(&self, text: &str, output: &Path) -> Result<()> {
        self.log.push(format!("speak:{text}"));
        if self.fail {
            return Err(baton_assistant::Error::Synthesis("engine down".to_string()));
        }
        std::fs::write(output, b"RIFFfakeWAVE")?;
        Ok(())
    }
}

/// Renderer that succeeds instantly or returns a scripted error
pub struct FakeRenderer {
    pub log: CallLog,
    pub error: Mutex<Option<RenderError>>,
}

impl FakeRenderer {
    pub fn new(log: CallLog) -> Self {
        Self {
            log,
            error: Mutex::new(None),
        }
    }

    pub fn failing_with(log: CallLog, error: RenderError) -> Self {
        Self {
            log,
            error: Mutex::new(Some(error)),
        }
    }
}

#[async_trait::async_trait]
impl Renderer for FakeRenderer {
    async fn render(&self, path: &Path, _opts: RenderOptions) -> std::result::Result<(), RenderError> {
        self.log.push(format!("render:{}", path.display()));
        match self.error.lock().unwrap().take() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

/// Music collaborator with a scripted `is_playing` sequence
pub struct FakeMusic {
    pub log: CallLog,
    pub found: bool,
    playing_script: Mutex<VecDeque<bool>>,
    pub poll_count: AtomicUsize,
}

impl FakeMusic {
    pub fn new(log: CallLog, found: bool, playing_script: Vec<bool>) -> Self {
        Self {
            log,
            found,
            playing_script: Mutex::new(playing_script.into()),
            poll_count: AtomicUsize::new(0),
        }
    }

    pub fn polls(&self) -> usize {
        self.poll_count.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl MusicControl for FakeMusic {
    async fn play(&self, query: &str) -> Result<bool> {
        self.log.push(format!("play:{query}"));
        Ok(self.found)
    }

    async fn is_playing(&self) -> bool {
        self.poll_count.fetch_add(1, Ordering::SeqCst);
        self.playing_script.lock().unwrap().pop_front().unwrap_or(false)
    }
}

/// App collaborator that logs open/close calls
pub struct FakeApps {
    pub log: CallLog,
}

#[async_trait::async_trait]
impl AppControl for FakeApps {
    async fn open_app(&self, name: &str) -> Result<()> {
        self.log.push(format!("open:{name}"));
        Ok(())
    }

    async fn close_app(&self, name: &str) -> Result<()> {
        self.log.push(format!("close:{name}"));
        Ok(())
    }

    async fn is_app_running(&self, _name: &str) -> bool {
        false
    }
}

pub struct FakeMessenger {
    pub log: CallLog,
}

#[async_trait::async_trait]
impl MessageSender for FakeMessenger {
    async fn send_message(&self, contact: &str, message: &str) -> Result<()> {
        self.log.push(format!("message:{contact}:{message}"));
        Ok(())
    }
}

pub struct FakeSearch {
    pub log: CallLog,
}

#[async_trait::async_trait]
impl WebSearch for FakeSearch {
    async fn search(&self, query: &str) -> Result<()> {
        self.log.push(format!("search:{query}"));
        Ok(())
    }
}

pub struct FakeFiles {
    pub log: CallLog,
}

#[async_trait::async_trait]
impl FileOps for FakeFiles {
    async fn perform(&self, request: &str) -> Result<String> {
        self.log.push(format!("fileop:{request}"));
        Ok("Done".to_string())
    }
}

/// Capture source that produces silence and records the arbiter mode
/// observed at every interaction
pub struct FakeCapture {
    arbiter: Arc<AudioModeArbiter>,
    pub starts: Arc<Mutex<Vec<AudioMode>>>,
    pub drains: Arc<Mutex<Vec<AudioMode>>>,
    samples_per_drain: usize,
}

impl FakeCapture {
    pub fn new(arbiter: Arc<AudioModeArbiter>, samples_per_drain: usize) -> Self {
        Self {
            arbiter,
            starts: Arc::new(Mutex::new(Vec::new())),
            drains: Arc::new(Mutex::new(Vec::new())),
            samples_per_drain,
        }
    }
}

impl CaptureSource for FakeCapture {
    fn start(&mut self) -> Result<()> {
        self.starts.lock().unwrap().push(self.arbiter.current_mode());
        Ok(())
    }

    fn stop(&mut self) {}

    fn take_samples(&mut self) -> Vec<f32> {
        self.drains.lock().unwrap().push(self.arbiter.current_mode());
        vec![0.0; self.samples_per_drain]
    }

    fn sample_rate(&self) -> u32 {
        16000
    }
}

/// Recognizer that replays a scripted transcript queue
pub struct FakeRecognizer {
    transcripts: Mutex<VecDeque<String>>,
}

impl FakeRecognizer {
    pub fn new(transcripts: Vec<&str>) -> Self {
        Self {
            transcripts: Mutex::new(transcripts.into_iter().map(String::from).collect()),
        }
    }
}

#[async_trait::async_trait]
impl Recognizer for FakeRecognizer {
    async fn recognize(
        &self,
        _wav: &[u8],
        _language: &str,
    ) -> std::result::Result<String, RecognizeError> {
        self.transcripts
            .lock()
            .unwrap()
            .pop_front()
            .ok_or(RecognizeError::NoSpeechDetected)
    }
}

/// Timing profile with short delays so scenarios finish in milliseconds
pub fn fast_timing() -> TimingConfig {
    TimingConfig {
        loop_tick: Duration::from_millis(5),
        capture_window: Duration::from_millis(50),
        capture_chunk: Duration::from_millis(5),
        ready_timeout: Duration::from_millis(500),
        speech_resume_delay: Duration::from_millis(10),
        music_settle: Duration::from_millis(10),
        music_start_wait: Duration::from_millis(100),
        music_start_poll: Duration::from_millis(5),
        music_stop_poll: Duration::from_millis(5),
        music_resume_delay: Duration::from_millis(10),
        music_intro_speed: 0.9,
    }
}

/// Poll `condition` until it holds or `timeout` elapses
pub async fn wait_for<F: Fn() -> bool>(condition: F, timeout: Duration) -> bool {
    let deadline = tokio::time::Instant::now() + timeout;
    while tokio::time::Instant::now() < deadline {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(2)).await;
    }
    condition()
}
