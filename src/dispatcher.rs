//! Command dispatch and the top-level assistant loop
//!
//! One cooperative loop: listen, parse, act. The only background units of
//! concurrency are the music playback session (music plays for an
//! unbounded time and the loop must stay responsive) and the arbiter's
//! deferred resume timers.

use std::sync::Arc;

use tokio::sync::mpsc;

use crate::arbiter::{AudioMode, AudioModeArbiter, Busy, ModeGuard};
use crate::audio::RenderOptions;
use crate::automation::{
    AppControl, FileOps, MessageSender, MusicControl, NAVIGATION_PREFIX, WebSearch,
};
use crate::command::{Command, CommandParser};
use crate::config::TimingConfig;
use crate::speech::{RecognitionLoop, Speaker};
use crate::Result;

/// Greeting spoken when the loop starts
const GREETING: &str = "Hello, I am online. How can I assist you?";

/// Farewell spoken on the exit command
const FAREWELL: &str = "Shutting down. Goodbye.";

/// External collaborators the dispatcher drives
pub struct Collaborators {
    /// Application open/close
    pub apps: Arc<dyn AppControl>,
    /// Music playback start and observation
    pub music: Arc<dyn MusicControl>,
    /// Contact messaging
    pub messenger: Arc<dyn MessageSender>,
    /// Browser search
    pub search: Arc<dyn WebSearch>,
    /// Local file operations
    pub files: Arc<dyn FileOps>,
}

/// Events reported by a background playback session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    /// The player confirmed a matching track and playback began
    MusicStarted,
    /// The monitor observed playback stop
    MusicFinished,
    /// No track matched the query
    MusicNotFound,
    /// The player could not be driven at all
    MusicFailed,
}

/// Bookkeeping for one music command's intro-then-play-then-monitor
/// sequence
///
/// Owned exclusively by its spawned task; completion flows back over the
/// session channel, never through shared flags.
struct PlaybackSession {
    song: String,
    intro_spoken: bool,
    monitored: bool,
}

impl PlaybackSession {
    fn new(song: String) -> Self {
        Self {
            song,
            intro_spoken: false,
            monitored: false,
        }
    }

    /// Run the full sequence, releasing the mode guard on every path
    async fn run(
        mut self,
        guard: ModeGuard,
        arbiter: Arc<AudioModeArbiter>,
        speaker: Arc<Speaker>,
        music: Arc<dyn MusicControl>,
        timing: TimingConfig,
        events: mpsc::Sender<SessionEvent>,
    ) {
        // Intro speech shares the PlayingMusic window; a slightly slower
        // rate keeps the cloned voice from clipping
        let intro = format!("Playing {} for you.", self.song);
        let intro_opts = RenderOptions {
            speed: timing.music_intro_speed,
            ..RenderOptions::default()
        };
        match speaker.say_in_window(&intro, intro_opts).await {
            Ok(()) => self.intro_spoken = true,
            Err(e) => tracing::error!(error = %e, "music intro failed"),
        }

        // Keep the tail of the synthesized audio out of the music start
        tokio::time::sleep(timing.music_settle).await;

        match music.play(&self.song).await {
            Ok(true) => {
                let _ = events.try_send(SessionEvent::MusicStarted);
                self.monitored = true;
                monitor_playback(music.as_ref(), &timing).await;
                let _ = events.try_send(SessionEvent::MusicFinished);
            }
            Ok(false) => {
                let message =
                    format!("There is no song named {} in your library.", self.song);
                if let Err(e) = speaker.say_in_window(&message, RenderOptions::default()).await
                {
                    tracing::error!(error = %e, "music error report failed");
                }
                let _ = events.try_send(SessionEvent::MusicNotFound);
            }
            Err(e) => {
                tracing::error!(song = %self.song, error = %e, "music playback failed");
                if let Err(e) = speaker
                    .say_in_window("Sorry, I could not start the music.", RenderOptions::default())
                    .await
                {
                    tracing::error!(error = %e, "music error report failed");
                }
                let _ = events.try_send(SessionEvent::MusicFailed);
            }
        }

        tracing::debug!(
            song = %self.song,
            intro_spoken = self.intro_spoken,
            monitored = self.monitored,
            "playback session ended"
        );

        // The microphone resumes after a pause on every path
        arbiter.release_after(guard, timing.music_resume_delay);
    }
}

/// Wait (bounded) for playback to begin, then poll until it stops
async fn monitor_playback(music: &dyn MusicControl, timing: &TimingConfig) {
    let deadline = tokio::time::Instant::now() + timing.music_start_wait;
    while tokio::time::Instant::now() < deadline {
        if music.is_playing().await {
            break;
        }
        tokio::time::sleep(timing.music_start_poll).await;
    }

    while music.is_playing().await {
        tokio::time::sleep(timing.music_stop_poll).await;
    }

    tracing::info!("music playback finished");
}

/// Owns the top-level loop: listen, parse, sequence mode transitions
pub struct CommandDispatcher {
    arbiter: Arc<AudioModeArbiter>,
    speaker: Arc<Speaker>,
    recognition: RecognitionLoop,
    parser: CommandParser,
    collaborators: Collaborators,
    timing: TimingConfig,
    session_tx: mpsc::Sender<SessionEvent>,
    session_rx: mpsc::Receiver<SessionEvent>,
}

impl CommandDispatcher {
    /// Assemble the dispatcher
    #[must_use]
    pub fn new(
        arbiter: Arc<AudioModeArbiter>,
        speaker: Arc<Speaker>,
        recognition: RecognitionLoop,
        parser: CommandParser,
        collaborators: Collaborators,
        timing: TimingConfig,
    ) -> Self {
        let (session_tx, session_rx) = mpsc::channel(16);
        Self {
            arbiter,
            speaker,
            recognition,
            parser,
            collaborators,
            timing,
            session_tx,
            session_rx,
        }
    }

    /// Run until the exit command or a shutdown signal
    ///
    /// # Errors
    ///
    /// Only unrecoverable startup failures escape; all command-level
    /// errors are converted to spoken reports or logs.
    pub async fn run(&mut self, shutdown_rx: &mut mpsc::Receiver<()>) -> Result<()> {
        // A missing voice asset is reported here once, then the loop runs on
        self.report(GREETING).await;

        loop {
            tokio::select! {
                _ = shutdown_rx.recv() => {
                    tracing::info!("shutdown requested");
                    break;
                }
                () = tokio::time::sleep(self.timing.loop_tick) => {
                    self.drain_session_events();

                    let Some(utterance) = self.recognition.listen().await else {
                        continue;
                    };
                    if !self.dispatch(&utterance).await {
                        break;
                    }
                }
            }
        }

        tracing::info!("assistant stopped");
        Ok(())
    }

    /// Handle one recognized utterance; returns `false` on exit
    pub async fn dispatch(&mut self, utterance: &str) -> bool {
        let command = self.parser.parse(utterance);
        tracing::debug!(?command, "dispatching");

        match command {
            Command::Exit => {
                self.report(FAREWELL).await;
                false
            }
            Command::PlayMusic(song) => {
                self.start_playback(song);
                true
            }
            Command::OpenApp(name) => {
                // Confirmation is spoken before the side-effecting call so
                // feedback stays responsive even if the launch stalls
                self.report(&format!("Opening {name} for you.")).await;
                if let Err(e) = self.collaborators.apps.open_app(&name).await {
                    tracing::warn!(app = %name, error = %e, "open failed");
                    self.report(&format!("Sorry, I could not open {name}.")).await;
                }
                true
            }
            Command::CloseApp(name) => {
                self.report(&format!("Closing {name} for you.")).await;
                if let Err(e) = self.collaborators.apps.close_app(&name).await {
                    tracing::warn!(app = %name, error = %e, "close failed");
                    self.report(&format!("Sorry, I could not close {name}.")).await;
                }
                true
            }
            Command::SendMessage { contact, message } => {
                self.report(&format!("Sending a message to {contact}.")).await;
                if let Err(e) = self
                    .collaborators
                    .messenger
                    .send_message(&contact, &message)
                    .await
                {
                    tracing::warn!(%contact, error = %e, "send failed");
                    self.report(&format!("Sorry, I could not message {contact}."))
                        .await;
                }
                true
            }
            Command::Search(query) => {
                self.report(&format!("Searching for {query}.")).await;
                if let Err(e) = self.collaborators.search.search(&query).await {
                    tracing::warn!(%query, error = %e, "search failed");
                    self.report("Sorry, the search failed.").await;
                }
                true
            }
            Command::FileOp(request) => {
                match self.collaborators.files.perform(&request).await {
                    Ok(status) => {
                        let spoken = status.strip_prefix(NAVIGATION_PREFIX).map_or_else(
                            || format!("{status}."),
                            |path| format!("Going to {path}."),
                        );
                        self.report(&spoken).await;
                    }
                    Err(e) => {
                        tracing::warn!(%request, error = %e, "file operation failed");
                        self.report("Sorry, that file operation failed.").await;
                    }
                }
                true
            }
            Command::Unrecognized(text) => {
                if !text.is_empty() {
                    tracing::debug!(utterance = %text, "unrecognized command");
                }
                true
            }
        }
    }

    /// Spawn the music sequence as its own unit of concurrency
    ///
    /// The mode is taken *before* spawning so recognition is suppressed
    /// from this instant, not from whenever the task first runs.
    fn start_playback(&self, song: String) {
        let guard = match self.arbiter.try_enter(AudioMode::PlayingMusic) {
            Ok(guard) => guard,
            Err(Busy(mode)) => {
                tracing::debug!(%mode, %song, "music command dropped, audio busy");
                return;
            }
        };

        let session = PlaybackSession::new(song);
        let arbiter = Arc::clone(&self.arbiter);
        let speaker = Arc::clone(&self.speaker);
        let music = Arc::clone(&self.collaborators.music);
        let timing = self.timing.clone();
        let events = self.session_tx.clone();

        tokio::spawn(async move {
            session.run(guard, arbiter, speaker, music, timing, events).await;
        });
    }

    /// Non-blocking drain of playback session events
    fn drain_session_events(&mut self) {
        while let Ok(event) = self.session_rx.try_recv() {
            tracing::debug!(?event, "playback session event");
        }
    }

    /// Speak status text, logging (never propagating) failures
    async fn report(&self, text: &str) {
        if let Err(e) = self.speaker.say(text).await {
            tracing::error!(error = %e, "speech failed");
        }
    }
}
