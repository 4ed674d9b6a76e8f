use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use baton_assistant::automation::{
    LocalFileOps, MacAppControl, MacMusicControl, SafariSearch, WhatsAppMessenger,
};
use baton_assistant::speech::{CaptureSource, MicCapture};
use baton_assistant::{
    AfplayRenderer, AudioModeArbiter, Collaborators, CommandDispatcher, CommandParser, Config,
    HttpRecognizer, RecognitionLoop, Speaker, VoiceCloneSynthesizer,
};

/// Baton - voice assistant daemon for macOS
#[derive(Parser)]
#[command(name = "baton", version, about)]
struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Test microphone input
    TestMic {
        /// Duration in seconds
        #[arg(short, long, default_value = "5")]
        duration: u64,
    },
    /// Test audio output with a sine tone
    TestSpeaker,
    /// Speak a phrase through the full synthesis pipeline
    Say {
        /// Text to speak
        #[arg(default_value = "Hello! This is a test of the speech pipeline.")]
        text: String,
    },
    /// Show how an utterance would be parsed
    Parse {
        /// Utterance to parse
        utterance: String,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => "info,baton_assistant=info",
        1 => "info,baton_assistant=debug",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("fatal: {e}");
            ExitCode::FAILURE
        }
    }
}

#[allow(clippy::future_not_send)]
async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = Config::load()?;
    tracing::debug!(?config, "loaded configuration");

    if let Some(cmd) = cli.command {
        return match cmd {
            Command::TestMic { duration } => test_mic(duration).await,
            Command::TestSpeaker => test_speaker(&config).await,
            Command::Say { text } => say(&config, &text).await,
            Command::Parse { utterance } => {
                let parser = CommandParser::new(&config.voice.exit_phrase);
                println!("{:?}", parser.parse(&utterance));
                Ok(())
            }
        };
    }

    probe_external_tools(&config);

    let arbiter = AudioModeArbiter::new();

    let synthesizer = Arc::new(VoiceCloneSynthesizer::new(&config.voice));
    let renderer = Arc::new(AfplayRenderer::new(config.player.clone()));
    let speaker = Arc::new(Speaker::new(
        Arc::clone(&arbiter),
        synthesizer,
        renderer,
        &config.voice.scratch_path,
        &config.timing,
    ));

    let recognizer = Arc::new(HttpRecognizer::from_config(&config.recognition)?);
    let capture = Box::new(MicCapture::new()?);
    let recognition = RecognitionLoop::new(
        Arc::clone(&arbiter),
        capture,
        recognizer,
        config.recognition.language.clone(),
        &config.timing,
    );

    let collaborators = Collaborators {
        apps: Arc::new(MacAppControl),
        music: Arc::new(MacMusicControl),
        messenger: Arc::new(WhatsAppMessenger::default()),
        search: Arc::new(SafariSearch),
        files: Arc::new(LocalFileOps::default()),
    };

    let parser = CommandParser::new(&config.voice.exit_phrase);
    let mut dispatcher = CommandDispatcher::new(
        arbiter,
        speaker,
        recognition,
        parser,
        collaborators,
        config.timing.clone(),
    );

    // Shutdown on ctrl-c
    let (shutdown_tx, mut shutdown_rx) = tokio::sync::mpsc::channel::<()>(1);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            let _ = shutdown_tx.send(()).await;
        }
    });

    tracing::info!(
        exit_phrase = %config.voice.exit_phrase,
        "baton ready - say the exit phrase to stop"
    );

    dispatcher.run(&mut shutdown_rx).await?;
    Ok(())
}

/// Warn about missing external tools; absence is reported, not fatal
fn probe_external_tools(config: &Config) {
    for program in [
        config.player.program.as_str(),
        config.voice.engine_program.as_str(),
        "osascript",
        "open",
    ] {
        if which::which(program).is_err() {
            tracing::warn!(program, "external tool not found on PATH");
        }
    }

    if !config.voice.reference_voice.exists() {
        tracing::warn!(
            path = %config.voice.reference_voice.display(),
            "reference voice sample missing - speech will fail until provided"
        );
    }
}

/// Test microphone input
async fn test_mic(duration: u64) -> anyhow::Result<()> {
    println!("Testing microphone for {duration} seconds...");
    println!("Speak into your microphone!\n");

    let mut capture = MicCapture::new()?;
    capture.start()?;

    for i in 0..duration {
        tokio::time::sleep(Duration::from_secs(1)).await;

        let samples = capture.take_samples();
        let energy = calculate_rms(&samples);
        let peak = samples.iter().map(|s| s.abs()).fold(0.0f32, f32::max);

        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let meter_len = (energy * 100.0).min(50.0) as usize;
        let meter: String = "#".repeat(meter_len) + &" ".repeat(50 - meter_len);

        println!("[{:2}s] RMS: {energy:.4} | Peak: {peak:.4} | [{meter}]", i + 1);
    }

    capture.stop();

    println!("\n---");
    println!("If you saw movement in the meter, your mic is working.");
    Ok(())
}

/// Calculate RMS energy
#[allow(clippy::cast_precision_loss)]
fn calculate_rms(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum_squares: f32 = samples.iter().map(|s| s * s).sum();
    (sum_squares / samples.len() as f32).sqrt()
}

/// Test audio output by rendering a sine tone through the player
async fn test_speaker(config: &Config) -> anyhow::Result<()> {
    use baton_assistant::Renderer;

    println!("Testing speaker output...");
    println!("You should hear a 440Hz tone for 2 seconds\n");

    let sample_rate = 24000u32;
    let frequency = 440.0f32;
    #[allow(clippy::cast_precision_loss)]
    let samples: Vec<f32> = (0..sample_rate * 2)
        .map(|i| {
            let t = i as f32 / sample_rate as f32;
            (2.0 * std::f32::consts::PI * frequency * t).sin() * 0.3
        })
        .collect();

    let wav = baton_assistant::speech::samples_to_wav(&samples, sample_rate)?;
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("tone.wav");
    std::fs::write(&path, wav)?;

    let renderer = AfplayRenderer::new(config.player.clone());
    renderer
        .render(&path, baton_assistant::RenderOptions::default())
        .await?;

    println!("\n---");
    println!("If you heard the tone, your speakers are working.");
    Ok(())
}

/// Speak text through the full synthesize, wait-ready, render pipeline
async fn say(config: &Config, text: &str) -> anyhow::Result<()> {
    println!("Speaking: \"{text}\"\n");

    let arbiter = AudioModeArbiter::new();
    let synthesizer = Arc::new(VoiceCloneSynthesizer::new(&config.voice));
    let renderer = Arc::new(AfplayRenderer::new(config.player.clone()));
    let speaker = Speaker::new(
        arbiter,
        synthesizer,
        renderer,
        &config.voice.scratch_path,
        &config.timing,
    );

    speaker.say(text).await?;

    println!("Done.");
    Ok(())
}
