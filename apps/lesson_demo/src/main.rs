use std::{path::PathBuf, sync::Arc, time::Duration};

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use braille_data::BrailleTable;
use clap::{Parser, ValueEnum};
use lesson_core::{
    load_timing, AdvanceLabel, CellLayout, DotState, LessonDependencies, LessonEvent,
    LessonSupervisor, LessonView, ProgressionSink, SharedSettings, StartOptions, StartOutcome,
    ViewError,
};
use narration::{
    AudioClip, AudioSink, NarrationEngine, RemoteTtsConfig, RemoteTtsNarration, SpeechBackend,
    SpeechNarration, Utterance, UtteranceCallback,
};
use shared::{CellSlot, Dot, Lesson, LessonCompletion, LessonSettings, NarrationMode, Symbol};
use tokio_stream::{wrappers::BroadcastStream, StreamExt};
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Mode {
    ScreenReader,
    LessonAudio,
    None,
}

impl From<Mode> for NarrationMode {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::ScreenReader => NarrationMode::ScreenReader,
            Mode::LessonAudio => NarrationMode::LessonAudio,
            Mode::None => NarrationMode::None,
        }
    }
}

#[derive(Parser, Debug)]
struct Args {
    #[arg(long, default_value = "demo")]
    lesson_id: String,
    /// Symbols to teach, one per character.
    #[arg(long, default_value = "aA7")]
    letters: String,
    #[arg(long, value_enum, default_value_t = Mode::LessonAudio)]
    mode: Mode,
    #[arg(long, default_value_t = 1.0)]
    speed: f32,
    /// TOML file with lesson timing overrides.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Speech synthesis endpoint; console speech is used when unset or failing.
    #[arg(long)]
    tts_endpoint: Option<String>,
}

struct ConsoleView;

#[async_trait]
impl LessonView for ConsoleView {
    async fn mount(&self, layout: CellLayout) -> Result<(), ViewError> {
        println!("[view] cells: {layout:?}");
        Ok(())
    }

    fn reset(&self) {
        println!("[view] reset");
    }

    fn setup_progress(&self, total: usize) -> Result<(), ViewError> {
        println!("[view] progress 0/{total}");
        Ok(())
    }

    fn show_progress(&self, index: usize, total: usize) {
        println!("[view] progress {}/{total}", index + 1);
    }

    fn show_symbol(&self, symbol: Symbol) {
        println!("[view] symbol {symbol}");
    }

    fn show_message(&self, text: &str) {
        println!("[view] \"{text}\"");
    }

    fn set_dot(&self, slot: CellSlot, dot: Dot, state: DotState) {
        println!("[view] {slot:?} dot {dot} {state:?}");
    }

    fn clear_dots(&self) {
        println!("[view] clear dots");
    }

    fn show_advance_label(&self, label: AdvanceLabel) {
        println!("[view] advance: {label:?}");
    }

    fn show_error(&self) {
        println!("[view] something went wrong, press repeat to retry");
    }
}

/// Prints each utterance and reports completion after a reading-speed delay.
struct ConsoleSpeech;

impl SpeechBackend for ConsoleSpeech {
    fn start(&self, utterance: Utterance, done: UtteranceCallback) {
        println!("[say] {}", utterance.text);
        let words = utterance.text.split_whitespace().count().max(1) as f32;
        let rate = if utterance.rate > 0.0 { utterance.rate } else { 1.0 };
        let duration = Duration::from_secs_f32(words * 0.3 / rate);
        tokio::spawn(async move {
            tokio::time::sleep(duration).await;
            done.finished();
        });
    }

    fn cancel(&self) {
        debug!("console speech cancelled");
    }
}

/// Stands in for an audio device.
struct ConsoleSink;

#[async_trait]
impl AudioSink for ConsoleSink {
    async fn play(&self, clip: AudioClip) -> Result<()> {
        println!("[audio] {} bytes of {}", clip.bytes.len(), clip.format);
        tokio::time::sleep(Duration::from_millis(600)).await;
        Ok(())
    }

    fn halt(&self) {}
}

struct ConsoleProgression;

impl ProgressionSink for ConsoleProgression {
    fn lesson_finished(&self, completion: LessonCompletion) {
        println!(
            "[game] lesson {} complete, resuming without intro: {}",
            completion.lesson_id, completion.skip_intro
        );
    }
}

fn narration_engine(args: &Args) -> Result<Arc<dyn NarrationEngine>> {
    let speech: Arc<dyn NarrationEngine> =
        Arc::new(SpeechNarration::new(ConsoleSpeech).with_rate(args.speed));
    let Some(endpoint) = &args.tts_endpoint else {
        return Ok(speech);
    };
    let config = RemoteTtsConfig::parse(endpoint)
        .with_context(|| format!("invalid tts endpoint '{endpoint}'"))?;
    Ok(Arc::new(
        RemoteTtsNarration::new(config, ConsoleSink).with_fallback(speech),
    ))
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();
    let args = Args::parse();

    let timing = load_timing(args.config.as_deref())?;
    let settings = Arc::new(SharedSettings::new(LessonSettings {
        narration_mode: args.mode.into(),
        playback_speed: args.speed,
    }));
    let deps = LessonDependencies::new(Arc::new(ConsoleView))
        .with_narration(narration_engine(&args)?)
        .with_lookup(Arc::new(BrailleTable::new()))
        .with_settings(settings)
        .with_progression(Arc::new(ConsoleProgression));
    let supervisor = LessonSupervisor::new(deps, timing);

    let mut events = BroadcastStream::new(supervisor.subscribe());
    let lesson = Lesson::from_chars(args.lesson_id.as_str(), &args.letters);
    match supervisor.start_lesson(lesson, StartOptions::default()) {
        StartOutcome::Started(token) => info!(%token, "demo: lesson started"),
        StartOutcome::AlreadyActive => info!("demo: lesson already running"),
        StartOutcome::Rejected(err) => bail!("lesson rejected: {err}"),
    }

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("demo: interrupted");
                supervisor.stop();
                break;
            }
            event = events.next() => match event {
                Some(Ok(LessonEvent::StepCompleted { is_last: true, .. })) => {
                    // Stand in for the user pressing "start practice".
                    supervisor.next();
                }
                Some(Ok(LessonEvent::Finished(_))) => break,
                Some(Ok(LessonEvent::Failed { code, message })) => {
                    bail!("lesson failed ({code:?}): {message}");
                }
                Some(Ok(event)) => debug!(?event, "demo: lesson event"),
                Some(Err(err)) => warn!(error = %err, "demo: missed lesson events"),
                None => break,
            },
        }
    }

    Ok(())
}
