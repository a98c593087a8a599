use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc, Mutex,
};

use tokio::time::Instant;

use super::*;

#[derive(Clone, Copy)]
enum Behavior {
    FinishAfter(Duration),
    FailImmediately,
    Never,
}

struct FakeBackend {
    behavior: Behavior,
    available: bool,
    spoken: Arc<Mutex<Vec<Utterance>>>,
    parked: Arc<Mutex<Vec<UtteranceCallback>>>,
    cancels: Arc<AtomicUsize>,
}

impl FakeBackend {
    fn new(behavior: Behavior) -> Self {
        Self {
            behavior,
            available: true,
            spoken: Arc::new(Mutex::new(Vec::new())),
            parked: Arc::new(Mutex::new(Vec::new())),
            cancels: Arc::new(AtomicUsize::new(0)),
        }
    }

    fn unavailable() -> Self {
        let mut backend = Self::new(Behavior::FailImmediately);
        backend.available = false;
        backend
    }

    fn spoken_texts(&self) -> Vec<String> {
        self.spoken
            .lock()
            .expect("spoken")
            .iter()
            .map(|utterance| utterance.text.clone())
            .collect()
    }
}

impl SpeechBackend for FakeBackend {
    fn is_available(&self) -> bool {
        self.available
    }

    fn start(&self, utterance: Utterance, done: UtteranceCallback) {
        self.spoken.lock().expect("spoken").push(utterance);
        match self.behavior {
            Behavior::FinishAfter(delay) => {
                tokio::spawn(async move {
                    tokio::time::sleep(delay).await;
                    done.finished();
                });
            }
            Behavior::FailImmediately => done.failed("synthesis-failed"),
            Behavior::Never => self.parked.lock().expect("parked").push(done),
        }
    }

    fn cancel(&self) {
        self.cancels.fetch_add(1, Ordering::SeqCst);
    }
}

#[tokio::test(start_paused = true)]
async fn speak_resolves_when_backend_finishes() {
    let engine = SpeechNarration::new(FakeBackend::new(Behavior::FinishAfter(
        Duration::from_millis(900),
    )))
    .with_rate(1.25);

    let started = Instant::now();
    engine.speak("Letra a").await.expect("speak");

    assert_eq!(started.elapsed(), Duration::from_millis(900));
    let spoken = engine.backend().spoken.lock().expect("spoken").clone();
    assert_eq!(spoken.len(), 1);
    assert_eq!(spoken[0].text, "Letra a");
    assert_eq!(spoken[0].rate, 1.25);
}

#[tokio::test(start_paused = true)]
async fn silent_backend_is_rescued_by_safety_timeout() {
    let engine = SpeechNarration::new(FakeBackend::new(Behavior::Never))
        .with_safety_timeout(Duration::from_secs(3));

    let started = Instant::now();
    engine.speak("never ends").await.expect("speak");

    assert_eq!(started.elapsed(), Duration::from_secs(3));
    assert_eq!(engine.backend().cancels.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn backend_failure_still_resolves() {
    let engine = SpeechNarration::new(FakeBackend::new(Behavior::FailImmediately));
    engine.speak("broken voice").await.expect("failure is absorbed");
    assert_eq!(engine.backend().spoken_texts(), vec!["broken voice"]);
}

#[tokio::test(start_paused = true)]
async fn stop_releases_pending_speaker_immediately() {
    let engine = Arc::new(SpeechNarration::new(FakeBackend::new(Behavior::Never)));

    let speaker = Arc::clone(&engine);
    let started = Instant::now();
    let pending = tokio::spawn(async move { speaker.speak("long phrase").await });
    tokio::task::yield_now().await;

    engine.stop();
    pending.await.expect("join").expect("speak");

    assert_eq!(started.elapsed(), Duration::ZERO);
}

#[tokio::test(start_paused = true)]
async fn disabling_narration_suppresses_speech() {
    let engine = SpeechNarration::new(FakeBackend::new(Behavior::Never));
    engine.set_enabled(false);

    engine.speak("muted").await.expect("speak");

    assert!(engine.backend().spoken_texts().is_empty());
    assert!(!engine.is_enabled());
}

#[tokio::test(start_paused = true)]
async fn unavailable_backend_resolves_without_speaking() {
    let engine = SpeechNarration::new(FakeBackend::unavailable());
    engine.speak("nobody home").await.expect("speak");
    assert!(engine.backend().spoken_texts().is_empty());
}

#[tokio::test(start_paused = true)]
async fn new_utterance_interrupts_the_previous_one() {
    let engine = Arc::new(SpeechNarration::new(FakeBackend::new(Behavior::Never)));

    let first = {
        let engine = Arc::clone(&engine);
        tokio::spawn(async move { engine.speak("first").await })
    };
    tokio::task::yield_now().await;

    let second = {
        let engine = Arc::clone(&engine);
        tokio::spawn(async move { engine.speak("second").await })
    };
    tokio::task::yield_now().await;

    first.await.expect("join").expect("first released");
    assert_eq!(engine.backend().cancels.load(Ordering::SeqCst), 1);

    engine.stop();
    second.await.expect("join").expect("second released");
    assert_eq!(engine.backend().spoken_texts(), vec!["first", "second"]);
}
