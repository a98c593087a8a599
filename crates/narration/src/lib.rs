use std::sync::{
    atomic::{AtomicU64, Ordering},
    Mutex, PoisonError,
};

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::oneshot;

pub mod remote;
pub mod speech;

pub use remote::{AudioClip, AudioSink, RemoteTtsConfig, RemoteTtsNarration};
pub use speech::{SpeechBackend, SpeechNarration, Utterance, UtteranceCallback, UtteranceEnd};

#[derive(Debug, Error)]
pub enum NarrationError {
    #[error("tts request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("tts service returned {status}: {message}")]
    Service { status: u16, message: String },
    #[error("invalid tts payload: {0}")]
    Payload(String),
    #[error("audio playback failed: {0}")]
    Playback(String),
}

/// Anything that can read a phrase aloud.
///
/// `speak` resolves once output for the phrase is over. `stop` must release
/// any caller still awaiting `speak`; implementations never leave a caller
/// pending forever.
#[async_trait]
pub trait NarrationEngine: Send + Sync {
    async fn speak(&self, text: &str) -> Result<(), NarrationError>;

    /// Like [`NarrationEngine::speak`], but silences any utterance still playing first.
    async fn speak_and_wait(&self, text: &str) -> Result<(), NarrationError> {
        self.stop();
        self.speak(text).await
    }

    fn stop(&self);

    /// Whether this engine ever produces real audio.
    fn produces_audio(&self) -> bool {
        true
    }
}

/// Engine used when no speech path is configured; every phrase is instantly "spoken".
pub struct SilentNarration;

#[async_trait]
impl NarrationEngine for SilentNarration {
    async fn speak(&self, _text: &str) -> Result<(), NarrationError> {
        Ok(())
    }

    fn stop(&self) {}

    fn produces_audio(&self) -> bool {
        false
    }
}

/// Tracks the single in-flight utterance so `stop` can release its waiter.
#[derive(Default)]
pub(crate) struct InflightSlot {
    next_id: AtomicU64,
    current: Mutex<Option<(u64, oneshot::Sender<()>)>>,
}

impl InflightSlot {
    /// Registers a new utterance. Returns its id, the release signal, and
    /// whether an earlier utterance was superseded.
    pub(crate) fn begin(&self) -> (u64, oneshot::Receiver<()>, bool) {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        let (tx, rx) = oneshot::channel();
        let previous = self
            .current
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .replace((id, tx));
        let superseded = match previous {
            Some((_, release)) => {
                let _ = release.send(());
                true
            }
            None => false,
        };
        (id, rx, superseded)
    }

    pub(crate) fn finish(&self, id: u64) {
        let mut current = self.current.lock().unwrap_or_else(PoisonError::into_inner);
        if matches!(current.as_ref(), Some((active, _)) if *active == id) {
            current.take();
        }
    }

    pub(crate) fn release(&self) -> bool {
        let taken = self
            .current
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        match taken {
            Some((_, release)) => {
                let _ = release.send(());
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
