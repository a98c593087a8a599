//! Local, callback-driven speech synthesis.
//!
//! Platform synthesizers report completion through callbacks that are not
//! guaranteed to fire. [`SpeechNarration`] turns that into the awaitable
//! [`NarrationEngine`] contract and enforces a safety timeout.

use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Mutex, PoisonError,
    },
    time::Duration,
};

use async_trait::async_trait;
use tokio::sync::oneshot;
use tracing::{debug, warn};

use crate::{InflightSlot, NarrationEngine, NarrationError};

pub const DEFAULT_SAFETY_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, PartialEq)]
pub struct Utterance {
    pub id: u64,
    pub text: String,
    pub rate: f32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UtteranceEnd {
    Finished,
    Failed(String),
}

/// Handed to the backend with each utterance; consumed on completion or error.
pub struct UtteranceCallback {
    tx: oneshot::Sender<UtteranceEnd>,
}

impl UtteranceCallback {
    pub fn finished(self) {
        let _ = self.tx.send(UtteranceEnd::Finished);
    }

    pub fn failed(self, reason: impl Into<String>) {
        let _ = self.tx.send(UtteranceEnd::Failed(reason.into()));
    }
}

pub trait SpeechBackend: Send + Sync {
    fn is_available(&self) -> bool {
        true
    }

    fn start(&self, utterance: Utterance, done: UtteranceCallback);

    fn cancel(&self);
}

pub struct SpeechNarration<B: SpeechBackend> {
    backend: B,
    enabled: AtomicBool,
    rate: Mutex<f32>,
    safety_timeout: Duration,
    inflight: InflightSlot,
}

impl<B: SpeechBackend> SpeechNarration<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            enabled: AtomicBool::new(true),
            rate: Mutex::new(1.0),
            safety_timeout: DEFAULT_SAFETY_TIMEOUT,
            inflight: InflightSlot::default(),
        }
    }

    pub fn with_safety_timeout(mut self, safety_timeout: Duration) -> Self {
        self.safety_timeout = safety_timeout;
        self
    }

    pub fn with_rate(self, rate: f32) -> Self {
        self.set_rate(rate);
        self
    }

    pub fn set_rate(&self, rate: f32) {
        *self.rate.lock().unwrap_or_else(PoisonError::into_inner) = rate;
    }

    /// Turning narration off silences the current utterance immediately.
    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::SeqCst);
        if !enabled {
            self.stop();
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }
}

#[async_trait]
impl<B: SpeechBackend> NarrationEngine for SpeechNarration<B> {
    async fn speak(&self, text: &str) -> Result<(), NarrationError> {
        if !self.is_enabled() {
            debug!("narration: suppressed, lesson audio disabled");
            return Ok(());
        }
        if !self.backend.is_available() {
            debug!("narration: speech backend unavailable");
            return Ok(());
        }

        let (id, released, superseded) = self.inflight.begin();
        if superseded {
            self.backend.cancel();
        }

        let rate = *self.rate.lock().unwrap_or_else(PoisonError::into_inner);
        let (tx, done) = oneshot::channel();
        self.backend.start(
            Utterance {
                id,
                text: text.to_string(),
                rate,
            },
            UtteranceCallback { tx },
        );

        tokio::select! {
            end = done => match end {
                Ok(UtteranceEnd::Finished) => {}
                Ok(UtteranceEnd::Failed(reason)) => {
                    warn!(utterance = id, %reason, "narration: utterance failed");
                }
                Err(_) => {
                    debug!(utterance = id, "narration: backend dropped completion callback");
                }
            },
            _ = released => {
                debug!(utterance = id, "narration: utterance released by stop");
            }
            _ = tokio::time::sleep(self.safety_timeout) => {
                warn!(
                    utterance = id,
                    timeout_ms = self.safety_timeout.as_millis() as u64,
                    "narration: backend never signalled completion"
                );
                self.backend.cancel();
            }
        }

        self.inflight.finish(id);
        Ok(())
    }

    fn stop(&self) {
        self.backend.cancel();
        self.inflight.release();
    }
}

#[cfg(test)]
#[path = "tests/speech_tests.rs"]
mod tests;
