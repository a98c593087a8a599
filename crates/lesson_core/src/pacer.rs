use std::{
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc, Mutex, PoisonError,
    },
    time::Duration,
};

use narration::NarrationEngine;
use tokio::{sync::oneshot, time::Instant};
use tracing::{debug, warn};

use crate::config::PacingConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaceOutcome {
    Completed,
    /// Superseded by a newer `pace` or cleared by `cancel`.
    Cancelled,
}

/// Deterministic on-screen duration of a phrase, independent of real speech.
pub fn estimate_duration(text: &str, pacing: &PacingConfig, speed: f32) -> Duration {
    let speed = if speed.is_finite() && speed > 0.0 {
        speed
    } else {
        1.0
    };
    let words_per_minute = f64::from(pacing.base_wpm) / f64::from(speed);
    let words = text.split_whitespace().count().max(1);
    let spoken_ms = (words as f64 / words_per_minute * 60_000.0).round() as u64;

    let commas = text.matches(',').count() as u64;
    let stops = text
        .chars()
        .filter(|ch| matches!(ch, '.' | '!' | '?'))
        .count() as u64;

    let total_ms =
        spoken_ms + commas * pacing.comma_pause_ms + stops * pacing.sentence_pause_ms;
    Duration::from_millis(total_ms.max(pacing.min_duration_ms))
}

struct PendingTimer {
    generation: u64,
    // Dropping the sender wakes the waiter as cancelled.
    _release: oneshot::Sender<()>,
}

/// Paces narrated phrases so every step takes at least its estimated duration.
///
/// Owns a single cancelable timer. A new `pace` or a `cancel` bumps the
/// generation; a superseded call never arms a timer and resolves as
/// [`PaceOutcome::Cancelled`].
pub struct StepPacer {
    engine: Arc<dyn NarrationEngine>,
    pacing: PacingConfig,
    speech_ceiling: Option<Duration>,
    generation: AtomicU64,
    pending: Mutex<Option<PendingTimer>>,
}

impl StepPacer {
    pub fn new(engine: Arc<dyn NarrationEngine>, pacing: PacingConfig) -> Self {
        Self {
            engine,
            pacing,
            speech_ceiling: None,
            generation: AtomicU64::new(0),
            pending: Mutex::new(None),
        }
    }

    /// Caps how long a single utterance may hold the step. Silent pacing is
    /// never cut short.
    pub fn with_speech_ceiling(mut self, ceiling: Duration) -> Self {
        self.speech_ceiling = Some(ceiling);
        self
    }

    pub fn estimate(&self, text: &str, speed: f32) -> Duration {
        estimate_duration(text, &self.pacing, speed)
    }

    pub async fn pace(&self, text: &str, narrate: bool, speed: f32) -> PaceOutcome {
        let generation = self.supersede();
        let estimated = self.estimate(text, speed);
        debug!(
            text = %preview(text),
            narrate,
            estimated_ms = estimated.as_millis() as u64,
            "pacer: pace"
        );

        let remaining = if narrate && self.engine.produces_audio() {
            let started = Instant::now();
            self.speak(text).await;
            if !self.is_current(generation) {
                return PaceOutcome::Cancelled;
            }
            estimated.saturating_sub(started.elapsed())
        } else {
            estimated
        };

        if remaining.is_zero() {
            return PaceOutcome::Completed;
        }
        self.wait(generation, remaining).await
    }

    /// Clears the pending timer; its waiter resolves as cancelled.
    pub fn cancel(&self) {
        self.supersede();
    }

    /// Cancels pacing and silences the narration engine.
    pub fn halt(&self) {
        self.cancel();
        self.engine.stop();
    }

    pub fn has_pending_timer(&self) -> bool {
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    async fn speak(&self, text: &str) {
        let speaking = self.engine.speak_and_wait(text);
        let result = match self.speech_ceiling {
            Some(ceiling) => match tokio::time::timeout(ceiling, speaking).await {
                Ok(result) => result,
                Err(_) => {
                    warn!(
                        ceiling_ms = ceiling.as_millis() as u64,
                        "pacer: narration exceeded step ceiling, continuing"
                    );
                    self.engine.stop();
                    return;
                }
            },
            None => speaking.await,
        };
        if let Err(err) = result {
            warn!(error = %err, "pacer: narration failed, pacing silently");
            self.engine.stop();
        }
    }

    fn supersede(&self) -> u64 {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        generation
    }

    fn is_current(&self, generation: u64) -> bool {
        self.generation.load(Ordering::SeqCst) == generation
    }

    async fn wait(&self, generation: u64, duration: Duration) -> PaceOutcome {
        let (release, released) = oneshot::channel();
        {
            let mut pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
            if !self.is_current(generation) {
                return PaceOutcome::Cancelled;
            }
            *pending = Some(PendingTimer {
                generation,
                _release: release,
            });
        }

        let outcome = tokio::select! {
            _ = tokio::time::sleep(duration) => PaceOutcome::Completed,
            _ = released => PaceOutcome::Cancelled,
        };

        let mut pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
        if pending
            .as_ref()
            .is_some_and(|timer| timer.generation == generation)
        {
            pending.take();
        }
        outcome
    }
}

fn preview(text: &str) -> String {
    text.chars().take(40).collect()
}

#[cfg(test)]
#[path = "tests/pacer_tests.rs"]
mod tests;
