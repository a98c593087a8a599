//! Letter-by-letter lesson walkthrough.
//!
//! Every rendered step captures the run token and the step epoch it was
//! launched under. All of its effects go through a [`StepGuard`], which
//! compares both against the live values under the state lock. `stop`,
//! `next`, `finish` and a new `prepare` bump the epoch and abort the
//! in-flight tasks, so a superseded continuation can never touch the view.

use std::{
    any::Any,
    panic::AssertUnwindSafe,
    sync::{Arc, Mutex, MutexGuard, PoisonError, Weak},
};

use braille_data::SymbolLookup;
use futures::FutureExt;
use narration::NarrationEngine;
use shared::{Lesson, LessonError, LessonId, RunToken};
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use crate::{
    config::LessonTiming,
    pacer::{PaceOutcome, StepPacer},
    plan::{self, NarrationPhase, StepAction},
    settings::SettingsProvider,
    view::{AdvanceLabel, DotState, LessonView, ViewError},
};

/// Receives step lifecycle notifications. Hooks are never called with the
/// sequencer's state lock held, so they may call back into the sequencer.
pub trait SequencerObserver: Send + Sync {
    fn step_presented(&self, token: RunToken, index: usize);
    fn step_completed(&self, token: RunToken, index: usize, is_last: bool);
    fn step_failed(&self, token: RunToken, error: LessonError);
    fn lesson_finished(&self, token: RunToken, lesson_id: LessonId);
}

#[derive(Default)]
struct SequencerState {
    lesson: Option<Lesson>,
    index: usize,
    token: RunToken,
    epoch: u64,
    render_task: Option<JoinHandle<()>>,
    auto_advance: Option<JoinHandle<()>>,
}

impl SequencerState {
    fn invalidate(&mut self) {
        self.epoch += 1;
        if let Some(task) = self.render_task.take() {
            task.abort();
        }
        if let Some(task) = self.auto_advance.take() {
            task.abort();
        }
    }

    fn is_current(&self, token: RunToken, epoch: u64) -> bool {
        self.token == token && self.epoch == epoch
    }
}

pub struct LessonSequencer {
    pacer: StepPacer,
    lookup: Arc<dyn SymbolLookup>,
    settings: Arc<dyn SettingsProvider>,
    view: Arc<dyn LessonView>,
    timing: LessonTiming,
    observer: Weak<dyn SequencerObserver>,
    state: Mutex<SequencerState>,
}

impl LessonSequencer {
    pub fn new(
        engine: Arc<dyn NarrationEngine>,
        lookup: Arc<dyn SymbolLookup>,
        settings: Arc<dyn SettingsProvider>,
        view: Arc<dyn LessonView>,
        timing: LessonTiming,
        observer: Weak<dyn SequencerObserver>,
    ) -> Arc<Self> {
        Arc::new(Self {
            pacer: StepPacer::new(engine, timing.pacing.clone())
                .with_speech_ceiling(timing.step_ceiling()),
            lookup,
            settings,
            view,
            timing,
            observer,
            state: Mutex::new(SequencerState::default()),
        })
    }

    /// Validates `lesson`, discards any previous run and mints a new token.
    /// Clears the view but renders nothing until [`LessonSequencer::launch`].
    pub fn prepare(&self, lesson: Lesson) -> Result<RunToken, LessonError> {
        plan::validate_lesson(&lesson, self.lookup.as_ref())?;
        let total = lesson.len();

        let token = {
            let mut state = self.state();
            state.invalidate();
            state.token = state.token.next();
            state.index = 0;
            state.lesson = Some(lesson);
            state.token
        };
        self.pacer.halt();

        self.guarded(|view| -> Result<(), ViewError> {
            view.reset();
            view.setup_progress(total)?;
            view.clear_dots();
            Ok(())
        })?
        .map_err(|err| LessonError::SetupFailed(err.to_string()))?;
        debug!(%token, total, "lesson: run prepared");
        Ok(token)
    }

    /// Starts rendering the current step of a prepared run.
    pub fn launch(self: &Arc<Self>, token: RunToken) {
        let (epoch, index) = {
            let state = self.state();
            if state.token != token || state.lesson.is_none() {
                debug!(%token, "lesson: launch ignored for stale run");
                return;
            }
            (state.epoch, state.index)
        };
        self.spawn_step(token, epoch, index);
    }

    pub fn start(self: &Arc<Self>, lesson: Lesson) -> Result<RunToken, LessonError> {
        let token = self.prepare(lesson)?;
        self.launch(token);
        Ok(token)
    }

    /// Abandons the current step and renders the following one, or finishes
    /// the lesson when the current step was the last.
    pub fn next(self: &Arc<Self>) {
        self.advance(None);
    }

    /// Moves to the following step. With `expected` set, only advances if
    /// that run and epoch are still current, checked under the same lock
    /// that bumps the index.
    fn advance(self: &Arc<Self>, expected: Option<(RunToken, u64)>) {
        let (token, upcoming) = {
            let mut state = self.state();
            if let Some((token, epoch)) = expected {
                if !state.is_current(token, epoch) {
                    return;
                }
                // Detach ourselves so invalidation does not abort the running task.
                state.auto_advance.take();
            }
            let Some(total) = state.lesson.as_ref().map(Lesson::len) else {
                debug!("lesson: next ignored, nothing running");
                return;
            };
            state.invalidate();
            state.index += 1;
            let upcoming = (state.index < total).then_some((state.epoch, state.index));
            (state.token, upcoming)
        };
        self.pacer.halt();
        if let Err(err) = self.guarded(|view| view.clear_dots()) {
            error!(%token, error = %err, "lesson: clearing the cell failed");
            self.notify(|observer| observer.step_failed(token, err));
            return;
        }

        match upcoming {
            Some((epoch, index)) => {
                debug!(%token, index, "lesson: advancing");
                self.spawn_step(token, epoch, index);
            }
            None => self.finish(),
        }
    }

    pub fn skip(&self) {
        debug!("lesson: skipping remaining symbols");
        self.finish();
    }

    /// Terminal. Reports completion at most once per run.
    pub fn finish(&self) {
        let finished = {
            let mut state = self.state();
            state.invalidate();
            let token = state.token;
            state.lesson.take().map(|lesson| (token, lesson.id))
        };
        self.pacer.halt();

        match finished {
            Some((token, lesson_id)) => {
                info!(%token, %lesson_id, "lesson: walkthrough finished");
                self.notify(|observer| observer.lesson_finished(token, lesson_id));
            }
            None => debug!("lesson: finish ignored, nothing running"),
        }
    }

    /// Cancels every timer and utterance and discards the walkthrough state.
    /// Mints no new token.
    pub fn stop(&self) {
        {
            let mut state = self.state();
            state.invalidate();
            state.lesson = None;
        }
        self.pacer.halt();
    }

    pub fn current_token(&self) -> RunToken {
        self.state().token
    }

    pub fn current_index(&self) -> usize {
        self.state().index
    }

    pub fn is_running(&self) -> bool {
        self.state().lesson.is_some()
    }

    fn state(&self) -> MutexGuard<'_, SequencerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Runs synchronous view effects outside a step task, turning a panic
    /// into [`LessonError::StepPanicked`].
    fn guarded<T>(&self, effect: impl FnOnce(&dyn LessonView) -> T) -> Result<T, LessonError> {
        std::panic::catch_unwind(AssertUnwindSafe(|| effect(self.view.as_ref())))
            .map_err(|panic| LessonError::StepPanicked(panic_message(panic.as_ref())))
    }

    fn notify(&self, hook: impl FnOnce(&dyn SequencerObserver)) {
        if let Some(observer) = self.observer.upgrade() {
            hook(observer.as_ref());
        }
    }

    fn spawn_step(self: &Arc<Self>, token: RunToken, epoch: u64, index: usize) {
        let sequencer = Arc::clone(self);
        let task = tokio::spawn(async move {
            sequencer.run_step(token, epoch, index).await;
        });

        let mut state = self.state();
        if state.is_current(token, epoch) {
            if let Some(previous) = state.render_task.replace(task) {
                previous.abort();
            }
        } else {
            task.abort();
        }
    }

    async fn run_step(self: Arc<Self>, token: RunToken, epoch: u64, index: usize) {
        let guard = StepGuard {
            sequencer: &self,
            token,
            epoch,
            index,
        };

        let result = match AssertUnwindSafe(self.render(&guard)).catch_unwind().await {
            Ok(result) => result,
            Err(panic) => Err(StepAbort::Failed(LessonError::StepPanicked(panic_message(
                panic.as_ref(),
            )))),
        };

        match result {
            Ok(is_last) => {
                if guard.check().is_err() {
                    return;
                }
                debug!(%token, index, is_last, "lesson: step complete");
                self.notify(|observer| observer.step_completed(token, index, is_last));
                if !is_last {
                    self.arm_auto_advance(token, epoch);
                }
            }
            Err(StepAbort::Stale) => {
                debug!(%token, index, "lesson: stale step discarded");
            }
            Err(StepAbort::Failed(err)) => {
                if guard.check().is_err() {
                    debug!(%token, index, error = %err, "lesson: failure from stale step ignored");
                    return;
                }
                error!(%token, index, error = %err, "lesson: step failed");
                self.notify(|observer| observer.step_failed(token, err));
            }
        }
    }

    async fn render(&self, guard: &StepGuard<'_>) -> Result<bool, StepAbort> {
        let lesson = guard.lesson()?;
        let plan = plan::plan_step(&lesson, guard.index, self.lookup.as_ref(), &self.timing)?;

        self.view.mount(plan.layout()).await.map_err(|err| match err {
            ViewError::MissingTarget(target) => LessonError::MissingTarget(target),
            ViewError::Setup(message) => LessonError::SetupFailed(message),
        })?;
        guard.check()?;
        self.notify(|observer| observer.step_presented(guard.token, guard.index));

        debug!(
            token = %guard.token,
            index = guard.index,
            symbol = %plan.symbol,
            two_cell = plan.presentation.is_two_cell(),
            "lesson: rendering step"
        );
        guard.apply(|view| {
            view.clear_dots();
            view.show_symbol(plan.symbol);
            view.show_progress(plan.index, plan.total);
        })?;

        for action in &plan.actions {
            self.perform(guard, action).await?;
        }

        let label = if plan.is_last() {
            AdvanceLabel::StartPractice
        } else {
            AdvanceLabel::Next
        };
        guard.apply(|view| view.show_advance_label(label))?;
        Ok(plan.is_last())
    }

    async fn perform(&self, guard: &StepGuard<'_>, action: &StepAction) -> Result<(), StepAbort> {
        match action {
            StepAction::Message(text) => guard.apply(|view| view.show_message(text)),
            StepAction::Say { text, phase } => self.narrate(guard, text, *phase).await,
            StepAction::Pause(duration) => guard.hold(*duration).await,
            StepAction::Highlight { slot, dot } => {
                guard.apply(|view| view.set_dot(*slot, *dot, DotState::Animating))
            }
            StepAction::Fill { slot, dot } => {
                guard.apply(|view| view.set_dot(*slot, *dot, DotState::Filled))
            }
            StepAction::Tap => guard.apply(|view| view.haptic_tap()),
        }
    }

    async fn narrate(
        &self,
        guard: &StepGuard<'_>,
        text: &str,
        phase: NarrationPhase,
    ) -> Result<(), StepAbort> {
        guard.check()?;
        let settings = self.settings.current();
        let outcome = self
            .pacer
            .pace(
                text,
                settings.narration_mode.narrates(),
                settings.effective_speed(),
            )
            .await;
        if outcome == PaceOutcome::Cancelled {
            debug!(index = guard.index, ?phase, "lesson: narration cancelled");
        }
        guard.check()
    }

    fn arm_auto_advance(self: &Arc<Self>, token: RunToken, epoch: u64) {
        let sequencer = Arc::clone(self);
        let delay = self.timing.auto_advance();
        let task = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            debug!(%token, "lesson: auto-advance due");
            sequencer.advance(Some((token, epoch)));
        });

        let mut state = self.state();
        if state.is_current(token, epoch) {
            if let Some(previous) = state.auto_advance.replace(task) {
                previous.abort();
            }
        } else {
            task.abort();
        }
    }
}

enum StepAbort {
    Stale,
    Failed(LessonError),
}

impl From<LessonError> for StepAbort {
    fn from(err: LessonError) -> Self {
        Self::Failed(err)
    }
}

/// The one place that decides whether a step may still act.
struct StepGuard<'a> {
    sequencer: &'a LessonSequencer,
    token: RunToken,
    epoch: u64,
    index: usize,
}

impl StepGuard<'_> {
    fn check(&self) -> Result<(), StepAbort> {
        if self.sequencer.state().is_current(self.token, self.epoch) {
            Ok(())
        } else {
            Err(StepAbort::Stale)
        }
    }

    fn lesson(&self) -> Result<Lesson, StepAbort> {
        let state = self.sequencer.state();
        if !state.is_current(self.token, self.epoch) {
            return Err(StepAbort::Stale);
        }
        state.lesson.clone().ok_or(StepAbort::Stale)
    }

    /// Runs `effect` only if the step is still current, under the state
    /// lock so no invalidation can interleave.
    fn apply(&self, effect: impl FnOnce(&dyn LessonView)) -> Result<(), StepAbort> {
        let state = self.sequencer.state();
        if !state.is_current(self.token, self.epoch) {
            return Err(StepAbort::Stale);
        }
        effect(self.sequencer.view.as_ref());
        drop(state);
        Ok(())
    }

    async fn hold(&self, duration: std::time::Duration) -> Result<(), StepAbort> {
        tokio::time::sleep(duration).await;
        self.check()
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
#[path = "tests/sequencer_tests.rs"]
mod tests;
