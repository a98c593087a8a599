use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use braille_data::{BrailleTable, SymbolLookup};
use narration::{NarrationEngine, SilentNarration};
use shared::{
    Lesson, LessonCompletion, LessonError, LessonId, LessonSettings, LessonStatus, RunToken,
};
use tokio::{sync::broadcast, task::JoinHandle};
use tracing::{debug, error, info, warn};

use crate::{
    config::LessonTiming,
    progression::{MissingProgression, ProgressionSink},
    sequencer::{LessonSequencer, SequencerObserver},
    settings::{SettingsProvider, StaticSettings},
    view::LessonView,
    LessonEvent, StartOptions, StartOutcome, StartReason,
};

const EVENT_CAPACITY: usize = 64;

/// Collaborators injected into a supervisor.
pub struct LessonDependencies {
    pub view: Arc<dyn LessonView>,
    pub narration: Arc<dyn NarrationEngine>,
    pub lookup: Arc<dyn SymbolLookup>,
    pub settings: Arc<dyn SettingsProvider>,
    pub progression: Arc<dyn ProgressionSink>,
}

impl LessonDependencies {
    /// Built-in braille table, silent narration, default settings and no
    /// progression collaborator.
    pub fn new(view: Arc<dyn LessonView>) -> Self {
        Self {
            view,
            narration: Arc::new(SilentNarration),
            lookup: Arc::new(BrailleTable::new()),
            settings: Arc::new(StaticSettings(LessonSettings::default())),
            progression: Arc::new(MissingProgression),
        }
    }

    pub fn with_narration(mut self, narration: Arc<dyn NarrationEngine>) -> Self {
        self.narration = narration;
        self
    }

    pub fn with_lookup(mut self, lookup: Arc<dyn SymbolLookup>) -> Self {
        self.lookup = lookup;
        self
    }

    pub fn with_settings(mut self, settings: Arc<dyn SettingsProvider>) -> Self {
        self.settings = settings;
        self
    }

    pub fn with_progression(mut self, progression: Arc<dyn ProgressionSink>) -> Self {
        self.progression = progression;
        self
    }
}

#[derive(Default)]
struct SupervisorState {
    status: LessonStatus,
    lesson: Option<Lesson>,
    token: Option<RunToken>,
    retry_count: u32,
    watchdog: Option<JoinHandle<()>>,
}

impl SupervisorState {
    fn clear_watchdog(&mut self) {
        if let Some(watchdog) = self.watchdog.take() {
            watchdog.abort();
        }
    }
}

enum Recovery {
    Retry(Lesson, u32),
    Fail,
}

/// Owns the lesson status and the only path by which it changes.
///
/// Starts are guarded by a watchdog: a run that has not rendered its first
/// step in time is restarted from scratch while retry budget remains, then
/// surfaced as [`LessonStatus::Error`].
pub struct LessonSupervisor {
    sequencer: Arc<LessonSequencer>,
    view: Arc<dyn LessonView>,
    progression: Arc<dyn ProgressionSink>,
    timing: LessonTiming,
    state: Mutex<SupervisorState>,
    events: broadcast::Sender<LessonEvent>,
    weak_self: Weak<Self>,
}

impl LessonSupervisor {
    pub fn new(deps: LessonDependencies, timing: LessonTiming) -> Arc<Self> {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Arc::new_cyclic(|weak_self: &Weak<Self>| {
            let observer: Weak<dyn SequencerObserver> = weak_self.clone();
            let sequencer = LessonSequencer::new(
                deps.narration,
                deps.lookup,
                deps.settings,
                Arc::clone(&deps.view),
                timing.clone(),
                observer,
            );
            Self {
                sequencer,
                view: deps.view,
                progression: deps.progression,
                timing,
                state: Mutex::new(SupervisorState::default()),
                events,
                weak_self: weak_self.clone(),
            }
        })
    }

    pub fn subscribe(&self) -> broadcast::Receiver<LessonEvent> {
        self.events.subscribe()
    }

    pub fn status(&self) -> LessonStatus {
        self.state().status
    }

    pub fn current_token(&self) -> Option<RunToken> {
        self.state().token
    }

    pub fn retry_count(&self) -> u32 {
        self.state().retry_count
    }

    pub fn current_lesson(&self) -> Option<LessonId> {
        self.state().lesson.as_ref().map(|lesson| lesson.id.clone())
    }

    pub fn current_index(&self) -> usize {
        self.sequencer.current_index()
    }

    pub fn start_lesson(&self, lesson: Lesson, options: StartOptions) -> StartOutcome {
        {
            let state = self.state();
            let same_lesson = state
                .lesson
                .as_ref()
                .is_some_and(|current| current.id == lesson.id);
            if !options.force && same_lesson && state.status.is_active() {
                debug!(
                    lesson_id = %lesson.id,
                    status = %state.status,
                    reason = ?options.reason,
                    "lesson: start skipped, already active"
                );
                return StartOutcome::AlreadyActive;
            }
        }

        info!(
            lesson_id = %lesson.id,
            symbols = lesson.len(),
            reason = ?options.reason,
            force = options.force,
            "lesson: starting"
        );

        let token = match self.sequencer.prepare(lesson.clone()) {
            Ok(token) => token,
            Err(err) => {
                self.sequencer.stop();
                {
                    let mut state = self.state();
                    state.lesson = Some(lesson);
                    state.token = None;
                }
                self.fail(err.clone());
                return StartOutcome::Rejected(err);
            }
        };

        {
            let mut state = self.state();
            if !options.keep_retry {
                state.retry_count = 0;
            }
            state.lesson = Some(lesson);
            state.token = Some(token);
            self.transition(&mut state, LessonStatus::Loading, "start");
            self.arm_watchdog(&mut state, token);
        }

        self.sequencer.launch(token);
        StartOutcome::Started(token)
    }

    /// Abandons the current step and presents the next symbol; past the
    /// last symbol this finishes the lesson.
    pub fn next(&self) {
        self.sequencer.next();
    }

    /// Restarts the last lesson from its first symbol.
    pub fn repeat(&self) -> StartOutcome {
        let lesson = self.state().lesson.clone();
        match lesson {
            Some(lesson) => self.start_lesson(lesson, StartOptions::forced(StartReason::Repeat)),
            None => {
                let err = LessonError::NoLesson;
                self.fail(err.clone());
                StartOutcome::Rejected(err)
            }
        }
    }

    pub fn skip(&self) {
        self.sequencer.skip();
    }

    /// Cancels all timers and narration and returns to idle. The last lesson
    /// is kept so [`LessonSupervisor::repeat`] still works.
    pub fn stop(&self) {
        self.sequencer.stop();
        let mut state = self.state();
        state.clear_watchdog();
        state.token = None;
        self.transition(&mut state, LessonStatus::Idle, "stop");
    }

    fn state(&self) -> MutexGuard<'_, SupervisorState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn emit(&self, event: LessonEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }

    fn transition(&self, state: &mut SupervisorState, to: LessonStatus, reason: &'static str) {
        if matches!(
            to,
            LessonStatus::Ready | LessonStatus::Error | LessonStatus::Idle
        ) {
            state.clear_watchdog();
        }
        let from = state.status;
        if from == to {
            return;
        }
        state.status = to;
        info!(%from, %to, reason, "lesson: status changed");
        self.emit(LessonEvent::StatusChanged { from, to, reason });
    }

    fn arm_watchdog(&self, state: &mut SupervisorState, token: RunToken) {
        state.clear_watchdog();
        let Some(supervisor) = self.weak_self.upgrade() else {
            return;
        };
        let delay = self.timing.watchdog();
        state.watchdog = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            supervisor.watchdog_fired(token);
        }));
    }

    fn watchdog_fired(&self, token: RunToken) {
        let attempts = {
            let mut state = self.state();
            if state.token != Some(token) || state.status != LessonStatus::Loading {
                return;
            }
            // This task is finishing; keep the restart from aborting it.
            state.watchdog = None;
            state.retry_count + 1
        };
        self.recover(token, LessonError::WatchdogTimeout { attempts });
    }

    /// Restarts the run from scratch when `err` is retryable and budget
    /// remains, otherwise stops it and surfaces the error.
    fn recover(&self, token: RunToken, err: LessonError) {
        let recovery = {
            let mut state = self.state();
            if state.token != Some(token) {
                debug!(%token, error = %err, "lesson: failure from stale run ignored");
                return;
            }
            match state.lesson.clone() {
                Some(lesson)
                    if err.is_retryable() && state.retry_count < self.timing.max_retries =>
                {
                    state.retry_count += 1;
                    Recovery::Retry(lesson, state.retry_count)
                }
                _ => Recovery::Fail,
            }
        };

        match recovery {
            Recovery::Retry(lesson, attempt) => {
                warn!(
                    %token,
                    attempt,
                    max_retries = self.timing.max_retries,
                    error = %err,
                    "lesson: retrying"
                );
                self.emit(LessonEvent::Retrying { attempt });
                self.start_lesson(
                    lesson,
                    StartOptions {
                        reason: StartReason::WatchdogRetry,
                        force: true,
                        keep_retry: true,
                    },
                );
            }
            Recovery::Fail => {
                self.sequencer.stop();
                self.fail(err);
            }
        }
    }

    fn fail(&self, err: LessonError) {
        {
            let mut state = self.state();
            error!(code = ?err.code(), error = %err, "lesson: failed");
            self.transition(&mut state, LessonStatus::Error, "failure");
        }
        self.emit(LessonEvent::Failed {
            code: err.code(),
            message: err.to_string(),
        });
        self.view.show_error();
    }

    fn is_live(&self, token: RunToken) -> bool {
        self.state().token == Some(token)
    }
}

impl SequencerObserver for LessonSupervisor {
    fn step_presented(&self, token: RunToken, index: usize) {
        let mut state = self.state();
        if state.token != Some(token) || state.status != LessonStatus::Loading {
            return;
        }
        debug!(%token, index, "lesson: first step on screen");
        self.transition(&mut state, LessonStatus::Ready, "rendered");
    }

    fn step_completed(&self, token: RunToken, index: usize, is_last: bool) {
        if self.is_live(token) {
            self.emit(LessonEvent::StepCompleted { index, is_last });
        }
    }

    fn step_failed(&self, token: RunToken, err: LessonError) {
        self.recover(token, err);
    }

    fn lesson_finished(&self, token: RunToken, lesson_id: LessonId) {
        {
            let mut state = self.state();
            if state.token != Some(token) {
                debug!(%token, "lesson: finish from stale run ignored");
                return;
            }
            state.token = None;
            self.transition(&mut state, LessonStatus::Idle, "finish");
        }

        let completion = LessonCompletion {
            lesson_id,
            skip_intro: true,
        };
        self.progression.lesson_finished(completion.clone());
        self.emit(LessonEvent::Finished(completion));
    }
}

#[cfg(test)]
#[path = "tests/supervisor_tests.rs"]
mod tests;
