//! Narrated, animated braille lesson walkthroughs.
//!
//! [`LessonSupervisor`] is the entry point. It owns a [`LessonSequencer`],
//! which owns a [`StepPacer`], which drives the injected narration engine.

use shared::{ErrorCode, LessonCompletion, LessonError, LessonStatus, RunToken};

pub mod config;
pub mod pacer;
pub mod plan;
pub mod progression;
pub mod sequencer;
pub mod settings;
pub mod supervisor;
pub mod view;

pub use config::{load_timing, ConfigError, LessonTiming, PacingConfig};
pub use pacer::{estimate_duration, PaceOutcome, StepPacer};
pub use plan::{plan_step, NarrationPhase, StepAction, StepPlan};
pub use progression::{MissingProgression, ProgressionSink};
pub use sequencer::{LessonSequencer, SequencerObserver};
pub use settings::{SettingsProvider, SharedSettings, StaticSettings};
pub use supervisor::{LessonDependencies, LessonSupervisor};
pub use view::{AdvanceLabel, CellLayout, DotState, LessonView, ViewError};

/// Why a lesson (re)start was requested. Logged only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StartReason {
    #[default]
    Auto,
    Navigation,
    Repeat,
    WatchdogRetry,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StartOptions {
    pub reason: StartReason,
    /// Restart even if the same lesson is already loading or ready.
    pub force: bool,
    /// Keep the watchdog retry counter instead of resetting it.
    pub keep_retry: bool,
}

impl StartOptions {
    pub fn forced(reason: StartReason) -> Self {
        Self {
            reason,
            force: true,
            keep_retry: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StartOutcome {
    Started(RunToken),
    /// Same lesson already loading or ready; nothing was touched.
    AlreadyActive,
    Rejected(LessonError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LessonEvent {
    StatusChanged {
        from: LessonStatus,
        to: LessonStatus,
        reason: &'static str,
    },
    Retrying {
        attempt: u32,
    },
    StepCompleted {
        index: usize,
        is_last: bool,
    },
    Finished(LessonCompletion),
    Failed {
        code: ErrorCode,
        message: String,
    },
}
