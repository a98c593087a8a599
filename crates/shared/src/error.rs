use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::{LessonId, Symbol};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    InvalidLesson,
    MissingTarget,
    SetupFailed,
    WatchdogTimeout,
    Internal,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LessonError {
    #[error("no lesson has been started")]
    NoLesson,
    #[error("lesson {lesson_id} has no symbols")]
    EmptyLesson { lesson_id: LessonId },
    #[error("lesson {lesson_id} contains unresolvable symbol '{symbol}'")]
    UnknownSymbol { lesson_id: LessonId, symbol: Symbol },
    #[error("rendering target missing: {0}")]
    MissingTarget(String),
    #[error("lesson setup failed: {0}")]
    SetupFailed(String),
    #[error("lesson did not become ready after {attempts} attempt(s)")]
    WatchdogTimeout { attempts: u32 },
    #[error("lesson step panicked: {0}")]
    StepPanicked(String),
}

impl LessonError {
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::NoLesson | Self::EmptyLesson { .. } | Self::UnknownSymbol { .. } => {
                ErrorCode::InvalidLesson
            }
            Self::MissingTarget(_) => ErrorCode::MissingTarget,
            Self::SetupFailed(_) => ErrorCode::SetupFailed,
            Self::WatchdogTimeout { .. } => ErrorCode::WatchdogTimeout,
            Self::StepPanicked(_) => ErrorCode::Internal,
        }
    }

    /// Only stalls are transient; data and structural failures are not.
    pub fn is_retryable(&self) -> bool {
        matches!(self.code(), ErrorCode::WatchdogTimeout)
    }
}
