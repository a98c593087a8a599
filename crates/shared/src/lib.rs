pub mod domain;
pub mod error;

pub use domain::{
    Cell, CellSlot, Dot, Lesson, LessonCompletion, LessonId, LessonSettings, LessonStatus,
    NarrationMode, Presentation, RunToken, Symbol,
};
pub use error::{ErrorCode, LessonError};

#[cfg(test)]
#[path = "tests/domain_tests.rs"]
mod tests;
