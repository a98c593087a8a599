use async_trait::async_trait;
use shared::{CellSlot, Dot, Symbol};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ViewError {
    #[error("missing rendering target: {0}")]
    MissingTarget(String),
    #[error("view setup failed: {0}")]
    Setup(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellLayout {
    Single,
    WithPrefix,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DotState {
    Animating,
    Filled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdvanceLabel {
    Next,
    StartPractice,
}

/// Rendering layer driven by the lesson walkthrough.
///
/// The walkthrough never owns visual state; it only issues these calls.
/// Calls are made synchronously from lesson tasks and must not call back
/// into the lesson.
#[async_trait]
pub trait LessonView: Send + Sync {
    /// Resolves once the lesson surface is on screen with the cell targets
    /// `layout` needs. Fails when a target does not exist.
    async fn mount(&self, layout: CellLayout) -> Result<(), ViewError>;

    /// Placeholder text, zero progress, default control labels.
    fn reset(&self);

    fn setup_progress(&self, total: usize) -> Result<(), ViewError>;

    fn show_progress(&self, index: usize, total: usize);

    fn show_symbol(&self, symbol: Symbol);

    /// Text bubble shown alongside narration.
    fn show_message(&self, text: &str);

    fn set_dot(&self, slot: CellSlot, dot: Dot, state: DotState);

    fn clear_dots(&self);

    fn show_advance_label(&self, label: AdvanceLabel);

    /// Renders the retry affordance after a failed start.
    fn show_error(&self);

    fn haptic_tap(&self) {}
}
