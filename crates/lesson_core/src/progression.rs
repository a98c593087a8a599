use shared::LessonCompletion;

/// Game/progression side that takes over once the walkthrough ends.
///
/// Persistence and XP bookkeeping (and any debouncing of them) live behind
/// this trait; the walkthrough only reports completion once per run.
pub trait ProgressionSink: Send + Sync {
    fn lesson_finished(&self, completion: LessonCompletion);
}

pub struct MissingProgression;

impl ProgressionSink for MissingProgression {
    fn lesson_finished(&self, completion: LessonCompletion) {
        tracing::debug!(
            lesson_id = %completion.lesson_id,
            "lesson: finished with no progression collaborator attached"
        );
    }
}
