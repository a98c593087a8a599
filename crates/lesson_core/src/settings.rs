use std::sync::{PoisonError, RwLock};

use shared::{LessonSettings, NarrationMode};

/// Source of the user's current accessibility and audio preferences.
///
/// Read before every narrated phrase, so changes apply from the next phrase on.
pub trait SettingsProvider: Send + Sync {
    fn current(&self) -> LessonSettings;
}

pub struct StaticSettings(pub LessonSettings);

impl SettingsProvider for StaticSettings {
    fn current(&self) -> LessonSettings {
        self.0
    }
}

/// Settings the host can change while a lesson runs.
#[derive(Default)]
pub struct SharedSettings {
    inner: RwLock<LessonSettings>,
}

impl SharedSettings {
    pub fn new(settings: LessonSettings) -> Self {
        Self {
            inner: RwLock::new(settings),
        }
    }

    pub fn set_narration_mode(&self, mode: NarrationMode) {
        self.inner
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .narration_mode = mode;
    }

    pub fn set_playback_speed(&self, speed: f32) {
        self.inner
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .playback_speed = speed;
    }
}

impl SettingsProvider for SharedSettings {
    fn current(&self) -> LessonSettings {
        *self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }
}
