use std::{fs, path::Path, str::FromStr, time::Duration};

use anyhow::Context;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

pub const ENV_PREFIX: &str = "LESSON__";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PacingConfig {
    pub base_wpm: f32,
    pub comma_pause_ms: u64,
    pub sentence_pause_ms: u64,
    pub min_duration_ms: u64,
}

impl Default for PacingConfig {
    fn default() -> Self {
        Self {
            base_wpm: 150.0,
            comma_pause_ms: 150,
            sentence_pause_ms: 300,
            min_duration_ms: 400,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LessonTiming {
    pub intro_pause_ms: u64,
    pub prefix_dot_ms: u64,
    pub inter_cell_ms: u64,
    pub main_dot_ms: u64,
    pub dot_gap_ms: u64,
    pub auto_advance_ms: u64,
    pub watchdog_ms: u64,
    pub step_ceiling_ms: u64,
    pub max_retries: u32,
    pub pacing: PacingConfig,
}

impl Default for LessonTiming {
    fn default() -> Self {
        Self {
            intro_pause_ms: 200,
            prefix_dot_ms: 280,
            inter_cell_ms: 350,
            main_dot_ms: 400,
            dot_gap_ms: 100,
            auto_advance_ms: 8_000,
            watchdog_ms: 7_000,
            step_ceiling_ms: 6_000,
            max_retries: 1,
            pacing: PacingConfig::default(),
        }
    }
}

impl LessonTiming {
    pub fn intro_pause(&self) -> Duration {
        Duration::from_millis(self.intro_pause_ms)
    }

    pub fn prefix_dot(&self) -> Duration {
        Duration::from_millis(self.prefix_dot_ms)
    }

    pub fn inter_cell(&self) -> Duration {
        Duration::from_millis(self.inter_cell_ms)
    }

    pub fn main_dot(&self) -> Duration {
        Duration::from_millis(self.main_dot_ms)
    }

    pub fn dot_gap(&self) -> Duration {
        Duration::from_millis(self.dot_gap_ms)
    }

    pub fn auto_advance(&self) -> Duration {
        Duration::from_millis(self.auto_advance_ms)
    }

    pub fn watchdog(&self) -> Duration {
        Duration::from_millis(self.watchdog_ms)
    }

    pub fn step_ceiling(&self) -> Duration {
        Duration::from_millis(self.step_ceiling_ms)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.pacing.min_duration_ms == 0 {
            return Err(ConfigError::ZeroMinimumDuration);
        }
        if !(self.pacing.base_wpm.is_finite() && self.pacing.base_wpm > 0.0) {
            return Err(ConfigError::InvalidWpm(self.pacing.base_wpm));
        }
        if self.step_ceiling_ms >= self.watchdog_ms {
            return Err(ConfigError::CeilingNotShorter {
                ceiling: self.step_ceiling_ms,
                watchdog: self.watchdog_ms,
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("pacing.min_duration_ms must be greater than zero")]
    ZeroMinimumDuration,
    #[error("pacing.base_wpm must be a positive number, got {0}")]
    InvalidWpm(f32),
    #[error("step_ceiling_ms ({ceiling}) must be shorter than watchdog_ms ({watchdog})")]
    CeilingNotShorter { ceiling: u64, watchdog: u64 },
}

/// Loads timing from an optional TOML file, then applies `LESSON__*` env overrides.
pub fn load_timing(path: Option<&Path>) -> anyhow::Result<LessonTiming> {
    let mut timing = match path {
        Some(path) => {
            let raw = fs::read_to_string(path)
                .with_context(|| format!("failed to read lesson timing '{}'", path.display()))?;
            toml::from_str::<LessonTiming>(&raw)
                .with_context(|| format!("invalid lesson timing '{}'", path.display()))?
        }
        None => LessonTiming::default(),
    };

    apply_env_overrides(&mut timing, |key| std::env::var(key).ok());
    timing.validate()?;
    Ok(timing)
}

pub fn apply_env_overrides(timing: &mut LessonTiming, lookup: impl Fn(&str) -> Option<String>) {
    override_value(&mut timing.intro_pause_ms, "INTRO_PAUSE_MS", &lookup);
    override_value(&mut timing.prefix_dot_ms, "PREFIX_DOT_MS", &lookup);
    override_value(&mut timing.inter_cell_ms, "INTER_CELL_MS", &lookup);
    override_value(&mut timing.main_dot_ms, "MAIN_DOT_MS", &lookup);
    override_value(&mut timing.dot_gap_ms, "DOT_GAP_MS", &lookup);
    override_value(&mut timing.auto_advance_ms, "AUTO_ADVANCE_MS", &lookup);
    override_value(&mut timing.watchdog_ms, "WATCHDOG_MS", &lookup);
    override_value(&mut timing.step_ceiling_ms, "STEP_CEILING_MS", &lookup);
    override_value(&mut timing.max_retries, "MAX_RETRIES", &lookup);
    override_value(&mut timing.pacing.base_wpm, "BASE_WPM", &lookup);
    override_value(&mut timing.pacing.comma_pause_ms, "COMMA_PAUSE_MS", &lookup);
    override_value(&mut timing.pacing.sentence_pause_ms, "SENTENCE_PAUSE_MS", &lookup);
    override_value(&mut timing.pacing.min_duration_ms, "MIN_DURATION_MS", &lookup);
}

fn override_value<T: FromStr>(target: &mut T, key: &str, lookup: &impl Fn(&str) -> Option<String>) {
    let name = format!("{ENV_PREFIX}{key}");
    let Some(raw) = lookup(&name) else {
        return;
    };
    match raw.trim().parse::<T>() {
        Ok(value) => *target = value,
        Err(_) => warn!(key = %name, value = %raw, "config: ignoring unparseable override"),
    }
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
