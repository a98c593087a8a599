use std::{collections::HashMap, io::Write};

use super::*;

#[test]
fn defaults_match_lesson_constants() {
    let timing = LessonTiming::default();
    assert_eq!(timing.auto_advance(), Duration::from_secs(8));
    assert_eq!(timing.watchdog(), Duration::from_secs(7));
    assert_eq!(timing.pacing.min_duration_ms, 400);
    assert!(timing.validate().is_ok());
}

#[test]
fn partial_toml_keeps_remaining_defaults() {
    let mut file = tempfile::NamedTempFile::new().expect("temp file");
    writeln!(
        file,
        "watchdog_ms = 9000\nmax_retries = 2\n\n[pacing]\nbase_wpm = 180.0"
    )
    .expect("write");

    let timing = load_timing(Some(file.path())).expect("load");
    assert_eq!(timing.watchdog_ms, 9_000);
    assert_eq!(timing.max_retries, 2);
    assert_eq!(timing.pacing.base_wpm, 180.0);
    assert_eq!(timing.pacing.comma_pause_ms, 150);
    assert_eq!(timing.main_dot_ms, 400);
}

#[test]
fn invalid_toml_is_reported_with_path() {
    let mut file = tempfile::NamedTempFile::new().expect("temp file");
    writeln!(file, "watchdog_ms = \"soon\"").expect("write");

    let err = load_timing(Some(file.path())).expect_err("invalid file");
    assert!(err.to_string().contains("invalid lesson timing"));
}

#[test]
fn missing_file_is_an_error() {
    let dir = tempfile::tempdir().expect("temp dir");
    assert!(load_timing(Some(&dir.path().join("absent.toml"))).is_err());
}

#[test]
fn env_overrides_apply_and_bad_values_are_ignored() {
    let vars = HashMap::from([
        ("LESSON__AUTO_ADVANCE_MS".to_string(), "5000".to_string()),
        ("LESSON__BASE_WPM".to_string(), " 120.5 ".to_string()),
        ("LESSON__DOT_GAP_MS".to_string(), "fast".to_string()),
    ]);
    let mut timing = LessonTiming::default();
    apply_env_overrides(&mut timing, |key| vars.get(key).cloned());

    assert_eq!(timing.auto_advance_ms, 5_000);
    assert_eq!(timing.pacing.base_wpm, 120.5);
    assert_eq!(timing.dot_gap_ms, 100);
}

#[test]
fn ceiling_must_be_shorter_than_watchdog() {
    let timing = LessonTiming {
        step_ceiling_ms: 7_000,
        ..LessonTiming::default()
    };
    assert_eq!(
        timing.validate(),
        Err(ConfigError::CeilingNotShorter {
            ceiling: 7_000,
            watchdog: 7_000
        })
    );

    let timing = LessonTiming {
        pacing: PacingConfig {
            base_wpm: 0.0,
            ..PacingConfig::default()
        },
        ..LessonTiming::default()
    };
    assert_eq!(timing.validate(), Err(ConfigError::InvalidWpm(0.0)));
}
