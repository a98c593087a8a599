//! Pure step planning: lesson + index in, ordered action list out.
//!
//! Nothing here touches the view, the clock or the narration engine; the
//! sequencer interprets the plan.

use std::time::Duration;

use braille_data::SymbolLookup;
use shared::{CellSlot, Dot, Lesson, LessonError, Presentation, Symbol};

use crate::{config::LessonTiming, view::CellLayout};

/// Which part of a step a narrated phrase belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NarrationPhase {
    Intro,
    PrefixLabel,
    MainLabel,
    MainDot,
    Summary,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepAction {
    /// Text bubble shown next to the cells.
    Message(String),
    Say {
        text: String,
        phase: NarrationPhase,
    },
    Pause(Duration),
    Highlight {
        slot: CellSlot,
        dot: Dot,
    },
    Fill {
        slot: CellSlot,
        dot: Dot,
    },
    Tap,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepPlan {
    pub index: usize,
    pub total: usize,
    pub symbol: Symbol,
    pub presentation: Presentation,
    pub intro: String,
    pub summary: String,
    pub actions: Vec<StepAction>,
}

impl StepPlan {
    pub fn layout(&self) -> CellLayout {
        if self.presentation.is_two_cell() {
            CellLayout::WithPrefix
        } else {
            CellLayout::Single
        }
    }

    pub fn is_last(&self) -> bool {
        self.index + 1 >= self.total
    }

    /// Narrated phrases in the order they will be spoken.
    pub fn narrations(&self) -> impl Iterator<Item = (&str, NarrationPhase)> {
        self.actions.iter().filter_map(|action| match action {
            StepAction::Say { text, phase } => Some((text.as_str(), *phase)),
            _ => None,
        })
    }
}

pub fn intro_phrase(symbol: Symbol, index: usize, total: usize) -> String {
    if index == 0 {
        return format!("Let's start with {symbol}");
    }
    if index + 1 == total {
        return format!("And finally, {symbol}");
    }
    match (index - 1) % 4 {
        0 => format!("Now, {symbol}"),
        1 => format!("Next: {symbol}"),
        2 => format!("Here comes {symbol}"),
        _ => format!("Let's continue with {symbol}"),
    }
}

pub fn dot_phrase(dot: Dot) -> String {
    format!("dot {}, {}", dot.number(), dot.position_name())
}

/// Rejects lessons that cannot be rendered in full, before anything is shown.
pub fn validate_lesson(lesson: &Lesson, lookup: &dyn SymbolLookup) -> Result<(), LessonError> {
    if lesson.is_empty() {
        return Err(LessonError::EmptyLesson {
            lesson_id: lesson.id.clone(),
        });
    }
    let unknown = lesson.letters.iter().copied().find(|symbol| {
        lookup.resolve_presentation(*symbol).is_none()
            || lookup.describe_positions(*symbol).is_none()
    });
    match unknown {
        Some(symbol) => Err(LessonError::UnknownSymbol {
            lesson_id: lesson.id.clone(),
            symbol,
        }),
        None => Ok(()),
    }
}

pub fn plan_step(
    lesson: &Lesson,
    index: usize,
    lookup: &dyn SymbolLookup,
    timing: &LessonTiming,
) -> Result<StepPlan, LessonError> {
    let total = lesson.len();
    let symbol = *lesson.letters.get(index).ok_or_else(|| {
        LessonError::SetupFailed(format!("step {index} is outside a lesson of {total}"))
    })?;
    let unknown = || LessonError::UnknownSymbol {
        lesson_id: lesson.id.clone(),
        symbol,
    };
    let presentation = lookup.resolve_presentation(symbol).ok_or_else(unknown)?;
    let description = lookup.describe_positions(symbol).ok_or_else(unknown)?;

    let intro = intro_phrase(symbol, index, total);
    let summary = format!("{symbol} is {description}");
    let mut actions = vec![
        StepAction::Message(format!("{intro}...")),
        say(&intro, NarrationPhase::Intro),
        StepAction::Pause(timing.intro_pause()),
    ];

    if let Some(prefix) = &presentation.prefix {
        actions.push(say(&prefix.label, NarrationPhase::PrefixLabel));
        for &dot in prefix.dots() {
            actions.extend([
                StepAction::Highlight {
                    slot: CellSlot::Prefix,
                    dot,
                },
                StepAction::Tap,
                StepAction::Pause(timing.prefix_dot()),
                StepAction::Fill {
                    slot: CellSlot::Prefix,
                    dot,
                },
            ]);
        }
        actions.push(StepAction::Pause(timing.inter_cell()));
    }

    actions.push(say(&presentation.main.label, NarrationPhase::MainLabel));
    for &dot in presentation.main.dots() {
        actions.extend([
            StepAction::Highlight {
                slot: CellSlot::Main,
                dot,
            },
            say(&dot_phrase(dot), NarrationPhase::MainDot),
            StepAction::Tap,
            StepAction::Pause(timing.main_dot()),
            StepAction::Fill {
                slot: CellSlot::Main,
                dot,
            },
            StepAction::Pause(timing.dot_gap()),
        ]);
    }

    actions.push(StepAction::Message(summary.clone()));
    actions.push(say(&summary, NarrationPhase::Summary));

    Ok(StepPlan {
        index,
        total,
        symbol,
        presentation,
        intro,
        summary,
        actions,
    })
}

fn say(text: &str, phase: NarrationPhase) -> StepAction {
    StepAction::Say {
        text: text.to_string(),
        phase,
    }
}

#[cfg(test)]
#[path = "tests/plan_tests.rs"]
mod tests;
