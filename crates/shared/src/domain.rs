use std::fmt;

use serde::{Deserialize, Serialize};

macro_rules! id_newtype {
    ($name:ident) => {
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self::new(value)
            }
        }
    };
}

id_newtype!(LessonId);

/// A single taught character: letter, digit or punctuation glyph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Symbol(pub char);

impl Symbol {
    pub fn as_char(self) -> char {
        self.0
    }

    pub fn is_capital(self) -> bool {
        self.0.is_uppercase()
    }

    pub fn is_digit(self) -> bool {
        self.0.is_ascii_digit()
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<char> for Symbol {
    fn from(value: char) -> Self {
        Self(value)
    }
}

/// A raised dot position in the six-dot cell.
///
/// ```text
/// [1] [4]
/// [2] [5]
/// [3] [6]
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Dot(u8);

impl Dot {
    pub const ALL: [Dot; 6] = [Dot(1), Dot(2), Dot(3), Dot(4), Dot(5), Dot(6)];

    pub fn new(position: u8) -> Option<Self> {
        (1..=6).contains(&position).then_some(Self(position))
    }

    pub fn number(self) -> u8 {
        self.0
    }

    pub fn position_name(self) -> &'static str {
        match self.0 {
            1 => "top left",
            2 => "middle left",
            3 => "bottom left",
            4 => "top right",
            5 => "middle right",
            _ => "bottom right",
        }
    }
}

impl TryFrom<u8> for Dot {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Dot::new(value).ok_or_else(|| format!("dot position {value} is outside 1..=6"))
    }
}

impl From<Dot> for u8 {
    fn from(value: Dot) -> Self {
        value.0
    }
}

impl fmt::Display for Dot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Raised dots of one Braille cell plus the label read aloud for it.
///
/// Dots are kept in ascending order without duplicates; that order is the
/// animation order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cell {
    dots: Vec<Dot>,
    pub label: String,
}

impl Cell {
    pub fn new(dots: impl IntoIterator<Item = Dot>, label: impl Into<String>) -> Self {
        let mut dots = dots.into_iter().collect::<Vec<_>>();
        dots.sort_unstable();
        dots.dedup();
        Self {
            dots,
            label: label.into(),
        }
    }

    /// Builds a cell from raw positions, dropping anything outside 1..=6.
    pub fn from_positions(positions: &[u8], label: impl Into<String>) -> Self {
        Self::new(positions.iter().copied().filter_map(Dot::new), label)
    }

    pub fn dots(&self) -> &[Dot] {
        &self.dots
    }

    pub fn is_blank(&self) -> bool {
        self.dots.is_empty()
    }
}

/// Which visual cell a dot belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CellSlot {
    Prefix,
    Main,
}

/// One- or two-cell rendering plan for a symbol.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Presentation {
    pub prefix: Option<Cell>,
    pub main: Cell,
}

impl Presentation {
    pub fn single(main: Cell) -> Self {
        Self { prefix: None, main }
    }

    pub fn with_prefix(prefix: Cell, main: Cell) -> Self {
        Self {
            prefix: Some(prefix),
            main,
        }
    }

    pub fn is_two_cell(&self) -> bool {
        self.prefix.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lesson {
    pub id: LessonId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub letters: Vec<Symbol>,
}

impl Lesson {
    pub fn new(id: impl Into<String>, letters: impl IntoIterator<Item = Symbol>) -> Self {
        Self {
            id: LessonId::new(id),
            title: None,
            letters: letters.into_iter().collect(),
        }
    }

    /// Convenience for lessons whose symbols are the characters of `letters`.
    pub fn from_chars(id: impl Into<String>, letters: &str) -> Self {
        Self::new(id, letters.chars().map(Symbol))
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn len(&self) -> usize {
        self.letters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.letters.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LessonStatus {
    #[default]
    Idle,
    Loading,
    Ready,
    Error,
}

impl LessonStatus {
    pub fn is_active(self) -> bool {
        matches!(self, Self::Loading | Self::Ready)
    }
}

impl fmt::Display for LessonStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Idle => "idle",
            Self::Loading => "loading",
            Self::Ready => "ready",
            Self::Error => "error",
        };
        f.write_str(label)
    }
}

/// Which speech path, if any, narrates lessons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NarrationMode {
    ScreenReader,
    #[default]
    LessonAudio,
    None,
}

impl NarrationMode {
    pub fn narrates(self) -> bool {
        !matches!(self, Self::None)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LessonSettings {
    pub narration_mode: NarrationMode,
    pub playback_speed: f32,
}

impl Default for LessonSettings {
    fn default() -> Self {
        Self {
            narration_mode: NarrationMode::default(),
            playback_speed: 1.0,
        }
    }
}

impl LessonSettings {
    /// Speed multiplier clamped to something usable as a divisor.
    pub fn effective_speed(&self) -> f32 {
        if self.playback_speed.is_finite() && self.playback_speed > 0.0 {
            self.playback_speed
        } else {
            1.0
        }
    }
}

/// Sent to the progression collaborator when the walkthrough ends.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LessonCompletion {
    pub lesson_id: LessonId,
    pub skip_intro: bool,
}

/// Generation counter minted on every lesson (re)start.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct RunToken(pub u64);

impl RunToken {
    pub fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Display for RunToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}
