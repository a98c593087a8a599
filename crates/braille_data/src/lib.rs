//! Braille symbol dictionary consumed by the lesson walkthrough.
//!
//! Patterns follow the Spanish Braille standard. Capitals and digits are
//! written as two cells: a mode prefix followed by the base letter pattern.

use shared::{Cell, Presentation, Symbol};

const CAPITAL_SIGN: &[u8] = &[4, 6];
const NUMBER_SIGN: &[u8] = &[3, 4, 5, 6];

const CAPITAL_SIGN_LABEL: &str = "capital sign";
const NUMBER_SIGN_LABEL: &str = "number sign";

const ALPHABET: &[(char, &[u8])] = &[
    ('a', &[1]),
    ('b', &[1, 2]),
    ('c', &[1, 4]),
    ('d', &[1, 4, 5]),
    ('e', &[1, 5]),
    ('f', &[1, 2, 4]),
    ('g', &[1, 2, 4, 5]),
    ('h', &[1, 2, 5]),
    ('i', &[2, 4]),
    ('j', &[2, 4, 5]),
    ('k', &[1, 3]),
    ('l', &[1, 2, 3]),
    ('m', &[1, 3, 4]),
    ('n', &[1, 3, 4, 5]),
    ('ñ', &[1, 2, 4, 5, 6]),
    ('o', &[1, 3, 5]),
    ('p', &[1, 2, 3, 4]),
    ('q', &[1, 2, 3, 4, 5]),
    ('r', &[1, 2, 3, 5]),
    ('s', &[2, 3, 4]),
    ('t', &[2, 3, 4, 5]),
    ('u', &[1, 3, 6]),
    ('v', &[1, 2, 3, 6]),
    ('w', &[2, 4, 5, 6]),
    ('x', &[1, 3, 4, 6]),
    ('y', &[1, 3, 4, 5, 6]),
    ('z', &[1, 3, 5, 6]),
];

const ACCENTS: &[(char, &[u8])] = &[
    ('á', &[1, 2, 3, 5, 6]),
    ('é', &[2, 3, 4, 6]),
    ('í', &[3, 4]),
    ('ó', &[3, 4, 6]),
    ('ú', &[2, 3, 4, 5, 6]),
    ('ü', &[1, 2, 5, 6]),
];

const DIGITS: &[(char, &[u8])] = &[
    ('1', &[1]),
    ('2', &[1, 2]),
    ('3', &[1, 4]),
    ('4', &[1, 4, 5]),
    ('5', &[1, 5]),
    ('6', &[1, 2, 4]),
    ('7', &[1, 2, 4, 5]),
    ('8', &[1, 2, 5]),
    ('9', &[2, 4]),
    ('0', &[2, 4, 5]),
];

const PUNCTUATION: &[(char, &[u8])] = &[
    ('.', &[3]),
    (',', &[2]),
    (';', &[2, 3]),
    (':', &[2, 5]),
    ('?', &[2, 6]),
    ('¿', &[2, 6]),
    ('!', &[2, 3, 5]),
    ('¡', &[2, 3, 5]),
    ('(', &[2, 3, 5, 6]),
    (')', &[2, 3, 5, 6]),
    ('-', &[3, 6]),
    ('"', &[2, 3, 6]),
    ('\'', &[4]),
];

const MATH: &[(char, &[u8])] = &[
    ('+', &[2, 3, 5]),
    ('−', &[3, 6]),
    ('×', &[1, 6]),
    ('÷', &[3, 4]),
    ('=', &[2, 3, 5, 6]),
];

const DIGITAL: &[(char, &[u8])] = &[
    ('@', &[5]),
    ('%', &[3, 4, 6]),
    ('#', &[3, 4, 5, 6]),
    ('/', &[3, 4]),
    ('&', &[1, 2, 3, 4, 6]),
];

/// Read-only lookup from a taught symbol to its cells and spoken description.
pub trait SymbolLookup: Send + Sync {
    fn resolve_presentation(&self, symbol: Symbol) -> Option<Presentation>;

    /// Human-readable dot description, e.g. `dots 1, 4 and 5`.
    fn describe_positions(&self, symbol: Symbol) -> Option<String>;
}

/// The built-in Spanish-standard table.
#[derive(Debug, Default, Clone, Copy)]
pub struct BrailleTable;

enum Resolved {
    Capital(&'static [u8], char),
    Number(&'static [u8], char),
    Plain(&'static [u8], char, PlainKind),
}

enum PlainKind {
    Letter,
    Symbol,
}

impl BrailleTable {
    pub fn new() -> Self {
        Self
    }

    fn resolve(&self, symbol: Symbol) -> Option<Resolved> {
        let ch = symbol.as_char();

        if ch.is_uppercase() {
            let lower = ch.to_lowercase().next()?;
            return find(ALPHABET, lower)
                .or_else(|| find(ACCENTS, lower))
                .map(|dots| Resolved::Capital(dots, lower));
        }
        if ch.is_ascii_digit() {
            return find(DIGITS, ch).map(|dots| Resolved::Number(dots, ch));
        }
        if let Some(dots) = find(ALPHABET, ch).or_else(|| find(ACCENTS, ch)) {
            return Some(Resolved::Plain(dots, ch, PlainKind::Letter));
        }
        find(PUNCTUATION, ch)
            .or_else(|| find(MATH, ch))
            .or_else(|| find(DIGITAL, ch))
            .map(|dots| Resolved::Plain(dots, ch, PlainKind::Symbol))
    }
}

impl SymbolLookup for BrailleTable {
    fn resolve_presentation(&self, symbol: Symbol) -> Option<Presentation> {
        let presentation = match self.resolve(symbol)? {
            Resolved::Capital(dots, base) => Presentation::with_prefix(
                Cell::from_positions(CAPITAL_SIGN, CAPITAL_SIGN_LABEL),
                Cell::from_positions(dots, format!("letter {base}")),
            ),
            Resolved::Number(dots, digit) => Presentation::with_prefix(
                Cell::from_positions(NUMBER_SIGN, NUMBER_SIGN_LABEL),
                Cell::from_positions(dots, format!("number {digit}")),
            ),
            Resolved::Plain(dots, ch, PlainKind::Letter) => {
                Presentation::single(Cell::from_positions(dots, format!("letter {ch}")))
            }
            Resolved::Plain(dots, ch, PlainKind::Symbol) => {
                Presentation::single(Cell::from_positions(dots, format!("symbol {ch}")))
            }
        };
        Some(presentation)
    }

    fn describe_positions(&self, symbol: Symbol) -> Option<String> {
        let description = match self.resolve(symbol)? {
            Resolved::Capital(dots, _) => format!(
                "{CAPITAL_SIGN_LABEL} ({}) followed by {}",
                dot_list(CAPITAL_SIGN),
                dot_list(dots)
            ),
            Resolved::Number(dots, _) => format!(
                "{NUMBER_SIGN_LABEL} ({}) followed by {}",
                dot_list(NUMBER_SIGN),
                dot_list(dots)
            ),
            Resolved::Plain(dots, _, _) => dot_list(dots),
        };
        Some(description)
    }
}

fn find(table: &'static [(char, &'static [u8])], ch: char) -> Option<&'static [u8]> {
    table
        .iter()
        .find(|(candidate, _)| *candidate == ch)
        .map(|(_, dots)| *dots)
}

fn dot_list(dots: &[u8]) -> String {
    match dots {
        [] => "no dots".to_string(),
        [single] => format!("dot {single}"),
        [rest @ .., last] => {
            let rest = rest
                .iter()
                .map(u8::to_string)
                .collect::<Vec<_>>()
                .join(", ");
            format!("dots {rest} and {last}")
        }
    }
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
