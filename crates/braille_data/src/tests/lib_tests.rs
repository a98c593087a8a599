use super::*;

fn numbers(cell: &Cell) -> Vec<u8> {
    cell.dots().iter().map(|dot| dot.number()).collect()
}

#[test]
fn lowercase_letter_is_a_single_cell() {
    let presentation = BrailleTable.resolve_presentation(Symbol('d')).expect("d resolves");
    assert!(!presentation.is_two_cell());
    assert_eq!(numbers(&presentation.main), vec![1, 4, 5]);
    assert_eq!(presentation.main.label, "letter d");
}

#[test]
fn capital_letter_gets_capital_prefix() {
    let presentation = BrailleTable.resolve_presentation(Symbol('A')).expect("A resolves");
    let prefix = presentation.prefix.as_ref().expect("capital prefix");
    assert_eq!(numbers(prefix), vec![4, 6]);
    assert_eq!(prefix.label, "capital sign");
    assert_eq!(numbers(&presentation.main), vec![1]);
    assert_eq!(presentation.main.label, "letter a");
}

#[test]
fn capital_enye_resolves_through_lowercase_table() {
    let presentation = BrailleTable.resolve_presentation(Symbol('Ñ')).expect("Ñ resolves");
    assert!(presentation.is_two_cell());
    assert_eq!(numbers(&presentation.main), vec![1, 2, 4, 5, 6]);
}

#[test]
fn digit_gets_number_prefix() {
    let presentation = BrailleTable.resolve_presentation(Symbol('7')).expect("7 resolves");
    let prefix = presentation.prefix.as_ref().expect("number prefix");
    assert_eq!(numbers(prefix), vec![3, 4, 5, 6]);
    assert_eq!(numbers(&presentation.main), vec![1, 2, 4, 5]);
    assert_eq!(presentation.main.label, "number 7");
}

#[test]
fn punctuation_and_signs_are_single_cells() {
    let question = BrailleTable.resolve_presentation(Symbol('?')).expect("? resolves");
    assert_eq!(numbers(&question.main), vec![2, 6]);
    assert_eq!(question.main.label, "symbol ?");

    let at = BrailleTable.resolve_presentation(Symbol('@')).expect("@ resolves");
    assert_eq!(numbers(&at.main), vec![5]);
}

#[test]
fn unknown_symbol_does_not_resolve() {
    assert!(BrailleTable.resolve_presentation(Symbol('☃')).is_none());
    assert!(BrailleTable.describe_positions(Symbol('☃')).is_none());
}

#[test]
fn describes_positions_with_prefixes() {
    assert_eq!(
        BrailleTable.describe_positions(Symbol('a')).as_deref(),
        Some("dot 1")
    );
    assert_eq!(
        BrailleTable.describe_positions(Symbol('h')).as_deref(),
        Some("dots 1, 2 and 5")
    );
    assert_eq!(
        BrailleTable.describe_positions(Symbol('A')).as_deref(),
        Some("capital sign (dots 4 and 6) followed by dot 1")
    );
    assert_eq!(
        BrailleTable.describe_positions(Symbol('3')).as_deref(),
        Some("number sign (dots 3, 4, 5 and 6) followed by dots 1 and 4")
    );
}
