//! Predicates used to classify loosely-typed spreadsheet cells.

use once_cell::sync::Lazy;
use regex::Regex;

/// Boards in a single team match.
pub const MAX_BOARDS: u8 = 8;

/// Titles which may precede a player's name, longest first so that `WGM` is
/// never read as `GM`.
pub const CHESS_TITLES: [&str; 9] =
    ["WGM", "WIM", "WFM", "WCM", "GM", "IM", "FM", "CM", "NM"];

/// A board number is a whole number between 1 and [`MAX_BOARDS`], written
/// without a decimal point.
pub fn is_board_number(text: &str) -> bool {
    let text = text.trim();
    if text.is_empty() || !text.chars().all(|c| c.is_ascii_digit()) {
        return false;
    }
    match text.parse::<u8>() {
        Ok(n) => (1..=MAX_BOARDS).contains(&n),
        Err(_) => false,
    }
}

/// Team pairings are labelled `<round>.<pairing>`, e.g. `3.1`.
pub fn is_team_pairing_number(text: &str) -> bool {
    static RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d+\.\d+$").unwrap());
    RE.is_match(text.trim())
}

pub fn is_chess_title(text: &str) -> bool {
    let text = text.trim();
    CHESS_TITLES
        .iter()
        .any(|title| title.eq_ignore_ascii_case(text))
}

#[cfg(test)]
#[test]
fn test_cell_predicates() {
    assert!(is_board_number("1"));
    assert!(is_board_number(" 8 "));
    assert!(!is_board_number("0"));
    assert!(!is_board_number("9"));
    assert!(!is_board_number("1.0"));
    assert!(!is_board_number("1.1"));
    assert!(!is_board_number("+1"));

    assert!(is_team_pairing_number("3.1"));
    assert!(is_team_pairing_number("12.10"));
    assert!(!is_team_pairing_number("3"));
    assert!(!is_team_pairing_number("3."));

    assert!(is_chess_title("GM"));
    assert!(is_chess_title("wfm"));
    assert!(!is_chess_title("Smith"));
    assert!(!is_chess_title(""));
}
