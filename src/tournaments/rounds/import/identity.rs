//! Identifiers hidden in file names and player cells.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::validation::CHESS_TITLES;

/// The highest round number accepted when guessing from a bare integer.
const MAX_GUESSED_ROUND: u32 = 30;

/// Works out which round a file holds from its name. Tries, in order, a
/// `round` keyword followed by digits, a leading `r` followed by digits and
/// finally the first bare integer between 1 and 30.
pub fn detect_round_number(filename: &str) -> Option<u32> {
    static KEYWORD: Lazy<Regex> =
        Lazy::new(|| Regex::new(r"(?i)round[^0-9a-z]*(\d+)").unwrap());
    static SHORT: Lazy<Regex> =
        Lazy::new(|| Regex::new(r"(?i)^r(\d+)").unwrap());
    static BARE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d+").unwrap());

    let name = std::path::Path::new(filename)
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or(filename);

    if let Some(n) = KEYWORD
        .captures(name)
        .and_then(|caps| caps[1].parse::<u32>().ok())
    {
        return Some(n);
    }

    if let Some(n) = SHORT
        .captures(name)
        .and_then(|caps| caps[1].parse::<u32>().ok())
    {
        return Some(n);
    }

    BARE.find_iter(name)
        .filter_map(|m| m.as_str().parse::<u32>().ok())
        .find(|n| (1..=MAX_GUESSED_ROUND).contains(n))
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PlayerName {
    pub name: String,
    pub title: Option<String>,
}

/// Splits a leading chess title off a player's name (`"GM Fedoseev
/// Vladimir"` becomes `Fedoseev Vladimir` with title `GM`).
pub fn extract_player_title(name: &str) -> PlayerName {
    static TITLED: Lazy<Regex> = Lazy::new(|| {
        Regex::new(&format!(r"(?i)^({})\s+(\S.*)$", CHESS_TITLES.join("|")))
            .unwrap()
    });

    let trimmed = name.trim();
    match TITLED.captures(trimmed) {
        Some(caps) => PlayerName {
            name: caps[2].trim().to_string(),
            title: Some(caps[1].to_ascii_uppercase()),
        },
        None => PlayerName {
            name: trimmed.to_string(),
            title: None,
        },
    }
}
