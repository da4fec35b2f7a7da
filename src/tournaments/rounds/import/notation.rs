//! Score notations found in round exports.
//!
//! Team scores look like `4½ - 3½` (a trailing `F` on either side marks a
//! forfeited match), board results like `1 : 0`, `½ : ½` or one of the
//! forfeit sentinels `+ : -`, `- : +` and `- : -`.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// The result of one side of a board.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GameOutcome {
    Win,
    Loss,
    Draw,
    Forfeit,
}

impl GameOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            GameOutcome::Win => "win",
            GameOutcome::Loss => "loss",
            GameOutcome::Draw => "draw",
            GameOutcome::Forfeit => "forfeit",
        }
    }
}

/// The result of a board as a whole.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResultKind {
    WhiteWin,
    BlackWin,
    Draw,
    WhiteWinByForfeit,
    BlackWinByForfeit,
    DoubleForfeit,
}

impl ResultKind {
    /// The form stored in the `board_pairings.result` column.
    pub fn as_str(&self) -> &'static str {
        match self {
            ResultKind::WhiteWin => "1-0",
            ResultKind::BlackWin => "0-1",
            ResultKind::Draw => "½-½",
            ResultKind::WhiteWinByForfeit => "+:-",
            ResultKind::BlackWinByForfeit => "-:+",
            ResultKind::DoubleForfeit => "-:-",
        }
    }

    pub fn is_forfeit(&self) -> bool {
        matches!(
            self,
            ResultKind::WhiteWinByForfeit
                | ResultKind::BlackWinByForfeit
                | ResultKind::DoubleForfeit
        )
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct BoardResult {
    pub result: ResultKind,
    pub white_score: f64,
    pub black_score: f64,
    pub white_result: GameOutcome,
    pub black_result: GameOutcome,
}

impl BoardResult {
    fn forfeit(result: ResultKind, white_score: f64, black_score: f64) -> Self {
        Self {
            result,
            white_score,
            black_score,
            white_result: GameOutcome::Forfeit,
            black_result: GameOutcome::Forfeit,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct TeamScore {
    pub white: f64,
    pub black: f64,
    pub is_forfeit: bool,
}

static HALF_POINTS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d*)½$").unwrap());

static TEAM_SCORE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*([0-9.½]+)\s*([Ff])?\s*[-–]\s*([0-9.½]+)\s*([Ff])?\s*$")
        .unwrap()
});

static FORFEIT_SENTINEL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*([+-])\s*:\s*([+-])\s*$").unwrap());

static BOARD_SCORE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*([0-9.½/]+)\s*:\s*([0-9.½/]+)\s*$").unwrap()
});

/// Parses a single score: `½`, `4½`, `1/2` or a non-negative decimal number.
pub fn parse_score_value(text: &str) -> Option<f64> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    if let Some(caps) = HALF_POINTS.captures(text) {
        let whole = match &caps[1] {
            "" => 0.0,
            digits => digits.parse::<f64>().ok()?,
        };
        return Some(whole + 0.5).filter(|value| value.is_finite());
    }

    if text == "1/2" {
        return Some(0.5);
    }

    match text.parse::<f64>() {
        Ok(value) if value.is_finite() && value >= 0.0 => Some(value),
        _ => None,
    }
}

/// Parses a declared team score such as `5 - 3`, `4½ - 3½` or `0F - 4`.
pub fn parse_team_score(text: &str) -> Option<TeamScore> {
    let caps = TEAM_SCORE.captures(text)?;

    let white = parse_score_value(&caps[1])?;
    let black = parse_score_value(&caps[3])?;

    Some(TeamScore {
        white,
        black,
        is_forfeit: caps.get(2).is_some() || caps.get(4).is_some(),
    })
}

/// Whether `text` is shaped like a board result at all. Cells which pass this
/// but fail [`parse_board_result`] are malformed results rather than some
/// other kind of cell.
pub fn looks_like_board_result(text: &str) -> bool {
    FORFEIT_SENTINEL.is_match(text) || BOARD_SCORE.is_match(text)
}

/// Parses a board result. Unparseable input is logged and yields `None`; the
/// caller decides whether to skip the row.
pub fn parse_board_result(text: &str) -> Option<BoardResult> {
    let parsed = board_result(text);
    if parsed.is_none() {
        tracing::warn!(cell = text, "Unrecognised board result");
    }
    parsed
}

fn board_result(text: &str) -> Option<BoardResult> {
    if let Some(caps) = FORFEIT_SENTINEL.captures(text) {
        return match (&caps[1], &caps[2]) {
            ("+", "-") => Some(BoardResult::forfeit(
                ResultKind::WhiteWinByForfeit,
                1.0,
                0.0,
            )),
            ("-", "+") => Some(BoardResult::forfeit(
                ResultKind::BlackWinByForfeit,
                0.0,
                1.0,
            )),
            ("-", "-") => {
                Some(BoardResult::forfeit(ResultKind::DoubleForfeit, 0.0, 0.0))
            }
            _ => None,
        };
    }

    let caps = BOARD_SCORE.captures(text)?;
    let white = parse_score_value(&caps[1])?;
    let black = parse_score_value(&caps[2])?;

    if !is_game_score(white) || !is_game_score(black) {
        return None;
    }

    let (result, white_result, black_result) = if white == 0.0 && black == 0.0
    {
        // 0 : 0 cannot be the outcome of a played game
        tracing::warn!(
            cell = text,
            "Treating a 0 : 0 result as a double forfeit"
        );
        (
            ResultKind::DoubleForfeit,
            GameOutcome::Forfeit,
            GameOutcome::Forfeit,
        )
    } else if white == black {
        (ResultKind::Draw, GameOutcome::Draw, GameOutcome::Draw)
    } else if white > black {
        (ResultKind::WhiteWin, GameOutcome::Win, GameOutcome::Loss)
    } else {
        (ResultKind::BlackWin, GameOutcome::Loss, GameOutcome::Win)
    };

    Some(BoardResult {
        result,
        white_score: white,
        black_score: black,
        white_result,
        black_result,
    })
}

fn is_game_score(score: f64) -> bool {
    score == 0.0 || score == 0.5 || score == 1.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn score_values() {
        assert_eq!(parse_score_value("½"), Some(0.5));
        assert_eq!(parse_score_value("4½"), Some(4.5));
        assert_eq!(parse_score_value("1/2"), Some(0.5));
        assert_eq!(parse_score_value(" 3.5 "), Some(3.5));
        assert_eq!(parse_score_value("12"), Some(12.0));
        assert_eq!(parse_score_value("-1"), None);
        assert_eq!(parse_score_value(""), None);
        assert_eq!(parse_score_value("abc"), None);
        assert_eq!(parse_score_value("NaN"), None);
        assert_eq!(parse_score_value("inf"), None);

        let huge = format!("{}½", "9".repeat(400));
        assert_eq!(parse_score_value(&huge), None);
        assert_eq!(parse_team_score(&format!("{huge} - 1")), None);
    }

    #[test]
    fn team_scores() {
        for (n, m) in [(4.0, 4.0), (5.0, 3.0), (0.0, 8.0), (10.0, 2.0)] {
            let text = format!("{n} - {m}");
            assert_eq!(
                parse_team_score(&text),
                Some(TeamScore {
                    white: n,
                    black: m,
                    is_forfeit: false
                })
            );

            let forfeited = format!("{n}F - {m}");
            assert_eq!(
                parse_team_score(&forfeited),
                Some(TeamScore {
                    white: n,
                    black: m,
                    is_forfeit: true
                })
            );

            let forfeited = format!("{n} - {m}F");
            assert_eq!(
                parse_team_score(&forfeited),
                Some(TeamScore {
                    white: n,
                    black: m,
                    is_forfeit: true
                })
            );
        }

        assert_eq!(
            parse_team_score("4½ - 3½"),
            Some(TeamScore {
                white: 4.5,
                black: 3.5,
                is_forfeit: false
            })
        );
        assert_eq!(parse_team_score("4 : 4"), None);
        assert_eq!(parse_team_score("Team A"), None);
        assert_eq!(parse_team_score("4 - "), None);
    }

    #[test]
    fn decisive_and_drawn_boards() {
        let white_win = parse_board_result("1 : 0").unwrap();
        assert_eq!(white_win.white_score, 1.0);
        assert_eq!(white_win.black_score, 0.0);
        assert_eq!(white_win.white_result, GameOutcome::Win);
        assert_eq!(white_win.black_result, GameOutcome::Loss);
        assert_eq!(white_win.result, ResultKind::WhiteWin);

        let black_win = parse_board_result("0:1").unwrap();
        assert_eq!(black_win.white_result, GameOutcome::Loss);
        assert_eq!(black_win.black_result, GameOutcome::Win);

        let draw = parse_board_result("½ : ½").unwrap();
        assert_eq!(draw.white_result, GameOutcome::Draw);
        assert_eq!(draw.black_result, GameOutcome::Draw);
        assert_eq!(draw.white_score, 0.5);
        assert_eq!(draw.black_score, 0.5);
    }

    #[test]
    fn forfeit_boards() {
        let white = parse_board_result("+ : -").unwrap();
        assert_eq!(white.white_score, 1.0);
        assert_eq!(white.black_score, 0.0);
        assert_eq!(white.white_result, GameOutcome::Forfeit);
        assert_eq!(white.black_result, GameOutcome::Forfeit);
        assert_eq!(white.result, ResultKind::WhiteWinByForfeit);

        let black = parse_board_result("-:+").unwrap();
        assert_eq!((black.white_score, black.black_score), (0.0, 1.0));
        assert!(black.result.is_forfeit());

        let double = parse_board_result(" - : - ").unwrap();
        assert_eq!((double.white_score, double.black_score), (0.0, 0.0));
        assert_eq!(double.result, ResultKind::DoubleForfeit);

        let zeros = parse_board_result("0 : 0").unwrap();
        assert_eq!(zeros.result, ResultKind::DoubleForfeit);
        assert_eq!(zeros.white_result, GameOutcome::Forfeit);
    }

    #[test]
    fn malformed_boards() {
        assert_eq!(parse_board_result("+ : +"), None);
        assert_eq!(parse_board_result("2 : 0"), None);
        assert_eq!(parse_board_result("1 - 0"), None);
        assert_eq!(parse_board_result(""), None);
        assert!(looks_like_board_result("2 : 0"));
        assert!(!looks_like_board_result("Smith John"));
    }
}
