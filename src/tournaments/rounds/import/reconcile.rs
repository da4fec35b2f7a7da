//! Checks a declared team score against the boards it was played on.

use rust_decimal::Decimal;
use serde::Serialize;

use crate::tournaments::standings::compute::metrics::score;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ScoreCheck {
    pub valid: bool,
    pub message: Option<String>,
}

/// Boards are scored in halves, so any disagreement is at least this large.
fn tolerance() -> Decimal {
    Decimal::new(5, 1)
}

/// Compares the declared team score with the sum of the board scores. Each
/// side must differ by strictly less than half a point.
pub fn validate_team_score(
    white_score: f64,
    black_score: f64,
    boards: &[(f64, f64)],
) -> ScoreCheck {
    let declared = (score(white_score), score(black_score));
    let summed = boards.iter().fold(
        (Decimal::ZERO, Decimal::ZERO),
        |(white, black), &(w, b)| (white + score(w), black + score(b)),
    );

    let within = |a: Decimal, b: Decimal| (a - b).abs() < tolerance();
    if within(declared.0, summed.0) && within(declared.1, summed.1) {
        return ScoreCheck {
            valid: true,
            message: None,
        };
    }

    ScoreCheck {
        valid: false,
        message: Some(format!(
            "declared score {}-{} does not match board total {}-{}",
            declared.0.normalize(),
            declared.1.normalize(),
            summed.0.normalize(),
            summed.1.normalize(),
        )),
    }
}
