use std::collections::HashMap;

use diesel::prelude::*;
use diesel::{connection::LoadConnection, sqlite::Sqlite};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;

use crate::schema::{rounds, team_pairings};

pub mod buchholz;
pub mod points;

pub trait Metric<V> {
    fn compute(
        &self,
        tid: &str,
        conn: &mut impl LoadConnection<Backend = Sqlite>,
    ) -> QueryResult<HashMap<String, V>>;
}

#[derive(Clone, Copy, Debug, PartialEq, PartialOrd, Ord, Eq)]
pub enum MetricValue {
    Integer(i64),
    Float(Decimal),
}

impl MetricValue {
    pub fn to_f64(self) -> f64 {
        match self {
            MetricValue::Integer(integer) => integer as f64,
            MetricValue::Float(decimal) => decimal.to_f64().unwrap_or(0.0),
        }
    }
}

/// Counts stay JSON integers, scores become JSON numbers.
impl From<MetricValue> for serde_json::Value {
    fn from(value: MetricValue) -> Self {
        match value {
            MetricValue::Integer(integer) => integer.into(),
            MetricValue::Float(_) => value.to_f64().into(),
        }
    }
}

/// One team match as seen from one of the two teams.
#[derive(Clone, Debug)]
pub struct TeamMatch {
    pub team_id: String,
    pub opponent_id: String,
    pub scored: Decimal,
    pub conceded: Decimal,
}

impl TeamMatch {
    /// 2 for a win, 1 for a draw and 0 for a loss, judged on the declared
    /// team scores.
    pub fn match_points(&self) -> Decimal {
        match self.scored.cmp(&self.conceded) {
            std::cmp::Ordering::Greater => Decimal::TWO,
            std::cmp::Ordering::Equal => Decimal::ONE,
            std::cmp::Ordering::Less => Decimal::ZERO,
        }
    }
}

pub(crate) fn score(value: f64) -> Decimal {
    Decimal::from_f64_retain(value).unwrap_or_default()
}

/// Every stored team pairing of the tournament, once from each side.
pub fn team_matches(
    tid: &str,
    conn: &mut impl LoadConnection<Backend = Sqlite>,
) -> QueryResult<Vec<TeamMatch>> {
    let pairings = team_pairings::table
        .inner_join(rounds::table)
        .filter(rounds::tournament_id.eq(tid))
        .select((
            team_pairings::white_team_id,
            team_pairings::black_team_id,
            team_pairings::white_score,
            team_pairings::black_score,
        ))
        .load::<(String, String, f64, f64)>(conn)?;

    Ok(pairings
        .into_iter()
        .flat_map(|(white, black, white_score, black_score)| {
            [
                TeamMatch {
                    team_id: white.clone(),
                    opponent_id: black.clone(),
                    scored: score(white_score),
                    conceded: score(black_score),
                },
                TeamMatch {
                    team_id: black,
                    opponent_id: white,
                    scored: score(black_score),
                    conceded: score(white_score),
                },
            ]
        })
        .collect())
}
