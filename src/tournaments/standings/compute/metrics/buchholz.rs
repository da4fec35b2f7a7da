use std::collections::HashMap;

use diesel::{QueryResult, connection::LoadConnection, sqlite::Sqlite};
use rust_decimal::Decimal;

use crate::tournaments::standings::compute::metrics::{
    Metric, MetricValue, team_matches,
};

/// The sum of the match points of every opponent a team has faced (once per
/// meeting).
pub struct BuchholzComputer;

impl Metric<MetricValue> for BuchholzComputer {
    fn compute(
        &self,
        tid: &str,
        conn: &mut impl LoadConnection<Backend = Sqlite>,
    ) -> QueryResult<HashMap<String, MetricValue>> {
        let matches = team_matches(tid, conn)?;

        let mut match_points: HashMap<&str, Decimal> = HashMap::new();
        for m in &matches {
            *match_points.entry(&m.team_id).or_insert(Decimal::ZERO) +=
                m.match_points();
        }

        let mut buchholz: HashMap<String, Decimal> = HashMap::new();
        for m in &matches {
            let opponent = match_points
                .get(m.opponent_id.as_str())
                .copied()
                .unwrap_or(Decimal::ZERO);
            *buchholz.entry(m.team_id.clone()).or_insert(Decimal::ZERO) +=
                opponent;
        }

        Ok(buchholz
            .into_iter()
            .map(|(team_id, value)| (team_id, MetricValue::Float(value)))
            .collect())
    }
}
