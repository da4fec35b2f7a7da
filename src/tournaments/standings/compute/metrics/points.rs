use std::collections::HashMap;

use diesel::{QueryResult, connection::LoadConnection, sqlite::Sqlite};
use rust_decimal::Decimal;

use crate::tournaments::standings::compute::metrics::{
    Metric, MetricValue, team_matches,
};

pub struct MatchPointsComputer;

impl Metric<MetricValue> for MatchPointsComputer {
    fn compute(
        &self,
        tid: &str,
        conn: &mut impl LoadConnection<Backend = Sqlite>,
    ) -> QueryResult<HashMap<String, MetricValue>> {
        let mut match_points = HashMap::new();
        for m in team_matches(tid, conn)? {
            *match_points.entry(m.team_id.clone()).or_insert(Decimal::ZERO) +=
                m.match_points();
        }

        Ok(match_points
            .into_iter()
            .map(|(team_id, points)| (team_id, MetricValue::Float(points)))
            .collect())
    }
}

/// Sum of the declared scores of a team across all of its matches.
pub struct GamePointsComputer;

impl Metric<MetricValue> for GamePointsComputer {
    fn compute(
        &self,
        tid: &str,
        conn: &mut impl LoadConnection<Backend = Sqlite>,
    ) -> QueryResult<HashMap<String, MetricValue>> {
        let mut game_points = HashMap::new();
        for m in team_matches(tid, conn)? {
            *game_points.entry(m.team_id).or_insert(Decimal::ZERO) += m.scored;
        }

        Ok(game_points
            .into_iter()
            .map(|(team_id, points)| (team_id, MetricValue::Float(points)))
            .collect())
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MatchRecord {
    pub wins: i64,
    pub draws: i64,
    pub losses: i64,
}

impl MatchRecord {
    pub fn tie_breaks(&self) -> [(&'static str, MetricValue); 3] {
        [
            ("wins", MetricValue::Integer(self.wins)),
            ("draws", MetricValue::Integer(self.draws)),
            ("losses", MetricValue::Integer(self.losses)),
        ]
    }
}

pub struct MatchRecordComputer;

impl Metric<MatchRecord> for MatchRecordComputer {
    fn compute(
        &self,
        tid: &str,
        conn: &mut impl LoadConnection<Backend = Sqlite>,
    ) -> QueryResult<HashMap<String, MatchRecord>> {
        let mut records: HashMap<String, MatchRecord> = HashMap::new();
        for m in team_matches(tid, conn)? {
            let record = records.entry(m.team_id).or_default();
            match m.scored.cmp(&m.conceded) {
                std::cmp::Ordering::Greater => record.wins += 1,
                std::cmp::Ordering::Equal => record.draws += 1,
                std::cmp::Ordering::Less => record.losses += 1,
            }
        }
        Ok(records)
    }
}
