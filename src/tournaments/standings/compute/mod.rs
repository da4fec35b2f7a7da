use std::collections::HashMap;

use diesel::prelude::*;
use diesel::{connection::LoadConnection, sqlite::Sqlite};
use serde_json::{Map, Value};

use crate::schema::teams;
use crate::tournaments::standings::compute::metrics::Metric;
use crate::tournaments::standings::compute::metrics::MetricValue;
use crate::tournaments::standings::compute::metrics::buchholz::BuchholzComputer;
use crate::tournaments::standings::compute::metrics::points::{
    GamePointsComputer, MatchPointsComputer, MatchRecordComputer,
};
use crate::tournaments::teams::Team;

pub mod metrics;

pub struct TournamentTeamStandings {
    /// Match points, game points and Buchholz, in that order.
    pub metrics_of_team: HashMap<String, Vec<MetricValue>>,
    pub sorted: Vec<Team>,
}

impl TournamentTeamStandings {
    /// Recomputes every team's match points, game points and tie-breaks
    /// from the stored team pairings and writes them back to the teams
    /// table.
    #[tracing::instrument(skip(conn))]
    pub fn recalculate(
        tid: &str,
        conn: &mut impl LoadConnection<Backend = Sqlite>,
    ) -> QueryResult<Self> {
        let match_points = MatchPointsComputer.compute(tid, conn)?;
        let game_points = GamePointsComputer.compute(tid, conn)?;
        let buchholz = BuchholzComputer.compute(tid, conn)?;
        let records = MatchRecordComputer.compute(tid, conn)?;

        let zero = MetricValue::Float(rust_decimal::Decimal::ZERO);
        let metrics_of_team: HashMap<String, Vec<MetricValue>> =
            Team::of_tournament(tid, conn)?
                .into_iter()
                .map(|team| {
                    let vals = [&match_points, &game_points, &buchholz]
                        .iter()
                        .map(|metric| {
                            metric.get(&team.id).copied().unwrap_or(zero)
                        })
                        .collect();
                    (team.id, vals)
                })
                .collect();

        for (team_id, vals) in &metrics_of_team {
            let record = records.get(team_id).copied().unwrap_or_default();
            let tie_breaks = record
                .tie_breaks()
                .into_iter()
                .chain([("buchholz", vals[2])])
                .map(|(name, value)| (name.to_string(), Value::from(value)))
                .collect::<Map<String, Value>>();

            diesel::update(teams::table.filter(teams::id.eq(team_id)))
                .set((
                    teams::match_points.eq(vals[0].to_f64()),
                    teams::game_points.eq(vals[1].to_f64()),
                    teams::tie_breaks.eq(Value::Object(tie_breaks).to_string()),
                ))
                .execute(conn)?;
        }

        let mut sorted = Team::of_tournament(tid, conn)?;
        // highest first; `of_tournament` already orders by name
        sorted.sort_by_cached_key(|team| {
            std::cmp::Reverse(metrics_of_team.get(&team.id).cloned())
        });

        tracing::debug!(teams = sorted.len(), "Recalculated standings");

        Ok(Self {
            metrics_of_team,
            sorted,
        })
    }
}
