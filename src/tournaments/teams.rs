use std::collections::BTreeMap;

use diesel::{connection::LoadConnection, prelude::*, sqlite::Sqlite};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::schema::teams;

#[derive(Serialize, Deserialize, Queryable, Clone, Debug)]
pub struct Team {
    pub id: String,
    pub tournament_id: String,
    pub name: String,
    pub match_points: f64,
    pub game_points: f64,
    /// JSON object of tie-break name to value.
    pub tie_breaks: String,
}

impl Team {
    /// Empty if the stored JSON is unreadable.
    pub fn tie_breaks(&self) -> BTreeMap<String, f64> {
        serde_json::from_str(&self.tie_breaks).unwrap_or_else(|e| {
            tracing::warn!(team_id = %self.id, %e, "Unreadable tie-breaks");
            BTreeMap::new()
        })
    }

    pub fn of_tournament(
        tid: &str,
        conn: &mut impl LoadConnection<Backend = Sqlite>,
    ) -> QueryResult<Vec<Team>> {
        teams::table
            .filter(teams::tournament_id.eq(tid))
            .order_by(teams::name.asc())
            .load::<Team>(conn)
    }

    fn id_by_name(
        tid: &str,
        name: &str,
        conn: &mut impl LoadConnection<Backend = Sqlite>,
    ) -> QueryResult<Option<String>> {
        teams::table
            .filter(teams::tournament_id.eq(tid).and(teams::name.eq(name)))
            .select(teams::id)
            .first::<String>(conn)
            .optional()
    }

    /// Finds the team called `name` in the tournament, creating it (with no
    /// points) if it does not exist yet.
    #[tracing::instrument(skip(conn))]
    pub fn resolve(
        tid: &str,
        name: &str,
        conn: &mut impl LoadConnection<Backend = Sqlite>,
    ) -> QueryResult<String> {
        if let Some(id) = Self::id_by_name(tid, name, conn)? {
            return Ok(id);
        }

        let team_id = Uuid::now_v7().to_string();
        let n = diesel::insert_into(teams::table)
            .values((
                teams::id.eq(&team_id),
                teams::tournament_id.eq(tid),
                teams::name.eq(name),
                teams::match_points.eq(0.0),
                teams::game_points.eq(0.0),
                teams::tie_breaks.eq("{}"),
            ))
            .on_conflict_do_nothing()
            .execute(conn)?;

        if n == 1 {
            tracing::debug!(%team_id, "Created team");
            return Ok(team_id);
        }

        Self::id_by_name(tid, name, conn)?
            .ok_or(diesel::result::Error::NotFound)
    }
}

#[cfg(test)]
mod tests {
    use super::Team;

    fn team(tie_breaks: &str) -> Team {
        Team {
            id: "team".to_string(),
            tournament_id: "tournament".to_string(),
            name: "Knights".to_string(),
            match_points: 0.0,
            game_points: 0.0,
            tie_breaks: tie_breaks.to_string(),
        }
    }

    #[test]
    fn test_tie_breaks() {
        let tie_breaks = team(r#"{"wins": 2, "buchholz": 3.5}"#).tie_breaks();
        assert_eq!(tie_breaks["wins"], 2.0);
        assert_eq!(tie_breaks["buchholz"], 3.5);

        assert!(team("not json").tie_breaks().is_empty());
    }
}
