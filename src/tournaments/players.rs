use diesel::{connection::LoadConnection, prelude::*, sqlite::Sqlite};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::schema::players;

#[derive(Serialize, Deserialize, Queryable, Clone, Debug)]
pub struct Player {
    pub id: String,
    pub team_id: String,
    pub name: String,
    pub rating: Option<i64>,
    pub title: Option<String>,
    pub games_played: i64,
    pub points: f64,
}

impl Player {
    pub fn of_team(
        team_id: &str,
        conn: &mut impl LoadConnection<Backend = Sqlite>,
    ) -> QueryResult<Vec<Player>> {
        players::table
            .filter(players::team_id.eq(team_id))
            .order_by(players::name.asc())
            .load::<Player>(conn)
    }

    fn id_by_name(
        team_id: &str,
        name: &str,
        conn: &mut impl LoadConnection<Backend = Sqlite>,
    ) -> QueryResult<Option<String>> {
        players::table
            .filter(players::team_id.eq(team_id).and(players::name.eq(name)))
            .select(players::id)
            .first::<String>(conn)
            .optional()
    }

    /// Finds the player called `name` in the team, creating them if needed.
    ///
    /// `rating` and `title` are only stored when the player is created; an
    /// existing player keeps whatever was recorded on their first appearance.
    #[tracing::instrument(skip(conn))]
    pub fn resolve(
        team_id: &str,
        name: &str,
        rating: Option<i64>,
        title: Option<&str>,
        conn: &mut impl LoadConnection<Backend = Sqlite>,
    ) -> QueryResult<String> {
        if let Some(id) = Self::id_by_name(team_id, name, conn)? {
            return Ok(id);
        }

        let player_id = Uuid::now_v7().to_string();
        let n = diesel::insert_into(players::table)
            .values((
                players::id.eq(&player_id),
                players::team_id.eq(team_id),
                players::name.eq(name),
                players::rating.eq(rating),
                players::title.eq(title),
                players::games_played.eq(0),
                players::points.eq(0.0),
            ))
            .on_conflict_do_nothing()
            .execute(conn)?;

        if n == 1 {
            return Ok(player_id);
        }

        Self::id_by_name(team_id, name, conn)?
            .ok_or(diesel::result::Error::NotFound)
    }

    /// Counts one more game for the player, worth `points`.
    pub fn record_result(
        player_id: &str,
        points: f64,
        conn: &mut impl LoadConnection<Backend = Sqlite>,
    ) -> QueryResult<()> {
        let n = diesel::update(players::table.filter(players::id.eq(player_id)))
            .set((
                players::games_played.eq(players::games_played + 1),
                players::points.eq(players::points + points),
            ))
            .execute(conn)?;

        if n != 1 {
            return Err(diesel::result::Error::NotFound);
        }
        Ok(())
    }
}
