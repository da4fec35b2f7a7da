use diesel::{connection::LoadConnection, prelude::*, sqlite::Sqlite};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::schema::tournaments;

pub mod players;
pub mod rounds;
pub mod standings;
pub mod teams;

#[derive(Queryable, Serialize, Clone, Debug)]
pub struct Tournament {
    pub id: String,
    pub name: String,
    pub organizer: Option<String>,
    pub chief_arbiter: Option<String>,
    pub deputy_chief_arbiter: Option<String>,
    pub tournament_director: Option<String>,
    pub arbiter: Option<String>,
    pub location: Option<String>,
    pub date: Option<String>,
    /// The highest round number uploaded so far.
    pub rounds: i64,
    pub created_at: chrono::NaiveDateTime,
}

/// The tournament-level details printed at the top of a round export.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TournamentMetadata {
    pub name: String,
    pub organizer: Option<String>,
    pub chief_arbiter: Option<String>,
    pub deputy_chief_arbiter: Option<String>,
    pub tournament_director: Option<String>,
    pub arbiter: Option<String>,
    pub location: Option<String>,
    pub date: Option<String>,
    pub round_number: u32,
    pub round_date: Option<String>,
}

impl Tournament {
    pub fn fetch_by_name(
        name: &str,
        conn: &mut impl LoadConnection<Backend = Sqlite>,
    ) -> QueryResult<Option<Tournament>> {
        tournaments::table
            .filter(tournaments::name.eq(name))
            .first::<Tournament>(conn)
            .optional()
    }

    /// Returns the id of the tournament called `metadata.name`, creating it if
    /// this is the first round seen for it. The remaining metadata is only
    /// written on creation; later rounds never overwrite it.
    #[tracing::instrument(skip(conn, metadata), fields(name = %metadata.name))]
    pub fn resolve(
        metadata: &TournamentMetadata,
        conn: &mut impl LoadConnection<Backend = Sqlite>,
    ) -> QueryResult<String> {
        if let Some(existing) = Self::fetch_by_name(&metadata.name, conn)? {
            return Ok(existing.id);
        }

        let tid = Uuid::now_v7().to_string();
        let n = diesel::insert_into(tournaments::table)
            .values((
                tournaments::id.eq(&tid),
                tournaments::name.eq(&metadata.name),
                tournaments::organizer.eq(&metadata.organizer),
                tournaments::chief_arbiter.eq(&metadata.chief_arbiter),
                tournaments::deputy_chief_arbiter
                    .eq(&metadata.deputy_chief_arbiter),
                tournaments::tournament_director
                    .eq(&metadata.tournament_director),
                tournaments::arbiter.eq(&metadata.arbiter),
                tournaments::location.eq(&metadata.location),
                tournaments::date.eq(&metadata.date),
                tournaments::rounds.eq(0),
                tournaments::created_at.eq(chrono::Utc::now().naive_utc()),
            ))
            .on_conflict_do_nothing()
            .execute(conn)?;

        if n == 1 {
            tracing::info!(%tid, "Created tournament");
            return Ok(tid);
        }

        // lost a race with another upload creating the same tournament
        Self::fetch_by_name(&metadata.name, conn)?
            .map(|t| t.id)
            .ok_or(diesel::result::Error::NotFound)
    }

    /// Raises the tournament's round counter to `round_number` if it is
    /// currently lower.
    pub fn raise_round_count(
        tid: &str,
        round_number: u32,
        conn: &mut impl LoadConnection<Backend = Sqlite>,
    ) -> QueryResult<()> {
        diesel::update(
            tournaments::table.filter(
                tournaments::id
                    .eq(tid)
                    .and(tournaments::rounds.lt(i64::from(round_number))),
            ),
        )
        .set(tournaments::rounds.eq(i64::from(round_number)))
        .execute(conn)?;
        Ok(())
    }
}
