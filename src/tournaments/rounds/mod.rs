use diesel::{connection::LoadConnection, prelude::*, sqlite::Sqlite};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    schema::{board_pairings, rounds, team_pairings},
    tournaments::rounds::import::{BoardPairingData, TeamPairingData},
};

pub mod import;

#[derive(Serialize, Deserialize, Queryable, Clone, Debug)]
pub struct Round {
    pub id: String,
    pub tournament_id: String,
    pub round_number: i64,
    pub round_date: Option<String>,
    pub created_at: chrono::NaiveDateTime,
}

impl Round {
    pub fn of_tournament(
        tid: &str,
        conn: &mut impl LoadConnection<Backend = Sqlite>,
    ) -> QueryResult<Vec<Round>> {
        rounds::table
            .filter(rounds::tournament_id.eq(tid))
            .order_by(rounds::round_number.asc())
            .load::<Round>(conn)
    }

    /// Inserts a new round. Fails with a unique violation if the tournament
    /// already has a round with this number.
    pub fn insert(
        tid: &str,
        round_number: u32,
        round_date: Option<&str>,
        conn: &mut impl LoadConnection<Backend = Sqlite>,
    ) -> QueryResult<String> {
        let round_id = Uuid::now_v7().to_string();
        diesel::insert_into(rounds::table)
            .values((
                rounds::id.eq(&round_id),
                rounds::tournament_id.eq(tid),
                rounds::round_number.eq(i64::from(round_number)),
                rounds::round_date.eq(round_date),
                rounds::created_at.eq(chrono::Utc::now().naive_utc()),
            ))
            .execute(conn)?;
        Ok(round_id)
    }
}

#[derive(Serialize, Deserialize, Queryable, Clone, Debug)]
pub struct TeamPairing {
    pub id: String,
    pub round_id: String,
    pub pairing_number: Option<String>,
    pub white_team_id: String,
    pub black_team_id: String,
    pub white_score: f64,
    pub black_score: f64,
    pub is_forfeit: bool,
}

impl TeamPairing {
    pub fn of_round(
        round_id: &str,
        conn: &mut impl LoadConnection<Backend = Sqlite>,
    ) -> QueryResult<Vec<TeamPairing>> {
        team_pairings::table
            .filter(team_pairings::round_id.eq(round_id))
            .load::<TeamPairing>(conn)
    }

    pub fn insert(
        round_id: &str,
        white_team_id: &str,
        black_team_id: &str,
        pairing: &TeamPairingData,
        conn: &mut impl LoadConnection<Backend = Sqlite>,
    ) -> QueryResult<String> {
        let id = Uuid::now_v7().to_string();
        diesel::insert_into(team_pairings::table)
            .values((
                team_pairings::id.eq(&id),
                team_pairings::round_id.eq(round_id),
                team_pairings::pairing_number.eq(&pairing.pairing_number),
                team_pairings::white_team_id.eq(white_team_id),
                team_pairings::black_team_id.eq(black_team_id),
                team_pairings::white_score.eq(pairing.white_score),
                team_pairings::black_score.eq(pairing.black_score),
                team_pairings::is_forfeit.eq(pairing.is_forfeit),
            ))
            .execute(conn)?;
        Ok(id)
    }
}

#[derive(Serialize, Deserialize, Queryable, Clone, Debug)]
pub struct BoardPairing {
    pub id: String,
    pub team_pairing_id: String,
    pub board_number: i64,
    pub white_player_id: Option<String>,
    pub black_player_id: Option<String>,
    pub white_rating: Option<i64>,
    pub black_rating: Option<i64>,
    /// One of `1-0`, `0-1`, `½-½`, `+:-`, `-:+` or `-:-`.
    pub result: String,
    pub white_score: f64,
    pub black_score: f64,
    pub white_result: String,
    pub black_result: String,
}

impl BoardPairing {
    pub fn of_team_pairing(
        team_pairing_id: &str,
        conn: &mut impl LoadConnection<Backend = Sqlite>,
    ) -> QueryResult<Vec<BoardPairing>> {
        board_pairings::table
            .filter(board_pairings::team_pairing_id.eq(team_pairing_id))
            .order_by(board_pairings::board_number.asc())
            .load::<BoardPairing>(conn)
    }

    pub fn insert(
        team_pairing_id: &str,
        white_player_id: Option<&str>,
        black_player_id: Option<&str>,
        board: &BoardPairingData,
        conn: &mut impl LoadConnection<Backend = Sqlite>,
    ) -> QueryResult<String> {
        let id = Uuid::now_v7().to_string();
        let result = &board.result;
        diesel::insert_into(board_pairings::table)
            .values((
                board_pairings::id.eq(&id),
                board_pairings::team_pairing_id.eq(team_pairing_id),
                board_pairings::board_number.eq(i64::from(board.board_number)),
                board_pairings::white_player_id.eq(white_player_id),
                board_pairings::black_player_id.eq(black_player_id),
                board_pairings::white_rating
                    .eq(board.white_player.as_ref().and_then(|p| p.rating)),
                board_pairings::black_rating
                    .eq(board.black_player.as_ref().and_then(|p| p.rating)),
                board_pairings::result.eq(result.result.as_str()),
                board_pairings::white_score.eq(result.white_score),
                board_pairings::black_score.eq(result.black_score),
                board_pairings::white_result.eq(result.white_result.as_str()),
                board_pairings::black_result.eq(result.black_result.as_str()),
            ))
            .execute(conn)?;
        Ok(id)
    }
}
