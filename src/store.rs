//! The persistence contract used by the upload pipeline, and its SQLite
//! implementation.

use diesel::{
    Connection,
    connection::{LoadConnection, TransactionManager},
    result::DatabaseErrorKind,
    sqlite::Sqlite,
};

use crate::{
    error::UploadError,
    tournaments::{
        Tournament, TournamentMetadata,
        players::Player,
        rounds::{
            BoardPairing, Round, TeamPairing,
            import::{BoardPairingData, TeamPairingData},
        },
        standings::compute::TournamentTeamStandings,
        teams::Team,
    },
};

/// What the round upload needs from storage.
///
/// Everything done inside [`RoundStore::transaction`] is committed together
/// or not at all.
pub trait RoundStore {
    fn transaction<T>(
        &mut self,
        f: impl FnOnce(&mut Self) -> Result<T, UploadError>,
    ) -> Result<T, UploadError>;

    fn resolve_tournament(
        &mut self,
        metadata: &TournamentMetadata,
    ) -> Result<String, UploadError>;

    fn resolve_team(
        &mut self,
        tournament_id: &str,
        name: &str,
    ) -> Result<String, UploadError>;

    fn resolve_player(
        &mut self,
        team_id: &str,
        name: &str,
        rating: Option<i64>,
        title: Option<&str>,
    ) -> Result<String, UploadError>;

    /// Fails with [`UploadError::DuplicateRound`] if the round exists.
    fn insert_round(
        &mut self,
        tournament_id: &str,
        round_number: u32,
        round_date: Option<&str>,
    ) -> Result<String, UploadError>;

    fn insert_team_pairing(
        &mut self,
        round_id: &str,
        white_team_id: &str,
        black_team_id: &str,
        pairing: &TeamPairingData,
    ) -> Result<String, UploadError>;

    fn insert_board_pairing(
        &mut self,
        team_pairing_id: &str,
        white_player_id: Option<&str>,
        black_player_id: Option<&str>,
        board: &BoardPairingData,
    ) -> Result<String, UploadError>;

    fn record_player_result(
        &mut self,
        player_id: &str,
        points: f64,
    ) -> Result<(), UploadError>;

    fn raise_round_count(
        &mut self,
        tournament_id: &str,
        round_number: u32,
    ) -> Result<(), UploadError>;

    fn recalculate_standings(
        &mut self,
        tournament_id: &str,
    ) -> Result<(), UploadError>;
}

pub struct SqliteStore<C> {
    conn: C,
}

impl<C> SqliteStore<C>
where
    C: LoadConnection<Backend = Sqlite>,
{
    pub fn new(conn: C) -> Self {
        Self { conn }
    }

    pub fn conn(&mut self) -> &mut C {
        &mut self.conn
    }
}

impl<C> RoundStore for SqliteStore<C>
where
    C: LoadConnection<Backend = Sqlite>,
{
    fn transaction<T>(
        &mut self,
        f: impl FnOnce(&mut Self) -> Result<T, UploadError>,
    ) -> Result<T, UploadError> {
        <C as Connection>::TransactionManager::begin_transaction(
            &mut self.conn,
        )?;

        match f(self) {
            Ok(value) => {
                <C as Connection>::TransactionManager::commit_transaction(
                    &mut self.conn,
                )?;
                Ok(value)
            }
            Err(e) => {
                if let Err(rollback) =
                    <C as Connection>::TransactionManager::rollback_transaction(
                        &mut self.conn,
                    )
                {
                    tracing::error!(%rollback, "Failed to roll back transaction");
                }
                Err(e)
            }
        }
    }

    fn resolve_tournament(
        &mut self,
        metadata: &TournamentMetadata,
    ) -> Result<String, UploadError> {
        Ok(Tournament::resolve(metadata, &mut self.conn)?)
    }

    fn resolve_team(
        &mut self,
        tournament_id: &str,
        name: &str,
    ) -> Result<String, UploadError> {
        Ok(Team::resolve(tournament_id, name, &mut self.conn)?)
    }

    fn resolve_player(
        &mut self,
        team_id: &str,
        name: &str,
        rating: Option<i64>,
        title: Option<&str>,
    ) -> Result<String, UploadError> {
        Ok(Player::resolve(team_id, name, rating, title, &mut self.conn)?)
    }

    fn insert_round(
        &mut self,
        tournament_id: &str,
        round_number: u32,
        round_date: Option<&str>,
    ) -> Result<String, UploadError> {
        match Round::insert(tournament_id, round_number, round_date, &mut self.conn)
        {
            Ok(id) => Ok(id),
            Err(diesel::result::Error::DatabaseError(
                DatabaseErrorKind::UniqueViolation,
                _,
            )) => Err(UploadError::DuplicateRound { round_number }),
            Err(e) => Err(e.into()),
        }
    }

    fn insert_team_pairing(
        &mut self,
        round_id: &str,
        white_team_id: &str,
        black_team_id: &str,
        pairing: &TeamPairingData,
    ) -> Result<String, UploadError> {
        Ok(TeamPairing::insert(
            round_id,
            white_team_id,
            black_team_id,
            pairing,
            &mut self.conn,
        )?)
    }

    fn insert_board_pairing(
        &mut self,
        team_pairing_id: &str,
        white_player_id: Option<&str>,
        black_player_id: Option<&str>,
        board: &BoardPairingData,
    ) -> Result<String, UploadError> {
        Ok(BoardPairing::insert(
            team_pairing_id,
            white_player_id,
            black_player_id,
            board,
            &mut self.conn,
        )?)
    }

    fn record_player_result(
        &mut self,
        player_id: &str,
        points: f64,
    ) -> Result<(), UploadError> {
        Ok(Player::record_result(player_id, points, &mut self.conn)?)
    }

    fn raise_round_count(
        &mut self,
        tournament_id: &str,
        round_number: u32,
    ) -> Result<(), UploadError> {
        Ok(Tournament::raise_round_count(
            tournament_id,
            round_number,
            &mut self.conn,
        )?)
    }

    fn recalculate_standings(
        &mut self,
        tournament_id: &str,
    ) -> Result<(), UploadError> {
        TournamentTeamStandings::recalculate(tournament_id, &mut self.conn)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::error::UploadError;
    use crate::state::test_pool;
    use crate::store::{RoundStore, SqliteStore};
    use crate::tournaments::Tournament;
    use crate::tournaments::TournamentMetadata;

    fn metadata(name: &str) -> TournamentMetadata {
        TournamentMetadata {
            name: name.to_string(),
            organizer: Some("Chess Club".to_string()),
            chief_arbiter: None,
            deputy_chief_arbiter: None,
            tournament_director: None,
            arbiter: None,
            location: None,
            date: None,
            round_number: 1,
            round_date: None,
        }
    }

    #[test]
    fn test_resolve_is_idempotent() {
        let pool = test_pool();
        let mut store = SqliteStore::new(pool.get().unwrap());

        let first = store.resolve_tournament(&metadata("Open")).unwrap();
        let second = store.resolve_tournament(&metadata("Open")).unwrap();
        assert_eq!(first, second);

        let team = store.resolve_team(&first, "Knights").unwrap();
        assert_eq!(team, store.resolve_team(&first, "Knights").unwrap());

        let player = store
            .resolve_player(&team, "Smith John", Some(2100), None)
            .unwrap();
        let again = store
            .resolve_player(&team, "Smith John", Some(2200), Some("FM"))
            .unwrap();
        assert_eq!(player, again);
    }

    #[test]
    fn test_duplicate_round_is_reported() {
        let pool = test_pool();
        let mut store = SqliteStore::new(pool.get().unwrap());

        let tid = store.resolve_tournament(&metadata("Open")).unwrap();
        store.insert_round(&tid, 3, None).unwrap();
        assert!(matches!(
            store.insert_round(&tid, 3, None),
            Err(UploadError::DuplicateRound { round_number: 3 })
        ));
    }

    #[test]
    fn test_failed_transaction_rolls_back() {
        let pool = test_pool();
        let mut store = SqliteStore::new(pool.get().unwrap());

        let result: Result<(), UploadError> = store.transaction(|store| {
            store.resolve_tournament(&metadata("Rolled Back"))?;
            Err(UploadError::MissingFile)
        });
        assert!(matches!(result, Err(UploadError::MissingFile)));

        assert!(
            Tournament::fetch_by_name("Rolled Back", store.conn())
                .unwrap()
                .is_none()
        );
    }
}
