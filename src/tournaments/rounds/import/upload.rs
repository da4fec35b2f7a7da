//! Storing an uploaded round.

use serde::{Deserialize, Serialize};

use crate::{
    error::UploadError,
    store::RoundStore,
    tournaments::rounds::import::{
        PlayerEntry, RoundData, reconcile::validate_team_score,
        transform::transform,
    },
    workbook::read_rows,
};

#[derive(Clone, Debug)]
pub struct UploadRequest {
    pub filename: String,
    pub bytes: Vec<u8>,
    /// Takes precedence over any round number in the file name or sheet.
    pub round_override: Option<u32>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct UploadOutcome {
    pub tournament_id: String,
    pub round_number: u32,
    pub pairings_inserted: usize,
    pub boards_inserted: usize,
    /// Team pairings whose declared score disagrees with their boards.
    pub mismatches: Vec<String>,
}

/// Reads, parses and stores one round export.
#[tracing::instrument(skip_all, fields(filename = %request.filename))]
pub fn upload_round<S: RoundStore>(
    store: &mut S,
    request: &UploadRequest,
) -> Result<UploadOutcome, UploadError> {
    if request.bytes.is_empty() {
        return Err(UploadError::MissingFile);
    }

    let rows = read_rows(&request.filename, &request.bytes)?;
    let round = transform(&rows, &request.filename, request.round_override)?;
    store_round(store, &round)
}

/// Writes `round` through `store`. Nothing is written if any step fails;
/// the standings are then recomputed, and a failure there is only logged.
pub fn store_round<S: RoundStore>(
    store: &mut S,
    round: &RoundData,
) -> Result<UploadOutcome, UploadError> {
    let round_number = round.metadata.round_number;

    let (tournament_id, boards_inserted) = store.transaction(|store| {
        let tid = store.resolve_tournament(&round.metadata)?;
        let round_id = store.insert_round(
            &tid,
            round_number,
            round.metadata.round_date.as_deref(),
        )?;

        let mut boards_inserted = 0;
        for pairing in &round.pairings {
            let white_team = store.resolve_team(&tid, &pairing.white_team)?;
            let black_team = store.resolve_team(&tid, &pairing.black_team)?;
            let pairing_id = store.insert_team_pairing(
                &round_id,
                &white_team,
                &black_team,
                pairing,
            )?;

            for board in &pairing.boards {
                let white_id =
                    resolve_entry(store, &white_team, &board.white_player)?;
                let black_id =
                    resolve_entry(store, &black_team, &board.black_player)?;

                store.insert_board_pairing(
                    &pairing_id,
                    white_id.as_deref(),
                    black_id.as_deref(),
                    board,
                )?;
                boards_inserted += 1;

                if let Some(id) = &white_id {
                    store.record_player_result(id, board.result.white_score)?;
                }
                if let Some(id) = &black_id {
                    store.record_player_result(id, board.result.black_score)?;
                }
            }
        }

        store.raise_round_count(&tid, round_number)?;
        Ok((tid, boards_inserted))
    })?;

    let mismatches = reconcile(round);

    if let Err(e) = store.recalculate_standings(&tournament_id) {
        tracing::error!(%e, %tournament_id, "Failed to recalculate standings");
    }

    tracing::info!(
        %tournament_id,
        round_number,
        pairings = round.pairings.len(),
        boards = boards_inserted,
        "Stored round"
    );

    Ok(UploadOutcome {
        tournament_id,
        round_number,
        pairings_inserted: round.pairings.len(),
        boards_inserted,
        mismatches,
    })
}

fn resolve_entry<S: RoundStore>(
    store: &mut S,
    team_id: &str,
    entry: &Option<PlayerEntry>,
) -> Result<Option<String>, UploadError> {
    entry
        .as_ref()
        .map(|player| {
            store.resolve_player(
                team_id,
                &player.name,
                player.rating,
                player.title.as_deref(),
            )
        })
        .transpose()
}

/// Pairings forfeited as a whole often list no boards, so only pairings with
/// boards are checked.
fn reconcile(round: &RoundData) -> Vec<String> {
    round
        .pairings
        .iter()
        .filter(|pairing| !pairing.boards.is_empty())
        .filter_map(|pairing| {
            let boards = pairing
                .boards
                .iter()
                .map(|b| (b.result.white_score, b.result.black_score))
                .collect::<Vec<_>>();
            let check = validate_team_score(
                pairing.white_score,
                pairing.black_score,
                &boards,
            );
            check.message.map(|message| {
                let message = format!(
                    "{} vs {}: {message}",
                    pairing.white_team, pairing.black_team
                );
                tracing::warn!(%message, "Team score mismatch");
                message
            })
        })
        .collect()
}

/// The outcome of [`upload_batch`]. Files after the first failure are not
/// attempted.
#[derive(Debug)]
pub struct BatchReport {
    pub completed: Vec<(String, UploadOutcome)>,
    pub failed: Option<(String, UploadError)>,
    pub skipped: Vec<String>,
}

/// Uploads each file in order, stopping at the first one which fails.
pub fn upload_batch<S: RoundStore>(
    store: &mut S,
    requests: &[UploadRequest],
) -> BatchReport {
    let mut report = BatchReport {
        completed: Vec::new(),
        failed: None,
        skipped: Vec::new(),
    };

    let mut requests = requests.iter();
    for request in requests.by_ref() {
        match upload_round(store, request) {
            Ok(outcome) => {
                report.completed.push((request.filename.clone(), outcome))
            }
            Err(e) => {
                tracing::error!(filename = %request.filename, %e, "Upload failed, stopping batch");
                report.failed = Some((request.filename.clone(), e));
                break;
            }
        }
    }
    report.skipped = requests.map(|r| r.filename.clone()).collect();

    report
}
