//! Importing rounds from spreadsheet exports.
//!
//! An upload flows through [`crate::workbook::read_rows`], then
//! [`transform::transform`] (which leans on [`notation`] and [`identity`]) to
//! produce a [`RoundData`], which [`upload::upload_round`] writes through a
//! [`crate::store::RoundStore`].

use serde::{Deserialize, Serialize};

use crate::tournaments::TournamentMetadata;
use crate::tournaments::rounds::import::notation::BoardResult;

pub mod http;
pub mod identity;
pub mod notation;
pub mod reconcile;
pub mod transform;
pub mod upload;

/// Everything read from a single round export.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RoundData {
    pub metadata: TournamentMetadata,
    pub pairings: Vec<TeamPairingData>,
}

impl RoundData {
    pub fn board_count(&self) -> usize {
        self.pairings.iter().map(|p| p.boards.len()).sum()
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TeamPairingData {
    /// The label of the pairing in the sheet, e.g. `3.1`.
    pub pairing_number: Option<String>,
    pub white_team: String,
    pub black_team: String,
    pub white_score: f64,
    pub black_score: f64,
    pub is_forfeit: bool,
    pub boards: Vec<BoardPairingData>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BoardPairingData {
    pub board_number: u8,
    /// `None` only when this side forfeited.
    pub white_player: Option<PlayerEntry>,
    pub black_player: Option<PlayerEntry>,
    pub result: BoardResult,
}

/// A player as they appear on one board. The rating is the one printed for
/// this game, not necessarily the player's current rating.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerEntry {
    pub name: String,
    pub title: Option<String>,
    pub rating: Option<i64>,
}
