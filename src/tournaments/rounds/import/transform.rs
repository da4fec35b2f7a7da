//! Turns the rows of a round export into a [`RoundData`].
//!
//! Exports are only loosely structured, so rows are recognised by their first
//! non-empty cell: a pairing label (`3.1`) opens a team pairing, a board
//! number (`1`..`8`) adds a board to the open pairing, and anything before
//! the first pairing is read as tournament metadata. Rows which fit none of
//! these are skipped.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::{
    error::ParseError,
    tournaments::{
        TournamentMetadata,
        rounds::import::{
            BoardPairingData, PlayerEntry, RoundData, TeamPairingData,
            identity::{PlayerName, detect_round_number, extract_player_title},
            notation::{
                BoardResult, ResultKind, looks_like_board_result,
                parse_board_result, parse_team_score,
            },
        },
    },
    validation::{is_board_number, is_chess_title, is_team_pairing_number},
    workbook::{Cell, Row},
};

/// Ratings outside this range are some other number (e.g. a FIDE id).
const MAX_RATING: i64 = 3500;

/// Builds the round held in `rows`. An explicit `round_override` always wins
/// over the round number found in `filename` or in the sheet itself.
#[tracing::instrument(skip(rows), fields(rows = rows.len()))]
pub fn transform(
    rows: &[Row],
    filename: &str,
    round_override: Option<u32>,
) -> Result<RoundData, ParseError> {
    let mut header = SheetHeader::default();
    let mut pairings: Vec<TeamPairingData> = Vec::new();
    let mut current: Option<TeamPairingData> = None;
    let mut seen_pairing_row = false;

    for (idx, row) in rows.iter().enumerate() {
        let line = idx + 1;
        let cells = row
            .iter()
            .filter(|cell| !cell.is_empty())
            .map(Field::new)
            .collect::<Vec<_>>();

        let Some(first) = cells.first().map(|field| field.text.as_str())
        else {
            continue;
        };

        if is_team_pairing_number(first) {
            seen_pairing_row = true;
            pairings.extend(current.take());
            current = parse_team_pairing_row(line, &cells);
        } else if is_board_number(first) && seen_pairing_row {
            let Some(pairing) = current.as_mut() else {
                tracing::warn!(
                    line,
                    "Skipping board row which does not belong to a valid team pairing"
                );
                continue;
            };
            let Some(board) = parse_board_row(line, &cells) else {
                continue;
            };
            if pairing
                .boards
                .iter()
                .any(|b| b.board_number == board.board_number)
            {
                tracing::warn!(
                    line,
                    board = board.board_number,
                    "Skipping repeated board number"
                );
                continue;
            }
            pairing.boards.push(board);
        } else if !seen_pairing_row {
            let texts = cells
                .iter()
                .map(|field| field.text.clone())
                .collect::<Vec<_>>();
            header.read_row(&texts);
        } else {
            tracing::warn!(line, "Skipping unrecognised row");
        }
    }
    pairings.extend(current.take());

    let round_number = match round_override.filter(|n| *n > 0) {
        Some(n) => n,
        None => detect_round_number(filename)
            .filter(|n| *n > 0)
            .or(header.round_number.filter(|n| *n > 0))
            .ok_or(ParseError::RoundNumberUnresolved)?,
    };

    let name = header.name.ok_or(ParseError::MissingTournamentName)?;

    if pairings.is_empty() {
        return Err(ParseError::NoPairings);
    }

    let data = RoundData {
        metadata: TournamentMetadata {
            name,
            organizer: header.organizer,
            chief_arbiter: header.chief_arbiter,
            deputy_chief_arbiter: header.deputy_chief_arbiter,
            tournament_director: header.tournament_director,
            arbiter: header.arbiter,
            location: header.location,
            date: header.date,
            round_number,
            round_date: header.round_date,
        },
        pairings,
    };

    tracing::info!(
        tournament = %data.metadata.name,
        round_number,
        pairings = data.pairings.len(),
        boards = data.board_count(),
        "Parsed round"
    );

    Ok(data)
}

/// A non-empty cell. Numbers are never names, whether the sheet stored them
/// as numbers or as text.
#[derive(Debug)]
struct Field {
    text: String,
    numeric: bool,
}

impl Field {
    fn new(cell: &Cell) -> Self {
        let text = cell.text();
        let numeric = match cell {
            Cell::Number(_) => true,
            _ => text.parse::<f64>().is_ok_and(f64::is_finite),
        };
        Self { text, numeric }
    }
}

#[derive(Default, Debug)]
struct SheetHeader {
    name: Option<String>,
    organizer: Option<String>,
    chief_arbiter: Option<String>,
    deputy_chief_arbiter: Option<String>,
    tournament_director: Option<String>,
    arbiter: Option<String>,
    location: Option<String>,
    date: Option<String>,
    round_number: Option<u32>,
    round_date: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum HeaderField {
    Organizer,
    ChiefArbiter,
    DeputyChiefArbiter,
    TournamentDirector,
    Arbiter,
    Location,
    Date,
}

impl HeaderField {
    fn from_key(key: &str) -> Option<Self> {
        let key = key.trim().trim_end_matches(':').trim().to_lowercase();
        if key.is_empty() {
            None
        } else if key.starts_with("organi") {
            Some(HeaderField::Organizer)
        } else if key.starts_with("deputy") {
            Some(HeaderField::DeputyChiefArbiter)
        } else if key.contains("chief arbiter") {
            Some(HeaderField::ChiefArbiter)
        } else if key.contains("director") {
            Some(HeaderField::TournamentDirector)
        } else if key.starts_with("arbiter") {
            Some(HeaderField::Arbiter)
        } else if ["location", "place", "venue", "town"]
            .iter()
            .any(|k| key.starts_with(k))
        {
            Some(HeaderField::Location)
        } else if key.starts_with("date") {
            Some(HeaderField::Date)
        } else {
            None
        }
    }
}

impl SheetHeader {
    fn read_row(&mut self, cells: &[String]) {
        static ROUND: Lazy<Regex> = Lazy::new(|| {
            Regex::new(r"(?i)^round\s*(\d+)(?:\s+on\s+(.+?))?\s*$").unwrap()
        });

        let joined = cells.join(" ");
        if let Some(caps) = ROUND.captures(&joined) {
            if self.round_number.is_none() {
                self.round_number = caps[1].parse().ok();
                self.round_date = caps.get(2).map(|m| m.as_str().to_string());
            }
            return;
        }

        let (key, value) = match cells {
            [key, rest @ ..] if !rest.is_empty() => {
                (key.as_str(), Some(rest.join(" ")))
            }
            [single] => match single.split_once(':') {
                Some((key, value)) => (key, Some(value.to_string())),
                None => (single.as_str(), None),
            },
            _ => return,
        };

        match (HeaderField::from_key(key), value) {
            (Some(field), Some(value)) if !value.trim().is_empty() => {
                let slot = match field {
                    HeaderField::Organizer => &mut self.organizer,
                    HeaderField::ChiefArbiter => &mut self.chief_arbiter,
                    HeaderField::DeputyChiefArbiter => {
                        &mut self.deputy_chief_arbiter
                    }
                    HeaderField::TournamentDirector => {
                        &mut self.tournament_director
                    }
                    HeaderField::Arbiter => &mut self.arbiter,
                    HeaderField::Location => &mut self.location,
                    HeaderField::Date => &mut self.date,
                };
                if slot.is_none() {
                    *slot = Some(value.trim().to_string());
                }
            }
            (Some(_), _) => {}
            (None, _) if cells.len() == 1 && self.name.is_none() => {
                self.name = Some(cells[0].clone());
            }
            (None, _) => {
                tracing::debug!(?cells, "Ignoring header row");
            }
        }
    }
}

fn parse_team_pairing_row(
    line: usize,
    cells: &[Field],
) -> Option<TeamPairingData> {
    let mut names = Vec::new();
    let mut score = None;

    // numbers here are team ids or average ratings
    for cell in &cells[1..] {
        if cell.numeric || is_separator(&cell.text) {
            continue;
        }
        if score.is_none() {
            if let Some(parsed) = parse_team_score(&cell.text) {
                score = Some(parsed);
                continue;
            }
        }
        names.push(cell.text.clone());
    }

    let Some(score) = score else {
        tracing::warn!(line, ?cells, "Skipping team pairing without a score");
        return None;
    };

    let (white_team, black_team) = match names.as_slice() {
        [white, black] => (white.clone(), black.clone()),
        [white, black, ..] => {
            tracing::warn!(
                line,
                ?names,
                "Team pairing row has extra text, using the first two names"
            );
            (white.clone(), black.clone())
        }
        _ => {
            tracing::warn!(line, ?cells, "Skipping team pairing without two teams");
            return None;
        }
    };

    if white_team == black_team {
        tracing::warn!(line, team = %white_team, "Skipping team paired with itself");
        return None;
    }

    Some(TeamPairingData {
        pairing_number: Some(cells[0].text.clone()),
        white_team,
        black_team,
        white_score: score.white,
        black_score: score.black,
        is_forfeit: score.is_forfeit,
        boards: Vec::new(),
    })
}

enum Token<'a> {
    Separator,
    Result(&'a str),
    Title(&'a str),
    Rating(i64),
    Name(PlayerName),
}

/// Numbers which are not a plausible rating (ids, performance averages) are
/// dropped.
fn tokenize(cell: &Field) -> Option<Token<'_>> {
    let text = cell.text.as_str();
    if is_separator(text) {
        Some(Token::Separator)
    } else if looks_like_board_result(text) {
        Some(Token::Result(text))
    } else if cell.numeric {
        Some(text)
            .filter(|text| is_integer(text))
            .and_then(|text| text.parse::<i64>().ok())
            .filter(|rating| (0..=MAX_RATING).contains(rating))
            .map(Token::Rating)
    } else if is_chess_title(text) {
        Some(Token::Title(text))
    } else {
        Some(Token::Name(extract_player_title(text)))
    }
}

fn parse_board_row(line: usize, cells: &[Field]) -> Option<BoardPairingData> {
    let board_number = cells[0].text.parse::<u8>().ok()?;

    let tokens = cells[1..]
        .iter()
        .filter_map(tokenize)
        .collect::<Vec<_>>();
    let has_separator = tokens.iter().any(|t| matches!(t, Token::Separator));

    let mut players: [Option<PlayerEntry>; 2] = [None, None];
    let mut result: Option<BoardResult> = None;
    let mut side = 0;
    let mut pending_title: Option<String> = None;
    let mut last_player: Option<usize> = None;

    for token in tokens {
        match token {
            Token::Separator => {
                side = 1;
                pending_title = None;
                last_player = None;
            }
            Token::Result(text) => {
                if result.is_some() {
                    continue;
                }
                match parse_board_result(text) {
                    Some(parsed) => result = Some(parsed),
                    None => {
                        tracing::warn!(line, board_number, "Skipping board with an unreadable result");
                        return None;
                    }
                }
            }
            Token::Title(title) => {
                pending_title = Some(title.to_ascii_uppercase());
            }
            Token::Rating(rating) => {
                if let Some(player) =
                    last_player.and_then(|slot| players[slot].as_mut())
                {
                    player.rating.get_or_insert(rating);
                }
            }
            Token::Name(name) => {
                let slot = if has_separator {
                    side
                } else {
                    match players.iter().position(Option::is_none) {
                        Some(slot) => slot,
                        None => {
                            tracing::warn!(line, extra = %name.name, "Ignoring extra name on board row");
                            continue;
                        }
                    }
                };
                if players[slot].is_some() {
                    tracing::warn!(line, extra = %name.name, "Ignoring extra name on board row");
                    continue;
                }
                let title = name.title.or(pending_title.take());
                pending_title = None;
                players[slot] = Some(PlayerEntry {
                    name: name.name,
                    title,
                    rating: None,
                });
                last_player = Some(slot);
            }
        }
    }

    let Some(result) = result else {
        tracing::warn!(line, board_number, "Skipping board without a result");
        return None;
    };

    // a lone name on a forfeit row belongs to whoever turned up
    if !has_separator
        && players[1].is_none()
        && result.result == ResultKind::BlackWinByForfeit
    {
        players.swap(0, 1);
    }

    let [white_player, black_player] = players;

    if (white_player.is_none() || black_player.is_none())
        && !result.result.is_forfeit()
    {
        tracing::warn!(
            line,
            board_number,
            "Skipping board with a missing player which was not forfeited"
        );
        return None;
    }

    Some(BoardPairingData {
        board_number,
        white_player,
        black_player,
        result,
    })
}

fn is_separator(cell: &str) -> bool {
    matches!(cell, "-" | "–")
}

fn is_integer(cell: &str) -> bool {
    !cell.is_empty() && cell.chars().all(|c| c.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tournaments::rounds::import::notation::GameOutcome;

    fn row(cells: &[&str]) -> Row {
        cells.iter().map(|c| Cell::from(*c)).collect()
    }

    fn header() -> Vec<Row> {
        vec![
            row(&["Premier Team League 2024"]),
            row(&["Organizer(s): City Chess Federation"]),
            row(&["Chief Arbiter", "IA Jones Mary"]),
            row(&["Deputy Chief Arbiter: FA Brown Tom"]),
            row(&["Location: Town Hall"]),
            row(&["Date: 2024/03/01 to 2024/06/30"]),
            row(&["Round 4 on 2024/04/12"]),
            row(&[]),
            row(&["Bo.", "", "Team", "Rtg", "-", "", "Team", "Rtg", "Res."]),
        ]
    }

    #[test]
    fn reads_header_pairings_and_boards() {
        let mut rows = header();
        rows.extend([
            row(&["4.1", "1", "Knights", "", "-", "5", "Rooks", "", "2½ - 1½"]),
            row(&["1", "GM", "Fedoseev Vladimir", "2690", "-", "IM", "Smith John", "2450", "1 : 0"]),
            row(&["2", "", "Doe Jane", "2300", "-", "", "Roe Rick", "2310", "½ : ½"]),
            row(&["3", "", "Lee Ann", "2100", "-", "", "", "", "+ : -"]),
            row(&["4", "", "Kim Bo", "2000", "-", "", "Park Ji", "2050", "0 : 1"]),
            row(&["4.2", "2", "Bishops", "", "-", "3", "Pawns", "", "0F - 4"]),
        ]);

        let data = transform(&rows, "upload.xlsx", None).unwrap();

        let meta = &data.metadata;
        assert_eq!(meta.name, "Premier Team League 2024");
        assert_eq!(meta.organizer.as_deref(), Some("City Chess Federation"));
        assert_eq!(meta.chief_arbiter.as_deref(), Some("IA Jones Mary"));
        assert_eq!(meta.deputy_chief_arbiter.as_deref(), Some("FA Brown Tom"));
        assert_eq!(meta.location.as_deref(), Some("Town Hall"));
        assert_eq!(meta.date.as_deref(), Some("2024/03/01 to 2024/06/30"));
        assert_eq!(meta.round_number, 4);
        assert_eq!(meta.round_date.as_deref(), Some("2024/04/12"));

        assert_eq!(data.pairings.len(), 2);
        let first = &data.pairings[0];
        assert_eq!(first.pairing_number.as_deref(), Some("4.1"));
        assert_eq!(first.white_team, "Knights");
        assert_eq!(first.black_team, "Rooks");
        assert_eq!((first.white_score, first.black_score), (2.5, 1.5));
        assert!(!first.is_forfeit);
        assert_eq!(first.boards.len(), 4);

        let board1 = &first.boards[0];
        let white = board1.white_player.as_ref().unwrap();
        assert_eq!(white.name, "Fedoseev Vladimir");
        assert_eq!(white.title.as_deref(), Some("GM"));
        assert_eq!(white.rating, Some(2690));
        let black = board1.black_player.as_ref().unwrap();
        assert_eq!(black.name, "Smith John");
        assert_eq!(black.title.as_deref(), Some("IM"));
        assert_eq!(board1.result.white_result, GameOutcome::Win);

        let board3 = &first.boards[2];
        assert_eq!(board3.white_player.as_ref().unwrap().name, "Lee Ann");
        assert!(board3.black_player.is_none());
        assert_eq!(board3.result.result, ResultKind::WhiteWinByForfeit);

        let second = &data.pairings[1];
        assert!(second.is_forfeit);
        assert!(second.boards.is_empty());
    }

    #[test]
    fn explicit_round_overrides_filename_and_sheet() {
        let mut rows = header();
        rows.push(row(&["4.1", "Knights", "Rooks", "1 - 0"]));
        rows.push(row(&["1", "A B", "C D", "1 : 0"]));

        let data = transform(&rows, "round_9.xlsx", Some(11)).unwrap();
        assert_eq!(data.metadata.round_number, 11);

        let data = transform(&rows, "round_9.xlsx", None).unwrap();
        assert_eq!(data.metadata.round_number, 9);

        let data = transform(&rows, "upload.xlsx", None).unwrap();
        assert_eq!(data.metadata.round_number, 4);
    }

    #[test]
    fn round_zero_in_filename_falls_back_to_sheet() {
        let mut rows = header();
        rows.push(row(&["4.1", "Knights", "Rooks", "1 - 0"]));
        rows.push(row(&["1", "A B", "C D", "1 : 0"]));

        let data = transform(&rows, "round_0.xlsx", None).unwrap();
        assert_eq!(data.metadata.round_number, 4);
    }

    #[test]
    fn numbers_are_never_team_names() {
        let mut rows = header();
        rows.push(row(&[
            "4.1", "1", "Knights", "2150.5", "-", "2", "Rooks", "2100.25", "1 - 0",
        ]));
        rows.push(vec![
            Cell::Number(4.2),
            Cell::Number(3.0),
            Cell::from("Bishops"),
            Cell::Number(2150.5),
            Cell::from("-"),
            Cell::Number(4.0),
            Cell::from("Pawns"),
            Cell::Number(2100.25),
            Cell::from("0 - 1"),
        ]);

        let data = transform(&rows, "upload.xlsx", None).unwrap();
        assert_eq!(data.pairings.len(), 2);
        assert_eq!(data.pairings[0].white_team, "Knights");
        assert_eq!(data.pairings[0].black_team, "Rooks");
        assert_eq!(data.pairings[1].pairing_number.as_deref(), Some("4.2"));
        assert_eq!(data.pairings[1].white_team, "Bishops");
        assert_eq!(data.pairings[1].black_team, "Pawns");
    }

    #[test]
    fn numbers_are_never_player_names() {
        let mut rows = header();
        rows.push(row(&["4.1", "Knights", "Rooks", "1 - 0"]));
        rows.push(vec![
            Cell::Number(1.0),
            Cell::from("2150.5"),
            Cell::from("Smith John"),
            Cell::from("2100"),
            Cell::from("-"),
            Cell::Number(12.5),
            Cell::from("Doe Jane"),
            Cell::Number(1987.0),
            Cell::Number(123456.0),
            Cell::from("1 : 0"),
        ]);

        let data = transform(&rows, "upload.xlsx", None).unwrap();
        let board = &data.pairings[0].boards[0];
        let white = board.white_player.as_ref().unwrap();
        assert_eq!(white.name, "Smith John");
        assert_eq!(white.rating, Some(2100));
        let black = board.black_player.as_ref().unwrap();
        assert_eq!(black.name, "Doe Jane");
        assert_eq!(black.rating, Some(1987));
    }

    #[derive(Clone, Default)]
    struct LogBuffer(std::sync::Arc<std::sync::Mutex<Vec<u8>>>);

    impl std::io::Write for LogBuffer {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn unrecognised_rows_are_warned_about() {
        let logs = LogBuffer::default();
        let writer = logs.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::WARN)
            .with_ansi(false)
            .with_writer(move || writer.clone())
            .finish();

        let rows = vec![
            row(&["Club League"]),
            row(&["1.1", "Knights", "Rooks", "1 - 0"]),
            row(&["1", "A B", "C D", "1 : 0"]),
            row(&["Match total", "1 - 0"]),
        ];
        let data = tracing::subscriber::with_default(subscriber, || {
            transform(&rows, "r1.csv", None)
        })
        .unwrap();
        assert_eq!(data.pairings[0].boards.len(), 1);

        let output = String::from_utf8(logs.0.lock().unwrap().clone()).unwrap();
        assert!(output.contains("WARN"));
        assert!(output.contains("Skipping unrecognised row"));
        assert!(output.contains("line=4"));
    }

    #[test]
    fn skips_bad_rows_but_keeps_the_rest() {
        let rows = vec![
            row(&["Club League"]),
            row(&["1.1", "Knights", "Rooks", "1½ - ½"]),
            row(&["1", "A B", "C D", "2 : 0"]),
            row(&["2", "E F", "G H", "½ : ½"]),
            row(&["3", "I J", "", "1 : 0"]),
            row(&["2", "K L", "M N", "1 : 0"]),
            row(&["1.2", "Bishops", "Pawns"]),
            row(&["1", "O P", "Q R", "1 : 0"]),
        ];

        let data = transform(&rows, "r1.csv", None).unwrap();
        assert_eq!(data.pairings.len(), 1);
        let boards = &data.pairings[0].boards;
        assert_eq!(boards.len(), 1);
        assert_eq!(boards[0].board_number, 2);
        assert_eq!(boards[0].white_player.as_ref().unwrap().name, "E F");
    }

    #[test]
    fn lone_player_on_black_forfeit_is_black() {
        let rows = vec![
            row(&["Club League"]),
            row(&["1.1", "Knights", "Rooks", "0 - 1"]),
            row(&["1", "Park Ji", "2050", "- : +"]),
        ];

        let data = transform(&rows, "r1.csv", None).unwrap();
        let board = &data.pairings[0].boards[0];
        assert!(board.white_player.is_none());
        let black = board.black_player.as_ref().unwrap();
        assert_eq!(black.name, "Park Ji");
        assert_eq!(black.rating, Some(2050));
    }

    #[test]
    fn fatal_errors() {
        let no_round = vec![
            row(&["Club League"]),
            row(&["1.1", "Knights", "Rooks", "1 - 0"]),
        ];
        assert_eq!(
            transform(&no_round, "upload.xlsx", None),
            Err(ParseError::RoundNumberUnresolved)
        );

        let no_pairings = vec![row(&["Club League"]), row(&["Round 2"])];
        assert_eq!(
            transform(&no_pairings, "upload.xlsx", None),
            Err(ParseError::NoPairings)
        );

        let no_name = vec![row(&["1.1", "Knights", "Rooks", "1 - 0"])];
        assert_eq!(
            transform(&no_name, "round_1.xlsx", None),
            Err(ParseError::MissingTournamentName)
        );
    }
}
