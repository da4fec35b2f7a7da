//! Reads an uploaded spreadsheet into plain rows of cells.
//!
//! The round transformer only ever sees [`Row`]s, so this is the single place
//! which knows about file formats. Excel and OpenDocument files are read with
//! `calamine` (first worksheet only), CSV exports with `csv`.

use std::io::Cursor;

use calamine::{Data, Reader, open_workbook_auto_from_rs};
use chrono::NaiveTime;

use crate::error::WorkbookError;

#[derive(Clone, Debug, PartialEq)]
pub enum Cell {
    Empty,
    Text(String),
    Number(f64),
}

pub type Row = Vec<Cell>;

impl Cell {
    /// The textual form of the cell, trimmed. Whole numbers are rendered
    /// without a fractional part (so a board number stored as `3.0` reads as
    /// `"3"`).
    pub fn text(&self) -> String {
        match self {
            Cell::Empty => String::new(),
            Cell::Text(text) => text.trim().to_string(),
            Cell::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => {
                format!("{}", *n as i64)
            }
            Cell::Number(n) => format!("{n}"),
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Cell::Empty => true,
            Cell::Text(text) => text.trim().is_empty(),
            Cell::Number(_) => false,
        }
    }
}

impl From<&str> for Cell {
    fn from(value: &str) -> Self {
        if value.trim().is_empty() {
            Cell::Empty
        } else {
            Cell::Text(value.to_string())
        }
    }
}

impl From<&Data> for Cell {
    fn from(value: &Data) -> Self {
        match value {
            Data::Empty => Cell::Empty,
            Data::String(s) => Cell::from(s.as_str()),
            Data::Float(n) => Cell::Number(*n),
            Data::Int(n) => Cell::Number(*n as f64),
            Data::Bool(b) => Cell::Text(b.to_string()),
            Data::DateTime(dt) if dt.is_datetime() => match dt.as_datetime() {
                Some(at) if at.time() == NaiveTime::MIN => {
                    Cell::Text(at.date().to_string())
                }
                Some(at) => {
                    Cell::Text(at.format("%Y-%m-%dT%H:%M:%S").to_string())
                }
                None => Cell::Number(dt.as_f64()),
            },
            Data::DateTimeIso(s) => Cell::from(s.as_str()),
            other => Cell::from(other.to_string().as_str()),
        }
    }
}

/// Reads the rows of `bytes`, choosing the reader from the extension of
/// `filename`.
#[tracing::instrument(skip(bytes), fields(len = bytes.len()))]
pub fn read_rows(filename: &str, bytes: &[u8]) -> Result<Vec<Row>, WorkbookError> {
    let extension = std::path::Path::new(filename)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
        .unwrap_or_default();

    match extension.as_str() {
        "xlsx" | "xlsm" | "xlsb" | "xls" | "ods" => read_spreadsheet(bytes),
        "csv" | "txt" => read_csv(bytes),
        other => Err(WorkbookError::UnsupportedFormat(other.to_string())),
    }
}

fn read_spreadsheet(bytes: &[u8]) -> Result<Vec<Row>, WorkbookError> {
    let mut sheets = open_workbook_auto_from_rs(Cursor::new(bytes.to_vec()))?;

    let range = sheets
        .worksheet_range_at(0)
        .ok_or(WorkbookError::NoWorksheet)??;

    let rows = range
        .rows()
        .map(|row| row.iter().map(Cell::from).collect::<Row>())
        .collect::<Vec<_>>();

    tracing::debug!("Read {} rows from worksheet", rows.len());

    Ok(rows)
}

const SNIFF_LINES: usize = 20;

fn read_csv(bytes: &[u8]) -> Result<Vec<Row>, WorkbookError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .delimiter(sniff_delimiter(bytes))
        .from_reader(bytes);

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        rows.push(record.iter().map(Cell::from).collect::<Row>());
    }

    tracing::debug!("Read {} rows from csv", rows.len());

    Ok(rows)
}

/// Spreadsheet programs in many locales export with `;` (or tabs) rather than
/// commas. Picks whichever of the three is most common in the first few
/// lines, preferring commas on a tie.
fn sniff_delimiter(bytes: &[u8]) -> u8 {
    let head = bytes
        .split(|b| *b == b'\n')
        .take(SNIFF_LINES)
        .flatten()
        .copied()
        .collect::<Vec<u8>>();
    // `max_by_key` keeps the last maximum
    [b'\t', b';', b',']
        .into_iter()
        .max_by_key(|delim| head.iter().filter(|b| *b == delim).count())
        .unwrap_or(b',')
}
