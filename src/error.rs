//! Error types for the round ingestion pipeline.

use thiserror::Error;

/// Fatal problems with the contents of an uploaded round. Row-level problems
/// are not errors: those rows are skipped with a warning.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("could not determine round number")]
    RoundNumberUnresolved,
    #[error("could not determine tournament name")]
    MissingTournamentName,
    #[error("no pairings found")]
    NoPairings,
}

/// Failure to turn the uploaded bytes into rows of cells.
#[derive(Error, Debug)]
pub enum WorkbookError {
    #[error("unsupported file type: {0}")]
    UnsupportedFormat(String),
    #[error("the workbook does not contain any worksheets")]
    NoWorksheet,
    #[error("failed to read spreadsheet: {0}")]
    Spreadsheet(#[from] calamine::Error),
    #[error("failed to read csv: {0}")]
    Csv(#[from] csv::Error),
}

/// Everything that can stop a round upload. The `Display` output is the
/// message reported to the caller.
#[derive(Error, Debug)]
pub enum UploadError {
    #[error("no file was uploaded")]
    MissingFile,
    #[error("file is too large ({size} bytes, the limit is {limit} bytes)")]
    FileTooLarge { size: usize, limit: usize },
    #[error(transparent)]
    Workbook(#[from] WorkbookError),
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error("round {round_number} has already been uploaded for this tournament")]
    DuplicateRound { round_number: u32 },
    #[error("database error: {0}")]
    Database(#[from] diesel::result::Error),
    #[error("could not obtain a database connection: {0}")]
    Pool(#[from] diesel::r2d2::PoolError),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
    #[error("invalid config file: {0}")]
    Parse(#[from] toml::de::Error),
}
