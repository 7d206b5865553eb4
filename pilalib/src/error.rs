//! Единый тип ошибок публичного API.

use crate::model::RunId;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PilaError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("column range {start}-{end} outside record of length {len}")]
    ColumnRange { start: usize, end: usize, len: usize },

    #[error("value '{value}' exceeds width {width} of columns {start}-{end}")]
    FieldOverflow {
        start: usize,
        end: usize,
        width: usize,
        value: String,
    },

    #[error("negative value {value} in numeric columns {start}-{end}")]
    NegativeValue { start: usize, end: usize, value: i64 },

    #[error("raw span {start}-{end} must be {expected} chars, got {actual}")]
    RawWidth {
        start: usize,
        end: usize,
        expected: usize,
        actual: usize,
    },

    #[error("{record} record has {actual} chars, expected {expected}")]
    RecordLength {
        record: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("character {ch:?} has no single-byte Latin-1 encoding")]
    Unencodable { ch: char },

    #[error("missing legal parameter: {0}")]
    MissingParameter(&'static str),

    #[error("run {run_id} has no eligible detail lines for mode {mode}")]
    EmptyRun { run_id: RunId, mode: &'static str },

    #[error("run {0} not found")]
    RunNotFound(RunId),

    #[error("store error: {0}")]
    Store(String),
}

pub type Result<T> = std::result::Result<T, PilaError>;
