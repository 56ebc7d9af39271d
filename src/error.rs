//! Error type shared by every engine and the record store.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Errors raised by record I/O and the record engines.
///
/// Engines never recover from these internally; they are returned to the
/// immediate caller.
#[derive(Debug, Error)]
pub enum DmError {
    /// An operand dataset has zero records where at least one is required.
    #[error("{dataset} dataset is empty")]
    EmptyInput { dataset: String },

    /// A record lacks a field the current operation needs.
    #[error("missing field '{field}' in {dataset} record {index}")]
    MissingField {
        dataset: String,
        index: usize,
        field: String,
    },

    /// A base primary-key value has no match in the join index.
    #[error("key {key} of base record {index} not found in other dataset")]
    KeyNotFound { key: String, index: usize },

    /// Two records share a primary-key value while uniqueness was requested.
    #[error("duplicate key {key} in records {first} and {second}")]
    DuplicateKey {
        key: String,
        first: usize,
        second: usize,
    },

    /// Two positionally aligned sequences differ in length.
    #[error("lengths of datasets are not the same ({left} != {right})")]
    LengthMismatch { left: usize, right: usize },

    /// Two adjacent sequences of a merge differ in length.
    #[error("lengths of sequences {first} and {second} are not the same ({left} != {right})")]
    SequenceLengthMismatch {
        first: usize,
        second: usize,
        left: usize,
        right: usize,
    },

    /// A line of a record file could not be parsed as a flat JSON object.
    #[error("malformed record on line {line}: {message}")]
    MalformedRecord { line: usize, message: String },

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("I/O error on '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error("excel read error: {0}")]
    Excel(#[from] calamine::Error),

    #[error("excel write error: {0}")]
    Xlsx(#[from] rust_xlsxwriter::XlsxError),

    #[error("prompt failed: {0}")]
    Prompt(String),
}

impl DmError {
    pub(crate) fn missing(dataset: &str, index: usize, field: &str) -> Self {
        DmError::MissingField {
            dataset: dataset.to_string(),
            index,
            field: field.to_string(),
        }
    }

    pub(crate) fn empty(dataset: &str) -> Self {
        DmError::EmptyInput {
            dataset: dataset.to_string(),
        }
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        DmError::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, DmError>;
