use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while loading records or assembling batches.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("line {line} of {path} is not a valid record: {source}")]
    Parse {
        path: PathBuf,
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("record {record}: row {row} has {width} values but {columns} columns are named")]
    ColumnWidth {
        record: usize,
        row: usize,
        width: usize,
        columns: usize,
    },

    #[error("index {index} is out of range for a dataset of {len} records")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("temporal shape mismatch: item {index} is {found:?}, batch expects {expected:?}")]
    ShapeMismatch {
        index: usize,
        expected: [usize; 2],
        found: [usize; 2],
    },

    #[error("item {index}: temporal row {row} has {width} values, row 0 has {expected}")]
    RaggedSeries {
        index: usize,
        row: usize,
        width: usize,
        expected: usize,
    },

    #[error("item {index}: attention mask has {mask} entries for {ids} token ids")]
    MaskLength { index: usize, ids: usize, mask: usize },

    #[error("cannot assemble a batch from zero items")]
    EmptyBatch,

    #[error("cannot draw batches from an empty dataset")]
    EmptyDataset,

    #[error("batch size must be at least 1")]
    InvalidBatchSize,

    #[error("tokenizer error: {0}")]
    Tokenizer(String),
}

/// Errors raised by the training entry point.
#[derive(Debug, Error)]
pub enum TrainingError {
    #[error("failed to prepare artifact directory {path}: {source}")]
    ArtifactDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to save training config: {0}")]
    Config(#[source] std::io::Error),

    #[error("failed to save model: {0}")]
    Record(String),

    #[error(transparent)]
    Data(#[from] DataError),
}
