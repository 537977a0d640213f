use thiserror::Error;

/// Errors raised by the cell-local filter state machine
#[derive(Debug, Error)]
pub enum CellError {
    /// A clause mutation named an index past the end of the clause list
    #[error("clause index {index} out of range for {len} clause(s)")]
    ClauseIndexOutOfRange { index: usize, len: usize },

    #[error("failed to serialize query configuration: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Errors raised by a value-choice lookup
#[derive(Debug, Error)]
pub enum LookupError {
    #[error("value lookup request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("invalid lookup url '{0}'")]
    InvalidUrl(String),

    #[error("no values known for column '{0}'")]
    UnknownColumn(String),
}
