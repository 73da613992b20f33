use thiserror::Error;

/// Errors raised by the knowledge store.
///
/// Any of these aborts a refresh run: without a working store there is nothing
/// meaningful left to do, but rows committed before the failure stay intact.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Failed to open the knowledge database: {0}")]
    Connection(String),
    #[error("Database error: {0}")]
    Database(#[from] turso::Error),
    #[error("Unexpected value in column `{column}`")]
    TypeConversion { column: &'static str },
    #[error("Unknown source type: {0}")]
    UnknownSourceType(String),
}

/// Errors that end a refresh run.
///
/// Per-URL problems never show up here; they are collected in
/// [`RefreshOutcome::errors`](crate::refresh::RefreshOutcome::errors).
#[derive(Error, Debug)]
pub enum RefreshError {
    #[error("A refresh is already in progress")]
    AlreadyRunning,
    #[error("Knowledge store failure: {0}")]
    Store(#[from] StoreError),
}
