//! Errors raised by repositories and the synchronized scoreboard.

use scoreboard_core::snapshot::UnknownPathError;
use scoreboard_core::{CredentialError, ScoreboardError};
use thiserror::Error;

/// Failures reading or writing persisted state.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("malformed stored document: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    UnknownPath(#[from] UnknownPathError),

    /// Another writer changed the store since the caller last read it.
    #[error("stored state changed since it was loaded")]
    Conflict,
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Errors from [`SyncedScoreboard`](crate::SyncedScoreboard) operations.
///
/// A `Store` error means the change was not written; the in-memory board is
/// rolled back to what the store last held.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error(transparent)]
    Scoreboard(#[from] ScoreboardError),

    #[error(transparent)]
    Credential(#[from] CredentialError),

    #[error("failed to persist change: {0}")]
    Store(#[from] StoreError),
}
