//! Persistence for the club scoreboard.
//!
//! The scoreboard state is stored as five whole documents, one per
//! [`StorePath`](scoreboard_core::StorePath). [`SqliteRepository`] keeps them
//! in a SQLite file that several processes may share, [`watch_changes`] turns
//! writes by other processes into [`StoreEvent`]s, and [`SyncedScoreboard`]
//! ties a [`Scoreboard`](scoreboard_core::Scoreboard) to a repository.

pub mod db;
pub mod error;
pub mod repo;
pub mod sync;
pub mod watcher;

pub use error::{StoreError, StoreResult, SyncError};
pub use repo::{
    create_broadcast, EventSender, MemoryRepository, Repository, Revisions, SqliteRepository,
    StoreEvent,
};
pub use sync::SyncedScoreboard;
pub use watcher::{watch_changes, DEFAULT_POLL_INTERVAL};
