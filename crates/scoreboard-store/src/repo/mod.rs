//! Repositories persisting the scoreboard as one document per store path.

pub mod memory;
pub mod sqlite;

pub use memory::MemoryRepository;
pub use sqlite::SqliteRepository;

use crate::error::StoreResult;
use scoreboard_core::{BoardSnapshot, StorePath};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::broadcast;

/// Revision of each stored path. Paths never written are absent.
pub type Revisions = BTreeMap<StorePath, i64>;

/// A stored path changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreEvent {
    pub path: StorePath,
    /// Revision of the path after the change.
    pub revision: i64,
}

/// Broadcast channel sender for store events.
pub type EventSender = broadcast::Sender<StoreEvent>;

/// Creates a broadcast channel for store events.
///
/// The channel holds 100 events; slower receivers see `Lagged` and should
/// reload everything.
pub fn create_broadcast() -> EventSender {
    let (tx, _) = broadcast::channel(100);
    tx
}

/// Whole-value storage of the scoreboard state.
pub trait Repository: Send + Sync {
    /// Reads every stored path together with the revisions it was read at.
    /// Missing paths keep their default value.
    fn load_with_revisions(&self) -> StoreResult<(BoardSnapshot, Revisions)>;

    fn load(&self) -> StoreResult<BoardSnapshot> {
        self.load_with_revisions().map(|(snapshot, _)| snapshot)
    }

    /// Overwrites each of `paths` with its value in `snapshot`, all or none,
    /// and returns the new revisions.
    ///
    /// Fails with [`StoreError::Conflict`](crate::StoreError::Conflict) unless
    /// the stored revisions still equal `expected`, checked in the same
    /// atomic step as the write.
    fn save(
        &self,
        paths: &[StorePath],
        snapshot: &BoardSnapshot,
        expected: &Revisions,
    ) -> StoreResult<Revisions>;

    /// Current revision of every stored path.
    fn revisions(&self) -> StoreResult<Revisions>;

    /// Receives an event for every path written from now on.
    fn subscribe(&self) -> broadcast::Receiver<StoreEvent>;
}

impl<R: Repository + ?Sized> Repository for Arc<R> {
    fn load_with_revisions(&self) -> StoreResult<(BoardSnapshot, Revisions)> {
        (**self).load_with_revisions()
    }

    fn save(
        &self,
        paths: &[StorePath],
        snapshot: &BoardSnapshot,
        expected: &Revisions,
    ) -> StoreResult<Revisions> {
        (**self).save(paths, snapshot, expected)
    }

    fn revisions(&self) -> StoreResult<Revisions> {
        (**self).revisions()
    }

    fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        (**self).subscribe()
    }
}

/// Sends one event per changed path, ignoring the absence of receivers.
fn announce(events: &EventSender, revisions: &Revisions) {
    for (&path, &revision) in revisions {
        let _ = events.send(StoreEvent { path, revision });
    }
}
