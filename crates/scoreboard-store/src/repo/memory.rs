//! In-process repository.

use super::{announce, create_broadcast, EventSender, Repository, Revisions, StoreEvent};
use crate::error::{StoreError, StoreResult};
use scoreboard_core::{BoardSnapshot, StorePath};
use std::sync::{Mutex, PoisonError};
use tokio::sync::broadcast;

#[derive(Debug, Default)]
struct Stored {
    snapshot: BoardSnapshot,
    revisions: Revisions,
}

/// Repository keeping the state in memory. Share it behind an `Arc` to give
/// several scoreboards the same backing store.
pub struct MemoryRepository {
    stored: Mutex<Stored>,
    events: EventSender,
}

impl Default for MemoryRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self {
            stored: Mutex::new(Stored::default()),
            events: create_broadcast(),
        }
    }
}

impl Repository for MemoryRepository {
    fn load_with_revisions(&self) -> StoreResult<(BoardSnapshot, Revisions)> {
        let stored = self.stored.lock().unwrap_or_else(PoisonError::into_inner);
        Ok((stored.snapshot.clone(), stored.revisions.clone()))
    }

    fn save(
        &self,
        paths: &[StorePath],
        snapshot: &BoardSnapshot,
        expected: &Revisions,
    ) -> StoreResult<Revisions> {
        let mut stored = self.stored.lock().unwrap_or_else(PoisonError::into_inner);
        if stored.revisions != *expected {
            return Err(StoreError::Conflict);
        }
        stored.snapshot.merge(snapshot.clone(), paths);

        let mut changed = Revisions::new();
        for &path in paths {
            let revision = stored.revisions.entry(path).or_insert(0);
            *revision += 1;
            changed.insert(path, *revision);
        }
        drop(stored);

        announce(&self.events, &changed);
        Ok(changed)
    }

    fn revisions(&self) -> StoreResult<Revisions> {
        let stored = self.stored.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(stored.revisions.clone())
    }

    fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.events.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scoreboard_core::CohortTally;

    #[test]
    fn test_save_and_load() {
        let repo = MemoryRepository::new();
        let mut snapshot = BoardSnapshot::default();
        snapshot.tally = CohortTally { a: 5, b: 0 };

        let revisions = repo.save(&[StorePath::Tally], &snapshot, &Revisions::new()).unwrap();
        assert_eq!(revisions[&StorePath::Tally], 1);
        assert_eq!(repo.load().unwrap().tally, CohortTally { a: 5, b: 0 });

        repo.save(&[StorePath::Tally], &snapshot, &revisions).unwrap();
        assert_eq!(repo.revisions().unwrap()[&StorePath::Tally], 2);
    }

    #[test]
    fn test_unlisted_paths_are_not_written() {
        let repo = MemoryRepository::new();
        let mut snapshot = BoardSnapshot::default();
        snapshot.tally = CohortTally { a: 5, b: 0 };

        repo.save(&[StorePath::Ledger], &snapshot, &Revisions::new()).unwrap();
        assert_eq!(repo.load().unwrap().tally, CohortTally::default());
        assert!(!repo.revisions().unwrap().contains_key(&StorePath::Tally));
    }

    #[test]
    fn test_save_announces() {
        let repo = MemoryRepository::new();
        let mut rx = repo.subscribe();
        repo.save(&[StorePath::Credentials], &BoardSnapshot::default(), &Revisions::new())
            .unwrap();

        assert_eq!(
            rx.try_recv().unwrap(),
            StoreEvent {
                path: StorePath::Credentials,
                revision: 1
            }
        );
    }

    #[test]
    fn test_stale_save_is_a_conflict() {
        let repo = MemoryRepository::new();
        let mut snapshot = BoardSnapshot::default();
        repo.save(&[StorePath::Tally], &snapshot, &Revisions::new()).unwrap();

        snapshot.tally = CohortTally { a: 9, b: 9 };
        assert!(matches!(
            repo.save(&[StorePath::Tally], &snapshot, &Revisions::new()),
            Err(StoreError::Conflict)
        ));

        let (stored, revisions) = repo.load_with_revisions().unwrap();
        assert_eq!(stored.tally, CohortTally::default());
        assert_eq!(revisions[&StorePath::Tally], 1);
    }
}
