//! SQLite-backed repository.

use super::{announce, create_broadcast, EventSender, Repository, Revisions, StoreEvent};
use crate::db::{self, DbPool};
use crate::error::{StoreError, StoreResult};
use rusqlite::{Connection, Result as SqliteResult};
use scoreboard_core::{BoardSnapshot, StorePath};
use std::path::Path;
use tokio::sync::broadcast;
use tracing::debug;

/// Repository storing each path as a row of the `documents` table.
///
/// Several processes may open the same database file; [`watch_changes`]
/// picks up their writes.
///
/// [`watch_changes`]: crate::watch_changes
pub struct SqliteRepository {
    db: DbPool,
    events: EventSender,
}

impl SqliteRepository {
    /// Opens (and if needed creates) the database at `path`.
    pub fn open<P: AsRef<Path>>(path: P) -> StoreResult<Self> {
        Ok(Self::new(db::init_db(path)?))
    }

    /// Create a repository over an initialized database pool.
    pub fn new(db: DbPool) -> Self {
        Self {
            db,
            events: create_broadcast(),
        }
    }

    /// Sender used to announce changes, shared with the watcher.
    pub fn events(&self) -> &EventSender {
        &self.events
    }

    fn read_revisions(conn: &Connection) -> StoreResult<Revisions> {
        let mut stmt = conn.prepare("SELECT path, revision FROM documents")?;
        let rows: Vec<(String, i64)> = stmt
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<SqliteResult<_>>()?;

        rows.into_iter()
            .map(|(key, revision)| Ok::<_, StoreError>((key.parse::<StorePath>()?, revision)))
            .collect()
    }

    fn write_all(conn: &Connection, bodies: &[(StorePath, String)]) -> SqliteResult<Revisions> {
        let mut upsert = conn.prepare(
            "INSERT INTO documents (path, body, revision, updated_at)
             VALUES (?1, ?2, 1, datetime('now'))
             ON CONFLICT(path) DO UPDATE SET
                body = excluded.body,
                revision = documents.revision + 1,
                updated_at = excluded.updated_at",
        )?;
        let mut revision = conn.prepare("SELECT revision FROM documents WHERE path = ?1")?;

        let mut revisions = Revisions::new();
        for (path, body) in bodies {
            upsert.execute((path.key(), body))?;
            let current: i64 = revision.query_row([path.key()], |row| row.get(0))?;
            revisions.insert(*path, current);
        }
        Ok(revisions)
    }
}

impl Repository for SqliteRepository {
    fn load_with_revisions(&self) -> StoreResult<(BoardSnapshot, Revisions)> {
        let conn = db::lock(&self.db);
        let mut stmt = conn.prepare("SELECT path, body, revision FROM documents")?;
        let rows: Vec<(String, String, i64)> = stmt
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)))?
            .collect::<SqliteResult<_>>()?;

        let mut snapshot = BoardSnapshot::default();
        let mut revisions = Revisions::new();
        for (key, body, revision) in rows {
            let path: StorePath = key.parse()?;
            db::decode(path, &body, &mut snapshot)?;
            revisions.insert(path, revision);
        }

        debug!(
            players = snapshot.ratings.len(),
            matches = snapshot.ledger.len(),
            pending = snapshot.pending.len(),
            "Loaded scoreboard from database"
        );
        Ok((snapshot, revisions))
    }

    fn save(
        &self,
        paths: &[StorePath],
        snapshot: &BoardSnapshot,
        expected: &Revisions,
    ) -> StoreResult<Revisions> {
        let bodies = paths
            .iter()
            .map(|&path| Ok::<_, StoreError>((path, db::encode(path, snapshot)?)))
            .collect::<StoreResult<Vec<_>>>()?;

        let conn = db::lock(&self.db);
        // IMMEDIATE takes the write lock up front, so no other connection can
        // commit between the revision check and the write.
        conn.execute_batch("BEGIN IMMEDIATE;")?;

        let written = Self::read_revisions(&conn).and_then(|current| {
            if current != *expected {
                return Err(StoreError::Conflict);
            }
            Ok(Self::write_all(&conn, &bodies)?)
        });

        let revisions = match written {
            Ok(revisions) => {
                conn.execute_batch("COMMIT;")?;
                revisions
            }
            Err(e) => {
                let _ = conn.execute_batch("ROLLBACK;");
                return Err(e);
            }
        };
        drop(conn);

        debug!(?revisions, "Saved scoreboard paths");
        announce(&self.events, &revisions);
        Ok(revisions)
    }

    fn revisions(&self) -> StoreResult<Revisions> {
        Self::read_revisions(&db::lock(&self.db))
    }

    fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.events.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scoreboard_core::{CohortTally, Credential};

    fn snapshot() -> BoardSnapshot {
        let mut snapshot = BoardSnapshot::default();
        snapshot.tally = CohortTally { a: 1, b: 2 };
        snapshot.credentials.set("Grace", Credential::parse("1234").unwrap());
        snapshot
    }

    #[test]
    fn test_empty_database_loads_default() {
        let repo = SqliteRepository::open(":memory:").unwrap();
        assert_eq!(repo.load().unwrap(), BoardSnapshot::default());
        assert!(repo.revisions().unwrap().is_empty());
    }

    #[test]
    fn test_save_writes_only_listed_paths() {
        let repo = SqliteRepository::open(":memory:").unwrap();
        repo.save(&[StorePath::Tally], &snapshot(), &Revisions::new()).unwrap();

        let loaded = repo.load().unwrap();
        assert_eq!(loaded.tally, CohortTally { a: 1, b: 2 });
        assert!(loaded.credentials.is_empty());
    }

    #[test]
    fn test_save_bumps_revisions() {
        let repo = SqliteRepository::open(":memory:").unwrap();
        let first = repo.save(&StorePath::ALL, &snapshot(), &Revisions::new()).unwrap();
        assert_eq!(first[&StorePath::Ledger], 1);

        let second = repo.save(&[StorePath::Ledger], &snapshot(), &first).unwrap();
        assert_eq!(second.len(), 1);
        assert_eq!(second[&StorePath::Ledger], 2);

        let all = repo.revisions().unwrap();
        assert_eq!(all[&StorePath::Ledger], 2);
        assert_eq!(all[&StorePath::Tally], 1);
    }

    #[test]
    fn test_save_announces_each_path() {
        let repo = SqliteRepository::open(":memory:").unwrap();
        let mut rx = repo.subscribe();

        repo.save(&[StorePath::Pending, StorePath::Tally], &snapshot(), &Revisions::new())
            .unwrap();

        let mut seen = vec![rx.try_recv().unwrap().path, rx.try_recv().unwrap().path];
        seen.sort();
        assert_eq!(seen, vec![StorePath::Pending, StorePath::Tally]);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_two_connections_share_a_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scoreboard.db");

        let writer = SqliteRepository::open(&path).unwrap();
        let reader = SqliteRepository::open(&path).unwrap();

        writer.save(&StorePath::ALL, &snapshot(), &Revisions::new()).unwrap();
        assert_eq!(reader.load().unwrap(), snapshot());
    }

    #[test]
    fn test_save_against_stale_revisions_is_rolled_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scoreboard.db");

        let first = SqliteRepository::open(&path).unwrap();
        let second = SqliteRepository::open(&path).unwrap();
        let (_, seen) = second.load_with_revisions().unwrap();

        first.save(&[StorePath::Tally], &snapshot(), &Revisions::new()).unwrap();

        let mut rx = second.subscribe();
        let result = second.save(&StorePath::ALL, &BoardSnapshot::default(), &seen);
        assert!(matches!(result, Err(StoreError::Conflict)));
        assert!(rx.try_recv().is_err());

        let (stored, revisions) = second.load_with_revisions().unwrap();
        assert_eq!(stored.tally, CohortTally { a: 1, b: 2 });
        assert_eq!(revisions, Revisions::from([(StorePath::Tally, 1)]));

        // The connection is usable again after the rollback.
        second.save(&[StorePath::Ledger], &BoardSnapshot::default(), &revisions).unwrap();
    }

    #[test]
    fn test_unknown_path_is_an_error() {
        let db = db::init_db(":memory:").unwrap();
        db::lock(&db)
            .execute("INSERT INTO documents (path, body) VALUES ('players', '[]')", [])
            .unwrap();

        let repo = SqliteRepository::new(db);
        assert!(matches!(repo.load(), Err(StoreError::UnknownPath(_))));
    }
}
