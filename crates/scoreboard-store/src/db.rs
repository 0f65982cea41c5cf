//! SQLite connection and schema.
//!
//! Each [`StorePath`] is one row of the `documents` table: the JSON body of
//! that part of the scoreboard and a revision counter bumped on every write.

use rusqlite::{Connection, Result as SqliteResult};
use scoreboard_core::{BoardSnapshot, StorePath};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

/// Thread-safe database connection pool.
pub type DbPool = Arc<Mutex<Connection>>;

/// How long a write waits for another process holding the database lock.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Opens the database at `path` (`:memory:` for an in-memory database) and
/// creates the schema if needed.
///
/// # Errors
///
/// Returns an error if the database cannot be opened or schema creation fails.
pub fn init_db<P: AsRef<Path>>(path: P) -> SqliteResult<DbPool> {
    let conn = Connection::open(path)?;
    conn.busy_timeout(BUSY_TIMEOUT)?;

    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS documents (
            path TEXT PRIMARY KEY,
            body TEXT NOT NULL,
            revision INTEGER NOT NULL DEFAULT 1,
            updated_at TEXT DEFAULT CURRENT_TIMESTAMP
        );
        ",
    )?;

    Ok(Arc::new(Mutex::new(conn)))
}

/// Locks the connection. A panic while holding it cannot leave a transaction
/// open, since every transaction is committed or rolled back before unlocking.
pub fn lock(db: &DbPool) -> MutexGuard<'_, Connection> {
    db.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Serializes one part of the snapshot.
pub fn encode(path: StorePath, snapshot: &BoardSnapshot) -> serde_json::Result<String> {
    match path {
        StorePath::Ratings => serde_json::to_string(&snapshot.ratings),
        StorePath::Ledger => serde_json::to_string(&snapshot.ledger),
        StorePath::Pending => serde_json::to_string(&snapshot.pending),
        StorePath::Credentials => serde_json::to_string(&snapshot.credentials),
        StorePath::Tally => serde_json::to_string(&snapshot.tally),
    }
}

/// Parses one stored document into its part of the snapshot.
pub fn decode(path: StorePath, body: &str, snapshot: &mut BoardSnapshot) -> serde_json::Result<()> {
    match path {
        StorePath::Ratings => snapshot.ratings = serde_json::from_str(body)?,
        StorePath::Ledger => snapshot.ledger = serde_json::from_str(body)?,
        StorePath::Pending => snapshot.pending = serde_json::from_str(body)?,
        StorePath::Credentials => snapshot.credentials = serde_json::from_str(body)?,
        StorePath::Tally => snapshot.tally = serde_json::from_str(body)?,
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use scoreboard_core::{CohortTally, Credential};

    #[test]
    fn test_init_db_creates_documents_table() {
        let db = init_db(":memory:").expect("Failed to init db");
        let conn = lock(&db);

        let tables: Vec<String> = conn
            .prepare("SELECT name FROM sqlite_master WHERE type='table'")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .filter_map(|r| r.ok())
            .collect();

        assert!(tables.contains(&"documents".to_string()));
    }

    #[test]
    fn test_init_db_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scoreboard.db");

        init_db(&path).expect("first init");
        init_db(&path).expect("Schema should be idempotent");
    }

    #[test]
    fn test_revision_defaults_to_one() {
        let db = init_db(":memory:").unwrap();
        let conn = lock(&db);
        conn.execute("INSERT INTO documents (path, body) VALUES ('tally', '{}')", [])
            .unwrap();

        let revision: i64 = conn
            .query_row("SELECT revision FROM documents WHERE path = 'tally'", [], |row| {
                row.get(0)
            })
            .unwrap();
        assert_eq!(revision, 1);
    }

    #[test]
    fn test_encode_decode_single_path() {
        let mut snapshot = BoardSnapshot::default();
        snapshot.tally = CohortTally { a: 3, b: 4 };
        snapshot.credentials.set("Ada", Credential::parse("1234").unwrap());

        let body = encode(StorePath::Tally, &snapshot).unwrap();
        assert_eq!(body, r#"{"a":3,"b":4}"#);

        let mut restored = BoardSnapshot::default();
        decode(StorePath::Tally, &body, &mut restored).unwrap();
        assert_eq!(restored.tally, snapshot.tally);
        assert!(restored.credentials.is_empty());

        assert!(decode(StorePath::Ledger, "{not json", &mut restored).is_err());
    }
}
