//! Polls the database for writes made by other processes.

use crate::repo::{Repository, Revisions, SqliteRepository, StoreEvent};
use std::sync::Arc;
use tokio::time::{interval, Duration};
use tracing::{debug, warn};

/// Default polling period.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Compares two revision maps and returns an event for every path whose
/// revision moved forward.
pub fn changed_paths(known: &Revisions, current: &Revisions) -> Vec<StoreEvent> {
    current
        .iter()
        .filter(|&(path, revision)| known.get(path).map_or(true, |seen| seen < revision))
        .map(|(&path, &revision)| StoreEvent { path, revision })
        .collect()
}

/// Watches the database behind `repo` and broadcasts every change to the
/// repository's subscribers.
///
/// Runs until aborted. Revisions present when the watcher starts are taken as
/// already seen. Writes made through `repo` itself are broadcast by `save`
/// and again here; receivers compare revisions to skip the repeat.
pub async fn watch_changes(repo: Arc<SqliteRepository>, period: Duration) {
    let mut known = repo.revisions().unwrap_or_else(|e| {
        warn!(error = %e, "Failed to read initial revisions");
        Revisions::new()
    });
    let mut ticker = interval(period);

    loop {
        ticker.tick().await;

        let current = match repo.revisions() {
            Ok(current) => current,
            Err(e) => {
                warn!(error = %e, "Failed to poll revisions");
                continue;
            }
        };

        for event in changed_paths(&known, &current) {
            debug!(path = %event.path, revision = event.revision, "Detected store change");
            let _ = repo.events().send(event);
        }
        known = current;
    }
}
