//! A scoreboard that writes through to a repository and follows its changes.

use crate::error::{StoreError, StoreResult, SyncError};
use crate::repo::{Repository, Revisions, StoreEvent};
use chrono::{DateTime, Utc};
use scoreboard_core::{
    ConfirmedMatchRecord, GameMode, MatchProposal, PlayerId, ProposalId, Scoreboard, ScoreboardConfig,
    StorePath,
};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::broadcast::Receiver;
use tracing::{debug, warn};

/// Paths written by a confirmation.
const CONFIRM_PATHS: [StorePath; 4] = [
    StorePath::Ratings,
    StorePath::Ledger,
    StorePath::Pending,
    StorePath::Tally,
];

/// Times a mutation is replayed after losing a race with another writer.
const MAX_WRITE_ATTEMPTS: usize = 5;

/// [`Scoreboard`] persisted through a [`Repository`].
///
/// A mutation first reloads whatever other writers changed, runs against the
/// up-to-date board and saves the paths it touched on condition that nobody
/// wrote in between. On a conflict the board is rolled back and the mutation
/// replayed, so a proposal is confirmed at most once across every process
/// sharing the store. Reads go straight to the in-memory board via
/// [`board`](Self::board).
pub struct SyncedScoreboard<R> {
    board: Scoreboard,
    repo: R,
    /// Revisions of the stored state `board` reflects.
    seen: Mutex<Revisions>,
    /// Serializes mutate-then-save sequences and refreshes.
    writes: Mutex<()>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl<R: Repository> SyncedScoreboard<R> {
    /// Loads the stored state into a new scoreboard.
    pub fn open(config: ScoreboardConfig, repo: R) -> StoreResult<Self> {
        let (snapshot, revisions) = repo.load_with_revisions()?;
        Ok(Self {
            board: Scoreboard::with_snapshot(config, snapshot),
            repo,
            seen: Mutex::new(revisions),
            writes: Mutex::new(()),
        })
    }

    pub fn board(&self) -> &Scoreboard {
        &self.board
    }

    pub fn repository(&self) -> &R {
        &self.repo
    }

    /// Reloads every path whose stored revision differs from the one the
    /// board reflects, in a single restore. Callers hold `writes`.
    fn catch_up(&self) -> StoreResult<Vec<StorePath>> {
        let (incoming, revisions) = self.repo.load_with_revisions()?;
        let mut seen = lock(&self.seen);

        let changed: Vec<StorePath> = StorePath::ALL
            .into_iter()
            .filter(|path| revisions.get(path) != seen.get(path))
            .collect();
        if !changed.is_empty() {
            let mut merged = self.board.snapshot();
            merged.merge(incoming, &changed);
            self.board.restore(merged);
            debug!(paths = ?changed, "Refreshed scoreboard from repository");
        }
        *seen = revisions;
        Ok(changed)
    }

    /// Runs `op` against the up-to-date board and saves `paths` if `saved`
    /// says the result changed anything.
    fn write_when<T>(
        &self,
        paths: &[StorePath],
        op: impl Fn(&Scoreboard) -> Result<T, SyncError>,
        saved: impl Fn(&T) -> bool,
    ) -> Result<T, SyncError> {
        let _writing = lock(&self.writes);
        let mut attempt = 1;
        loop {
            self.catch_up()?;
            let before = self.board.snapshot();

            let value = op(&self.board)?;
            if !saved(&value) {
                return Ok(value);
            }

            let expected = lock(&self.seen).clone();
            match self.repo.save(paths, &self.board.snapshot(), &expected) {
                Ok(revisions) => {
                    lock(&self.seen).extend(revisions);
                    return Ok(value);
                }
                Err(e) => {
                    self.board.restore(before);
                    match e {
                        StoreError::Conflict if attempt < MAX_WRITE_ATTEMPTS => {
                            debug!(attempt, "Store changed during write, replaying");
                            attempt += 1;
                        }
                        e => return Err(e.into()),
                    }
                }
            }
        }
    }

    fn write<T>(
        &self,
        paths: &[StorePath],
        op: impl Fn(&Scoreboard) -> Result<T, SyncError>,
    ) -> Result<T, SyncError> {
        self.write_when(paths, op, |_| true)
    }

    pub fn propose(
        &self,
        mode: GameMode,
        winners: Vec<PlayerId>,
        losers: Vec<PlayerId>,
    ) -> Result<MatchProposal, SyncError> {
        self.propose_at(mode, winners, losers, Utc::now())
    }

    pub fn propose_at(
        &self,
        mode: GameMode,
        winners: Vec<PlayerId>,
        losers: Vec<PlayerId>,
        now: DateTime<Utc>,
    ) -> Result<MatchProposal, SyncError> {
        self.write(&[StorePath::Pending], |board| {
            Ok(board.propose_at(mode, winners.clone(), losers.clone(), now)?)
        })
    }

    pub fn confirm(&self, id: ProposalId, code: &str) -> Result<ConfirmedMatchRecord, SyncError> {
        self.confirm_at(id, code, Utc::now())
    }

    pub fn confirm_at(
        &self,
        id: ProposalId,
        code: &str,
        now: DateTime<Utc>,
    ) -> Result<ConfirmedMatchRecord, SyncError> {
        self.write(&CONFIRM_PATHS, |board| Ok(board.confirm_at(id, code, now)?))
    }

    pub fn reject(&self, id: ProposalId, code: &str) -> Result<(), SyncError> {
        self.reject_at(id, code, Utc::now())
    }

    pub fn reject_at(&self, id: ProposalId, code: &str, now: DateTime<Utc>) -> Result<(), SyncError> {
        self.write(&[StorePath::Pending], |board| Ok(board.reject_at(id, code, now)?))
    }

    pub fn set_credential(&self, player: &str, code: &str) -> Result<(), SyncError> {
        self.write(&[StorePath::Credentials], |board| {
            Ok(board.set_credential(player, code)?)
        })
    }

    /// Drops expired proposals, saving the pending set only if any were dropped.
    pub fn prune_expired(&self, now: DateTime<Utc>) -> Result<Vec<MatchProposal>, SyncError> {
        self.write_when(
            &[StorePath::Pending],
            |board| Ok(board.prune_expired(now)),
            |expired| !expired.is_empty(),
        )
    }

    /// Whether `event` carries a revision this board has not loaded yet.
    pub fn is_stale(&self, event: &StoreEvent) -> bool {
        lock(&self.seen)
            .get(&event.path)
            .map_or(true, |&seen| seen < event.revision)
    }

    /// Reloads every path changed in the repository since the board last
    /// read or wrote it, and returns those paths.
    ///
    /// All changed paths are applied together, so a confirmation written by
    /// another process never shows up half applied.
    pub fn refresh(&self) -> StoreResult<Vec<StorePath>> {
        let _writing = lock(&self.writes);
        self.catch_up()
    }
}

impl<R: Repository + 'static> SyncedScoreboard<R> {
    /// Applies remote changes announced on `events` until the channel closes.
    pub async fn follow(self: Arc<Self>, mut events: Receiver<StoreEvent>) {
        loop {
            match events.recv().await {
                Ok(event) if self.is_stale(&event) => {}
                Ok(_) => continue,
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "Missed store events, reloading everything");
                }
                Err(RecvError::Closed) => break,
            }

            if let Err(e) = self.refresh() {
                warn!(error = %e, "Failed to refresh scoreboard");
            }
        }
    }
}
