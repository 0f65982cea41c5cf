//! The scoreboard engine: proposals, confirmation and every read built on them.

use crate::cohort::{CohortRoster, CohortTally};
use crate::config::ScoreboardConfig;
use crate::credential::{Credential, CredentialBook, CredentialError};
use crate::error::ScoreboardError;
use crate::ledger::{ConfirmedMatchRecord, HistoryFilter, MatchLedger};
use crate::mode::GameMode;
use crate::player::{HistoryEntry, Outcome, PlayerId, PlayerRatingRecord, PlayerRatingStore};
use crate::proposal::{validate_composition, MatchProposal, PendingSet, ProposalId, ProposalStatus};
use crate::rating::{RatingCalculator, RatingDelta};
use crate::snapshot::BoardSnapshot;
use crate::stats::{self, Overview, PlayerSummary, RankingRow, RankingSort};
use chrono::{DateTime, Duration, Utc};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::{debug, info, warn};

/// Mutable state, always accessed under one lock.
#[derive(Debug)]
struct BoardState {
    ratings: PlayerRatingStore,
    pending: PendingSet,
    ledger: MatchLedger,
    tally: CohortTally,
    credentials: CredentialBook,
    last_id: Option<ProposalId>,
}

impl BoardState {
    fn from_snapshot(initial_rating: i32, snapshot: BoardSnapshot) -> Self {
        let pending = PendingSet::from_proposals(snapshot.pending);
        let ledger = MatchLedger::from_records(snapshot.ledger);
        let last_id = pending.last_id().max(ledger.last_id());

        Self {
            ratings: PlayerRatingStore::from_records(initial_rating, snapshot.ratings),
            pending,
            ledger,
            tally: snapshot.tally,
            credentials: snapshot.credentials,
            last_id,
        }
    }

    fn to_snapshot(&self) -> BoardSnapshot {
        BoardSnapshot {
            ratings: self.ratings.records().clone(),
            ledger: self.ledger.records().to_vec(),
            pending: self.pending.as_slice().to_vec(),
            credentials: self.credentials.clone(),
            tally: self.tally,
        }
    }
}

/// Shared scoreboard. Every operation locks the whole state once, so a
/// confirmation is observed either completely or not at all.
///
/// The `*_at` variants take the current time explicitly; the others use
/// [`Utc::now`].
#[derive(Debug)]
pub struct Scoreboard {
    config: ScoreboardConfig,
    calculator: RatingCalculator,
    roster: Option<BTreeSet<PlayerId>>,
    cohorts: CohortRoster,
    state: Mutex<BoardState>,
}

impl Scoreboard {
    /// Creates an empty scoreboard.
    pub fn new(config: ScoreboardConfig) -> Self {
        Self::with_snapshot(config, BoardSnapshot::default())
    }

    /// Creates a scoreboard holding previously persisted state.
    pub fn with_snapshot(config: ScoreboardConfig, snapshot: BoardSnapshot) -> Self {
        let state = BoardState::from_snapshot(config.initial_rating, snapshot);
        Self {
            calculator: config.calculator(),
            roster: config.roster_set(),
            cohorts: config.cohorts.roster(),
            config,
            state: Mutex::new(state),
        }
    }

    pub fn config(&self) -> &ScoreboardConfig {
        &self.config
    }

    fn lock(&self) -> MutexGuard<'_, BoardState> {
        // No step after authorization can fail, so the state is consistent
        // even if a holder panicked.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn ttl(&self) -> Duration {
        self.config.proposal_ttl()
    }

    fn compute_deltas(
        &self,
        ratings: &PlayerRatingStore,
        mode: GameMode,
        winners: &[PlayerId],
        losers: &[PlayerId],
    ) -> RatingDelta {
        let side = |players: &[PlayerId]| -> Vec<i32> {
            players.iter().map(|p| ratings.rating(p, mode)).collect()
        };
        self.calculator.team_delta(&side(winners), &side(losers))
    }

    /// Deltas a proposal for this line-up would carry right now.
    pub fn preview(
        &self,
        mode: GameMode,
        winners: &[PlayerId],
        losers: &[PlayerId],
    ) -> Result<RatingDelta, ScoreboardError> {
        validate_composition(mode, winners, losers, self.roster.as_ref())?;
        let state = self.lock();
        Ok(self.compute_deltas(&state.ratings, mode, winners, losers))
    }

    pub fn propose(
        &self,
        mode: GameMode,
        winners: Vec<PlayerId>,
        losers: Vec<PlayerId>,
    ) -> Result<MatchProposal, ScoreboardError> {
        self.propose_at(mode, winners, losers, Utc::now())
    }

    /// Records a match result awaiting confirmation by one of the losers.
    ///
    /// Deltas are computed from the ratings at this moment and are applied
    /// unchanged on confirmation.
    pub fn propose_at(
        &self,
        mode: GameMode,
        winners: Vec<PlayerId>,
        losers: Vec<PlayerId>,
        now: DateTime<Utc>,
    ) -> Result<MatchProposal, ScoreboardError> {
        validate_composition(mode, &winners, &losers, self.roster.as_ref())?;

        let mut state = self.lock();
        let delta = self.compute_deltas(&state.ratings, mode, &winners, &losers);

        let mut deltas = BTreeMap::new();
        for winner in &winners {
            deltas.insert(winner.clone(), delta.winner);
        }
        for loser in &losers {
            deltas.insert(loser.clone(), delta.loser);
        }

        let id = ProposalId::next(now, state.last_id);
        state.last_id = Some(id);

        let proposal = MatchProposal {
            id,
            mode,
            winners,
            losers,
            proposed_at: now,
            expires_at: now.checked_add_signed(self.ttl()).unwrap_or(DateTime::<Utc>::MAX_UTC),
            deltas,
            status: ProposalStatus::Pending,
        };
        state.pending.insert(proposal.clone());

        info!(
            %id,
            %mode,
            winners = ?proposal.winners,
            losers = ?proposal.losers,
            winner_delta = delta.winner,
            loser_delta = delta.loser,
            "Match proposed"
        );
        Ok(proposal)
    }

    pub fn confirm(&self, id: ProposalId, code: &str) -> Result<ConfirmedMatchRecord, ScoreboardError> {
        self.confirm_at(id, code, Utc::now())
    }

    /// Confirms a pending proposal with a losing player's code and applies
    /// its precomputed deltas.
    pub fn confirm_at(
        &self,
        id: ProposalId,
        code: &str,
        now: DateTime<Utc>,
    ) -> Result<ConfirmedMatchRecord, ScoreboardError> {
        let mut guard = self.lock();
        let state = &mut *guard;

        let proposal = state
            .pending
            .take_authorized(id, code, &state.credentials, now)
            .map_err(|err| {
                log_refusal(id, "confirm", &err);
                err
            })?;

        let mode = proposal.mode;
        let sides = [
            (&proposal.winners, &proposal.losers, Outcome::Win),
            (&proposal.losers, &proposal.winners, Outcome::Loss),
        ];
        for (side, opponents, result) in sides {
            for player in side.iter() {
                let teammate = side.iter().find(|p| *p != player).cloned();
                let entry = HistoryEntry {
                    date: now,
                    delta: proposal.deltas.get(player).copied().unwrap_or_default(),
                    result,
                    opponents: opponents.clone(),
                    teammate,
                };
                state.ratings.apply(player, mode, entry);
            }
        }

        let cohort_result = self.cohorts.evaluate(&proposal.winners, &proposal.losers);
        state.tally.record(cohort_result);

        let record = ConfirmedMatchRecord::from_proposal(proposal, now, cohort_result);
        state.ledger.insert(record.clone());

        info!(%id, %mode, cohort = ?cohort_result, "Match confirmed");
        Ok(record)
    }

    pub fn reject(&self, id: ProposalId, code: &str) -> Result<(), ScoreboardError> {
        self.reject_at(id, code, Utc::now())
    }

    /// Discards a pending proposal. Ratings, ledger and tally are untouched.
    pub fn reject_at(&self, id: ProposalId, code: &str, now: DateTime<Utc>) -> Result<(), ScoreboardError> {
        let mut guard = self.lock();
        let state = &mut *guard;

        state
            .pending
            .take_authorized(id, code, &state.credentials, now)
            .map_err(|err| {
                log_refusal(id, "reject", &err);
                err
            })?;

        info!(%id, "Match rejected");
        Ok(())
    }

    /// Pending proposals at `now`, oldest first.
    pub fn list_pending(&self, now: DateTime<Utc>) -> Vec<MatchProposal> {
        self.lock().pending.active(now).to_vec()
    }

    /// Drops expired proposals and returns them.
    pub fn prune_expired(&self, now: DateTime<Utc>) -> Vec<MatchProposal> {
        let expired = self.lock().pending.prune_expired(now);
        for proposal in &expired {
            debug!(id = %proposal.id, expires_at = %proposal.expires_at, "Proposal expired");
        }
        expired
    }

    pub fn rating_of(&self, player: &str, mode: GameMode) -> PlayerRatingRecord {
        self.lock().ratings.record(player, mode)
    }

    pub fn history(&self, filter: &HistoryFilter) -> Vec<ConfirmedMatchRecord> {
        self.lock().ledger.history(filter)
    }

    pub fn cohort_tally(&self) -> CohortTally {
        self.lock().tally
    }

    /// Sets or replaces a player's confirmation code.
    pub fn set_credential(&self, player: &str, code: &str) -> Result<(), CredentialError> {
        let credential = Credential::parse(code)?;
        self.lock().credentials.set(player, credential);
        info!(player, "Confirmation code set");
        Ok(())
    }

    pub fn has_credential(&self, player: &str) -> bool {
        self.lock().credentials.has_code(player)
    }

    pub fn rankings(&self, mode: GameMode, sort: RankingSort) -> Vec<RankingRow> {
        let state = self.lock();
        stats::rankings(&state.ratings, &self.config.roster, mode, sort)
    }

    pub fn player_summary(&self, player: &str) -> PlayerSummary {
        stats::player_summary(&self.lock().ratings, player)
    }

    pub fn overview(&self, now: DateTime<Utc>) -> Overview {
        let state = self.lock();
        stats::overview(&state.ratings, &state.ledger, &self.config.roster, now)
    }

    /// Copy of the whole state.
    pub fn snapshot(&self) -> BoardSnapshot {
        self.lock().to_snapshot()
    }

    /// Replaces the whole state.
    pub fn restore(&self, snapshot: BoardSnapshot) {
        let state = BoardState::from_snapshot(self.config.initial_rating, snapshot);
        info!(
            players = state.ratings.players().count(),
            matches = state.ledger.len(),
            pending = state.pending.len(),
            "Snapshot restored"
        );
        *self.lock() = state;
    }
}

fn log_refusal(id: ProposalId, action: &str, err: &ScoreboardError) {
    match err {
        ScoreboardError::Unauthorized => warn!(%id, action, "Wrong confirmation code"),
        _ => debug!(%id, action, error = %err, "Proposal not resolved"),
    }
}
