//! Reported match results awaiting confirmation by a losing player.
//!
//! A proposal moves from `pending` to exactly one of `confirmed`, `rejected`
//! or `expired`. Only pending proposals are stored; resolving one removes it
//! from the [`PendingSet`]. Expiry is evaluated lazily: every read of the
//! pending set first drops proposals whose deadline has passed.

use crate::credential::CredentialVerifier;
use crate::error::{CompositionError, ScoreboardError};
use crate::mode::GameMode;
use crate::player::PlayerId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::fmt;
use std::num::ParseIntError;
use std::str::FromStr;

/// Default time a proposal stays open, in minutes.
pub const DEFAULT_TTL_MINUTES: i64 = 120;

/// Time-derived proposal identifier (milliseconds since the Unix epoch).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProposalId(pub i64);

impl ProposalId {
    /// Next identifier for a proposal made at `now`, strictly greater than
    /// `last` so that proposals made within the same millisecond stay distinct.
    pub fn next(now: DateTime<Utc>, last: Option<ProposalId>) -> Self {
        let candidate = now.timestamp_millis();
        match last {
            Some(ProposalId(prev)) if prev >= candidate => ProposalId(prev + 1),
            _ => ProposalId(candidate),
        }
    }
}

impl fmt::Display for ProposalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ProposalId {
    type Err = ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse().map(ProposalId)
    }
}

/// Lifecycle state of a proposal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProposalStatus {
    #[default]
    Pending,
    Confirmed,
    Rejected,
    Expired,
}

/// A reported match result that has not been confirmed yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchProposal {
    pub id: ProposalId,
    pub mode: GameMode,
    pub winners: Vec<PlayerId>,
    pub losers: Vec<PlayerId>,
    pub proposed_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    /// Rating change per participant, fixed when the proposal is made.
    pub deltas: BTreeMap<PlayerId, i32>,
    #[serde(default)]
    pub status: ProposalStatus,
}

impl MatchProposal {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    pub fn participants(&self) -> impl Iterator<Item = &PlayerId> {
        self.winners.iter().chain(self.losers.iter())
    }

    pub fn involves(&self, player: &str) -> bool {
        self.participants().any(|p| p == player)
    }
}

/// Checks side sizes against the mode, participant uniqueness, and, when a
/// roster is given, roster membership.
pub fn validate_composition(
    mode: GameMode,
    winners: &[PlayerId],
    losers: &[PlayerId],
    roster: Option<&BTreeSet<PlayerId>>,
) -> Result<(), CompositionError> {
    let arity = mode.arity();
    let expected = arity.side_size();
    if winners.len() != expected || losers.len() != expected {
        return Err(CompositionError::WrongSideSize {
            arity,
            expected,
            winners: winners.len(),
            losers: losers.len(),
        });
    }

    let mut seen = HashSet::new();
    for player in winners.iter().chain(losers) {
        if !seen.insert(player.as_str()) {
            return Err(CompositionError::DuplicatePlayer(player.clone()));
        }
    }

    if let Some(roster) = roster {
        if let Some(unknown) = winners.iter().chain(losers).find(|p| !roster.contains(*p)) {
            return Err(CompositionError::UnknownPlayer(unknown.clone()));
        }
    }

    Ok(())
}

/// Proposals awaiting confirmation, oldest first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PendingSet {
    proposals: Vec<MatchProposal>,
}

impl PendingSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_proposals(mut proposals: Vec<MatchProposal>) -> Self {
        proposals.sort_by_key(|p| p.id);
        Self { proposals }
    }

    pub fn insert(&mut self, proposal: MatchProposal) {
        self.proposals.push(proposal);
    }

    /// Highest identifier ever held, used to keep new identifiers increasing.
    pub fn last_id(&self) -> Option<ProposalId> {
        self.proposals.iter().map(|p| p.id).max()
    }

    /// Drops every proposal whose deadline has passed and returns them.
    pub fn prune_expired(&mut self, now: DateTime<Utc>) -> Vec<MatchProposal> {
        let (expired, live): (Vec<_>, Vec<_>) = std::mem::take(&mut self.proposals)
            .into_iter()
            .partition(|p| p.is_expired(now));
        self.proposals = live;
        expired
            .into_iter()
            .map(|mut p| {
                p.status = ProposalStatus::Expired;
                p
            })
            .collect()
    }

    /// Pending proposals at `now`, after dropping expired ones.
    pub fn active(&mut self, now: DateTime<Utc>) -> &[MatchProposal] {
        self.prune_expired(now);
        &self.proposals
    }

    /// Finds a live proposal, checks the presented code against its losers and
    /// removes it, all in one step.
    ///
    /// Fails with `NotFound` for unknown, expired or already resolved ids and
    /// with `Unauthorized` when no loser's code matches; the set is left
    /// unchanged by a failure (apart from dropping expired proposals).
    pub fn take_authorized<V: CredentialVerifier + ?Sized>(
        &mut self,
        id: ProposalId,
        presented: &str,
        verifier: &V,
        now: DateTime<Utc>,
    ) -> Result<MatchProposal, ScoreboardError> {
        self.prune_expired(now);

        let index = self
            .proposals
            .iter()
            .position(|p| p.id == id)
            .ok_or(ScoreboardError::NotFound(id))?;

        let authorized = self.proposals[index]
            .losers
            .iter()
            .any(|loser| verifier.verify(loser, presented));
        if !authorized {
            return Err(ScoreboardError::Unauthorized);
        }

        Ok(self.proposals.remove(index))
    }

    pub fn as_slice(&self) -> &[MatchProposal] {
        &self.proposals
    }

    pub fn len(&self) -> usize {
        self.proposals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.proposals.is_empty()
    }
}
