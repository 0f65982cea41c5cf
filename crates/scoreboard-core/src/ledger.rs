//! Confirmed match history, most recent first.

use crate::cohort::CohortResult;
use crate::mode::GameMode;
use crate::player::PlayerId;
use crate::proposal::{MatchProposal, ProposalId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A confirmed match. Never modified once recorded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfirmedMatchRecord {
    pub id: ProposalId,
    pub mode: GameMode,
    pub winners: Vec<PlayerId>,
    pub losers: Vec<PlayerId>,
    pub proposed_at: DateTime<Utc>,
    pub confirmed_at: DateTime<Utc>,
    /// Rating change applied to each participant.
    pub deltas: BTreeMap<PlayerId, i32>,
    #[serde(default)]
    pub cohort_result: CohortResult,
}

impl ConfirmedMatchRecord {
    pub fn from_proposal(
        proposal: MatchProposal,
        confirmed_at: DateTime<Utc>,
        cohort_result: CohortResult,
    ) -> Self {
        Self {
            id: proposal.id,
            mode: proposal.mode,
            winners: proposal.winners,
            losers: proposal.losers,
            proposed_at: proposal.proposed_at,
            confirmed_at,
            deltas: proposal.deltas,
            cohort_result,
        }
    }

    pub fn involves(&self, player: &str) -> bool {
        self.winners.iter().chain(&self.losers).any(|p| p == player)
    }

    /// Delta applied to the first winner, which every winner shares.
    pub fn winner_delta(&self) -> Option<i32> {
        self.winners
            .first()
            .and_then(|w| self.deltas.get(w))
            .copied()
    }
}

/// Optional constraints for reading the ledger.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HistoryFilter {
    /// Only matches this player took part in.
    pub player: Option<PlayerId>,
    /// Only matches in this mode.
    pub mode: Option<GameMode>,
}

impl HistoryFilter {
    pub fn matches(&self, record: &ConfirmedMatchRecord) -> bool {
        self.player.as_deref().map_or(true, |p| record.involves(p))
            && self.mode.map_or(true, |m| record.mode == m)
    }
}

/// Append-only ledger ordered by confirmation time, newest first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MatchLedger {
    records: Vec<ConfirmedMatchRecord>,
}

impl MatchLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a ledger from records in any order, sorting them once.
    pub fn from_records(mut records: Vec<ConfirmedMatchRecord>) -> Self {
        records.sort_by(|a, b| b.confirmed_at.cmp(&a.confirmed_at));
        Self { records }
    }

    /// Records a confirmed match. A record confirmed no earlier than every
    /// existing one goes to the front; a late arrival is placed by timestamp.
    pub fn insert(&mut self, record: ConfirmedMatchRecord) {
        let index = self
            .records
            .partition_point(|r| r.confirmed_at > record.confirmed_at);
        self.records.insert(index, record);
    }

    pub fn records(&self) -> &[ConfirmedMatchRecord] {
        &self.records
    }

    pub fn history(&self, filter: &HistoryFilter) -> Vec<ConfirmedMatchRecord> {
        self.records
            .iter()
            .filter(|r| filter.matches(r))
            .cloned()
            .collect()
    }

    pub fn recent(&self, count: usize) -> &[ConfirmedMatchRecord] {
        &self.records[..count.min(self.records.len())]
    }

    pub fn last_id(&self) -> Option<ProposalId> {
        self.records.iter().map(|r| r.id).max()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
