//! Head-to-head tally between two fixed groups of players.

use crate::player::PlayerId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// One of the two tracked cohorts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Cohort {
    A,
    B,
}

/// Which cohort, if any, a confirmed match counts for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CohortResult {
    CohortA,
    CohortB,
    #[default]
    None,
}

/// Static assignment of players to cohorts. Players in neither set are
/// unassigned.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CohortRoster {
    a: BTreeSet<PlayerId>,
    b: BTreeSet<PlayerId>,
}

impl CohortRoster {
    /// Builds a roster. Callers guarantee the two sets are disjoint.
    pub fn new(a: impl IntoIterator<Item = PlayerId>, b: impl IntoIterator<Item = PlayerId>) -> Self {
        Self {
            a: a.into_iter().collect(),
            b: b.into_iter().collect(),
        }
    }

    pub fn cohort_of(&self, player: &str) -> Option<Cohort> {
        if self.a.contains(player) {
            Some(Cohort::A)
        } else if self.b.contains(player) {
            Some(Cohort::B)
        } else {
            None
        }
    }

    /// A match counts for a cohort only when every winner is in it and every
    /// loser is in the other one.
    pub fn evaluate(&self, winners: &[PlayerId], losers: &[PlayerId]) -> CohortResult {
        if winners.is_empty() || losers.is_empty() {
            return CohortResult::None;
        }

        let all_in = |side: &[PlayerId], cohort: Cohort| {
            side.iter().all(|p| self.cohort_of(p) == Some(cohort))
        };

        if all_in(winners, Cohort::A) && all_in(losers, Cohort::B) {
            CohortResult::CohortA
        } else if all_in(winners, Cohort::B) && all_in(losers, Cohort::A) {
            CohortResult::CohortB
        } else {
            CohortResult::None
        }
    }
}

/// Aggregate wins of each cohort over the other.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CohortTally {
    pub a: u32,
    pub b: u32,
}

impl CohortTally {
    pub fn record(&mut self, result: CohortResult) {
        match result {
            CohortResult::CohortA => self.a += 1,
            CohortResult::CohortB => self.b += 1,
            CohortResult::None => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(names: &[&str]) -> Vec<PlayerId> {
        names.iter().map(|n| n.to_string()).collect()
    }

    fn roster() -> CohortRoster {
        CohortRoster::new(ids(&["Ada", "Alan"]), ids(&["Grace", "Barbara"]))
    }

    #[test]
    fn cohort_membership() {
        let roster = roster();
        assert_eq!(roster.cohort_of("Ada"), Some(Cohort::A));
        assert_eq!(roster.cohort_of("Grace"), Some(Cohort::B));
        assert_eq!(roster.cohort_of("Linus"), None);
    }

    #[test]
    fn pure_singles() {
        let roster = roster();
        assert_eq!(roster.evaluate(&ids(&["Ada"]), &ids(&["Grace"])), CohortResult::CohortA);
        assert_eq!(roster.evaluate(&ids(&["Grace"]), &ids(&["Ada"])), CohortResult::CohortB);
    }

    #[test]
    fn pure_doubles() {
        let roster = roster();
        assert_eq!(
            roster.evaluate(&ids(&["Grace", "Barbara"]), &ids(&["Ada", "Alan"])),
            CohortResult::CohortB
        );
    }

    #[test]
    fn mixed_or_same_cohort_counts_for_nobody() {
        let roster = roster();
        assert_eq!(
            roster.evaluate(&ids(&["Ada", "Grace"]), &ids(&["Alan", "Barbara"])),
            CohortResult::None
        );
        assert_eq!(roster.evaluate(&ids(&["Ada"]), &ids(&["Alan"])), CohortResult::None);
    }

    #[test]
    fn unassigned_players_count_for_nobody() {
        let roster = roster();
        assert_eq!(roster.evaluate(&ids(&["Linus"]), &ids(&["Grace"])), CohortResult::None);
        assert_eq!(roster.evaluate(&ids(&["Ada"]), &ids(&["Linus"])), CohortResult::None);
        assert_eq!(roster.evaluate(&[], &ids(&["Grace"])), CohortResult::None);
    }

    #[test]
    fn tally_records_results() {
        let mut tally = CohortTally::default();
        tally.record(CohortResult::CohortA);
        tally.record(CohortResult::CohortA);
        tally.record(CohortResult::None);
        tally.record(CohortResult::CohortB);
        assert_eq!(tally, CohortTally { a: 2, b: 1 });
    }
}
