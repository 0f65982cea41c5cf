//! Whole-value representation of the scoreboard state, as persisted.

use crate::cohort::CohortTally;
use crate::credential::CredentialBook;
use crate::ledger::ConfirmedMatchRecord;
use crate::mode::GameMode;
use crate::player::{PlayerId, PlayerRatingRecord};
use crate::proposal::MatchProposal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Rating records keyed by player, then mode.
pub type RatingTable = BTreeMap<PlayerId, BTreeMap<GameMode, PlayerRatingRecord>>;

/// Logical key under which one part of the state is stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum StorePath {
    Ratings,
    Ledger,
    Pending,
    Credentials,
    Tally,
}

impl StorePath {
    pub const ALL: [StorePath; 5] = [
        StorePath::Ratings,
        StorePath::Ledger,
        StorePath::Pending,
        StorePath::Credentials,
        StorePath::Tally,
    ];

    pub const fn key(self) -> &'static str {
        match self {
            StorePath::Ratings => "ratings",
            StorePath::Ledger => "ledger",
            StorePath::Pending => "pending",
            StorePath::Credentials => "credentials",
            StorePath::Tally => "tally",
        }
    }
}

impl fmt::Display for StorePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown store path: {0}")]
pub struct UnknownPathError(pub String);

impl FromStr for StorePath {
    type Err = UnknownPathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        StorePath::ALL
            .into_iter()
            .find(|path| path.key() == s)
            .ok_or_else(|| UnknownPathError(s.to_string()))
    }
}

/// Everything the scoreboard persists. Each field corresponds to one
/// [`StorePath`] and is written as a whole.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BoardSnapshot {
    #[serde(default)]
    pub ratings: RatingTable,
    /// Most recent first.
    #[serde(default)]
    pub ledger: Vec<ConfirmedMatchRecord>,
    #[serde(default)]
    pub pending: Vec<MatchProposal>,
    #[serde(default)]
    pub credentials: CredentialBook,
    #[serde(default)]
    pub tally: CohortTally,
}

impl BoardSnapshot {
    /// Replaces the parts named by `paths` with those from `other`.
    pub fn merge(&mut self, other: BoardSnapshot, paths: &[StorePath]) {
        let BoardSnapshot {
            ratings,
            ledger,
            pending,
            credentials,
            tally,
        } = other;

        for path in paths {
            match path {
                StorePath::Ratings => self.ratings = ratings.clone(),
                StorePath::Ledger => self.ledger = ledger.clone(),
                StorePath::Pending => self.pending = pending.clone(),
                StorePath::Credentials => self.credentials = credentials.clone(),
                StorePath::Tally => self.tally = tally,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credential::Credential;

    #[test]
    fn path_keys_parse() {
        for path in StorePath::ALL {
            assert_eq!(path.key().parse::<StorePath>().unwrap(), path);
        }
        assert!("players".parse::<StorePath>().is_err());
    }

    #[test]
    fn merge_replaces_only_listed_paths() {
        let mut base = BoardSnapshot::default();
        let mut incoming = BoardSnapshot::default();
        incoming.tally = CohortTally { a: 2, b: 1 };
        incoming.credentials.set("Ada", Credential::parse("1234").unwrap());

        base.merge(incoming, &[StorePath::Tally]);
        assert_eq!(base.tally, CohortTally { a: 2, b: 1 });
        assert!(base.credentials.is_empty());
    }

    #[test]
    fn missing_fields_default() {
        let snapshot: BoardSnapshot = serde_json::from_str("{}").unwrap();
        assert_eq!(snapshot, BoardSnapshot::default());
    }
}
