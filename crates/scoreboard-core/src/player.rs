//! Per-player, per-mode rating records.

use crate::mode::GameMode;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Player identifier. Players are identified by their display name.
pub type PlayerId = String;

/// Outcome of a contest from one player's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Win,
    Loss,
}

/// One confirmed contest in a player's rating history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// When the contest was confirmed.
    pub date: DateTime<Utc>,
    /// Signed rating change applied.
    pub delta: i32,
    pub result: Outcome,
    /// Players on the other side.
    pub opponents: Vec<PlayerId>,
    /// The other player on this side, for 2v2 contests.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub teammate: Option<PlayerId>,
}

/// Rating, win/loss counters and history of one player in one mode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerRatingRecord {
    pub rating: i32,
    pub wins: u32,
    pub losses: u32,
    /// Chronological, append-only.
    #[serde(default)]
    pub history: Vec<HistoryEntry>,
}

impl PlayerRatingRecord {
    pub fn new(initial_rating: i32) -> Self {
        Self {
            rating: initial_rating,
            wins: 0,
            losses: 0,
            history: Vec::new(),
        }
    }

    pub fn games_played(&self) -> u32 {
        self.wins + self.losses
    }

    /// Win rate as a percentage, or `None` if no games have been played.
    pub fn win_rate(&self) -> Option<f64> {
        match self.games_played() {
            0 => None,
            games => Some(self.wins as f64 / games as f64 * 100.0),
        }
    }

    /// Rating obtained by replaying the history from `initial_rating`.
    pub fn replayed_rating(&self, initial_rating: i32) -> i32 {
        initial_rating + self.history.iter().map(|e| e.delta).sum::<i32>()
    }

    fn apply(&mut self, entry: HistoryEntry) {
        self.rating += entry.delta;
        match entry.result {
            Outcome::Win => self.wins += 1,
            Outcome::Loss => self.losses += 1,
        }
        self.history.push(entry);
    }
}

/// All rating records, keyed by player then mode.
///
/// Players without a record in a mode read as a fresh record at the
/// initial rating.
#[derive(Debug, Clone, PartialEq)]
pub struct PlayerRatingStore {
    initial_rating: i32,
    records: BTreeMap<PlayerId, BTreeMap<GameMode, PlayerRatingRecord>>,
}

impl PlayerRatingStore {
    pub fn new(initial_rating: i32) -> Self {
        Self::from_records(initial_rating, BTreeMap::new())
    }

    pub fn from_records(
        initial_rating: i32,
        records: BTreeMap<PlayerId, BTreeMap<GameMode, PlayerRatingRecord>>,
    ) -> Self {
        Self {
            initial_rating,
            records,
        }
    }

    pub fn initial_rating(&self) -> i32 {
        self.initial_rating
    }

    pub fn records(&self) -> &BTreeMap<PlayerId, BTreeMap<GameMode, PlayerRatingRecord>> {
        &self.records
    }

    /// The player's record in `mode`, or a fresh one.
    pub fn record(&self, player: &str, mode: GameMode) -> PlayerRatingRecord {
        self.records
            .get(player)
            .and_then(|modes| modes.get(&mode))
            .cloned()
            .unwrap_or_else(|| PlayerRatingRecord::new(self.initial_rating))
    }

    pub fn rating(&self, player: &str, mode: GameMode) -> i32 {
        self.records
            .get(player)
            .and_then(|modes| modes.get(&mode))
            .map_or(self.initial_rating, |r| r.rating)
    }

    /// Players that have a record in at least one mode.
    pub fn players(&self) -> impl Iterator<Item = &PlayerId> {
        self.records.keys()
    }

    /// Applies one confirmed contest to a player's record.
    pub fn apply(&mut self, player: &str, mode: GameMode, entry: HistoryEntry) {
        let initial = self.initial_rating;
        self.records
            .entry(player.to_string())
            .or_default()
            .entry(mode)
            .or_insert_with(|| PlayerRatingRecord::new(initial))
            .apply(entry);
    }
}
