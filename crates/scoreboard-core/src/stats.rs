//! Rankings and aggregate statistics derived from ratings and the ledger.

use crate::ledger::{ConfirmedMatchRecord, MatchLedger};
use crate::mode::GameMode;
use crate::player::{PlayerId, PlayerRatingRecord, PlayerRatingStore};
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use std::str::FromStr;
use thiserror::Error;

/// Number of matches listed as recent in the overview.
pub const RECENT_MATCHES: usize = 5;

/// Number of leaders shown per mode in the overview.
pub const TOP_PLAYERS: usize = 3;

/// Column a ranking table is sorted by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortField {
    Name,
    #[default]
    Rating,
    Wins,
    Losses,
    WinRate,
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown sort field: {0}")]
pub struct UnknownSortFieldError(pub String);

impl FromStr for SortField {
    type Err = UnknownSortFieldError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "name" => Ok(SortField::Name),
            "rating" | "elo" => Ok(SortField::Rating),
            "wins" => Ok(SortField::Wins),
            "losses" => Ok(SortField::Losses),
            "winrate" | "win-rate" | "win_rate" => Ok(SortField::WinRate),
            _ => Err(UnknownSortFieldError(s.to_string())),
        }
    }
}

/// Sort applied to a ranking table.
///
/// Names sort alphabetically and numbers highest first; `reversed` flips
/// either.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RankingSort {
    pub field: SortField,
    pub reversed: bool,
}

/// One line of a ranking table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankingRow {
    pub player: PlayerId,
    pub rating: i32,
    pub wins: u32,
    pub losses: u32,
    /// Percentage, `None` before the first game.
    pub win_rate: Option<f64>,
}

impl RankingRow {
    fn new(player: &str, record: &PlayerRatingRecord) -> Self {
        Self {
            player: player.to_string(),
            rating: record.rating,
            wins: record.wins,
            losses: record.losses,
            win_rate: record.win_rate(),
        }
    }

    pub fn games_played(&self) -> u32 {
        self.wins + self.losses
    }

    fn compare(&self, other: &Self, field: SortField) -> Ordering {
        match field {
            SortField::Name => self.player.cmp(&other.player),
            SortField::Rating => other.rating.cmp(&self.rating),
            SortField::Wins => other.wins.cmp(&self.wins),
            SortField::Losses => other.losses.cmp(&self.losses),
            SortField::WinRate => {
                let rate = |row: &Self| row.win_rate.unwrap_or(0.0);
                rate(other).total_cmp(&rate(self))
            }
        }
    }
}

/// Roster players first, in roster order, then anyone else with a record in
/// `mode`.
fn ranked_players<'a>(
    ratings: &'a PlayerRatingStore,
    roster: &'a [PlayerId],
    mode: GameMode,
) -> Vec<&'a str> {
    let listed: BTreeSet<&str> = roster.iter().map(String::as_str).collect();
    let extra = ratings
        .records()
        .iter()
        .filter(|(player, modes)| modes.contains_key(&mode) && !listed.contains(player.as_str()))
        .map(|(player, _)| player.as_str());

    roster.iter().map(String::as_str).chain(extra).collect()
}

/// Ranking table for one mode. Ties keep roster order.
pub fn rankings(
    ratings: &PlayerRatingStore,
    roster: &[PlayerId],
    mode: GameMode,
    sort: RankingSort,
) -> Vec<RankingRow> {
    let mut rows: Vec<RankingRow> = ranked_players(ratings, roster, mode)
        .into_iter()
        .map(|player| RankingRow::new(player, &ratings.record(player, mode)))
        .collect();

    rows.sort_by(|a, b| {
        let ordering = a.compare(b, sort.field);
        if sort.reversed {
            ordering.reverse()
        } else {
            ordering
        }
    });
    rows
}

/// Aggregate view of one player across all modes.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlayerSummary {
    pub player: PlayerId,
    pub total_games: u32,
    pub total_wins: u32,
    pub win_rate: Option<f64>,
    pub ratings: BTreeMap<GameMode, i32>,
    /// Mode with the highest rating above the starting rating, if any.
    pub best_mode: Option<(GameMode, i32)>,
}

pub fn player_summary(ratings: &PlayerRatingStore, player: &str) -> PlayerSummary {
    let mut total_wins = 0;
    let mut total_losses = 0;
    let mut best: Option<(GameMode, i32)> = None;
    let mut per_mode = BTreeMap::new();

    for mode in GameMode::ALL {
        let record = ratings.record(player, mode);
        total_wins += record.wins;
        total_losses += record.losses;
        per_mode.insert(mode, record.rating);

        let bar = best.map_or(ratings.initial_rating(), |(_, rating)| rating);
        if record.rating > bar {
            best = Some((mode, record.rating));
        }
    }

    let total_games = total_wins + total_losses;
    PlayerSummary {
        player: player.to_string(),
        total_games,
        total_wins,
        win_rate: (total_games > 0).then(|| total_wins as f64 / total_games as f64 * 100.0),
        ratings: per_mode,
        best_mode: best,
    }
}

/// Club-wide numbers for the landing view.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Overview {
    pub total_matches: usize,
    pub active_players: usize,
    pub matches_this_week: usize,
    pub recent: Vec<ConfirmedMatchRecord>,
    /// Up to three leaders per mode; empty until someone has played it.
    pub top_players: BTreeMap<GameMode, Vec<RankingRow>>,
}

pub fn overview(
    ratings: &PlayerRatingStore,
    ledger: &MatchLedger,
    roster: &[PlayerId],
    now: DateTime<Utc>,
) -> Overview {
    let participants: BTreeSet<&str> = ledger
        .records()
        .iter()
        .flat_map(|r| r.winners.iter().chain(&r.losers))
        .map(String::as_str)
        .collect();
    let active_players = if participants.is_empty() {
        roster.len()
    } else {
        participants.len()
    };

    let week_ago = now - Duration::days(7);
    let matches_this_week = ledger
        .records()
        .iter()
        .filter(|r| r.confirmed_at > week_ago)
        .count();

    let top_players = GameMode::ALL
        .into_iter()
        .map(|mode| {
            let mut top = rankings(ratings, roster, mode, RankingSort::default());
            top.truncate(TOP_PLAYERS);
            if top.iter().all(|row| row.games_played() == 0) {
                top.clear();
            }
            (mode, top)
        })
        .collect();

    Overview {
        total_matches: ledger.len(),
        active_players,
        matches_this_week,
        recent: ledger.recent(RECENT_MATCHES).to_vec(),
        top_players,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cohort::CohortResult;
    use crate::player::{HistoryEntry, Outcome};
    use crate::proposal::ProposalId;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 10, 12, 0, 0).unwrap()
    }

    fn ids(names: &[&str]) -> Vec<PlayerId> {
        names.iter().map(|n| n.to_string()).collect()
    }

    fn play(store: &mut PlayerRatingStore, mode: GameMode, winner: &str, loser: &str, delta: i32) {
        let entry = |d: i32, result, opponent: &str| HistoryEntry {
            date: now(),
            delta: d,
            result,
            opponents: vec![opponent.to_string()],
            teammate: None,
        };
        store.apply(winner, mode, entry(delta, Outcome::Win, loser));
        store.apply(loser, mode, entry(-delta, Outcome::Loss, winner));
    }

    fn record(id: i64, winner: &str, loser: &str, confirmed_at: DateTime<Utc>) -> ConfirmedMatchRecord {
        ConfirmedMatchRecord {
            id: ProposalId(id),
            mode: GameMode::Pool1v1,
            winners: vec![winner.to_string()],
            losers: vec![loser.to_string()],
            proposed_at: confirmed_at,
            confirmed_at,
            deltas: BTreeMap::new(),
            cohort_result: CohortResult::None,
        }
    }

    #[test]
    fn rankings_default_to_rating_descending() {
        let mut store = PlayerRatingStore::new(1200);
        play(&mut store, GameMode::Pool1v1, "Grace", "Ada", 16);

        let rows = rankings(&store, &ids(&["Ada", "Alan", "Grace"]), GameMode::Pool1v1, RankingSort::default());
        let names: Vec<_> = rows.iter().map(|r| r.player.as_str()).collect();
        assert_eq!(names, vec!["Grace", "Alan", "Ada"]);
        assert_eq!(rows[1].win_rate, None);
        assert_eq!(rows[0].win_rate, Some(100.0));
    }

    #[test]
    fn rankings_by_name_and_reversed() {
        let store = PlayerRatingStore::new(1200);
        let roster = ids(&["Grace", "Ada", "Alan"]);

        let by_name = rankings(
            &store,
            &roster,
            GameMode::Pool1v1,
            RankingSort { field: SortField::Name, reversed: false },
        );
        assert_eq!(by_name[0].player, "Ada");

        let reversed = rankings(
            &store,
            &roster,
            GameMode::Pool1v1,
            RankingSort { field: SortField::Name, reversed: true },
        );
        assert_eq!(reversed[0].player, "Grace");
    }

    #[test]
    fn rankings_include_players_outside_the_roster() {
        let mut store = PlayerRatingStore::new(1200);
        play(&mut store, GameMode::Foosball1v1, "Linus", "Ada", 16);

        let rows = rankings(&store, &ids(&["Ada"]), GameMode::Foosball1v1, RankingSort::default());
        assert_eq!(rows.len(), 2);
        assert!(rankings(&store, &[], GameMode::Pool1v1, RankingSort::default()).is_empty());
    }

    #[test]
    fn sort_field_parses() {
        assert_eq!("winrate".parse::<SortField>().unwrap(), SortField::WinRate);
        assert_eq!("ELO".parse::<SortField>().unwrap(), SortField::Rating);
        assert!("height".parse::<SortField>().is_err());
    }

    #[test]
    fn summary_picks_best_mode_above_start() {
        let mut store = PlayerRatingStore::new(1200);
        play(&mut store, GameMode::Pool1v1, "Ada", "Grace", 16);
        play(&mut store, GameMode::Pool2v2, "Ada", "Grace", 20);
        play(&mut store, GameMode::Foosball1v1, "Grace", "Ada", 10);

        let ada = player_summary(&store, "Ada");
        assert_eq!(ada.total_games, 3);
        assert_eq!(ada.total_wins, 2);
        assert_eq!(ada.best_mode, Some((GameMode::Pool2v2, 1220)));
        assert_eq!(ada.ratings[&GameMode::Foosball1v1], 1190);

        let newcomer = player_summary(&store, "Alan");
        assert_eq!(newcomer.best_mode, None);
        assert_eq!(newcomer.win_rate, None);
    }

    #[test]
    fn overview_counts() {
        let mut store = PlayerRatingStore::new(1200);
        play(&mut store, GameMode::Pool1v1, "Ada", "Grace", 16);

        let ledger = MatchLedger::from_records(vec![
            record(1, "Ada", "Grace", now() - Duration::days(10)),
            record(2, "Ada", "Alan", now() - Duration::days(1)),
        ]);
        let roster = ids(&["Ada", "Grace", "Alan", "Barbara"]);

        let view = overview(&store, &ledger, &roster, now());
        assert_eq!(view.total_matches, 2);
        assert_eq!(view.active_players, 3);
        assert_eq!(view.matches_this_week, 1);
        assert_eq!(view.recent[0].id, ProposalId(2));
        assert_eq!(view.top_players[&GameMode::Pool1v1][0].player, "Ada");
        assert!(view.top_players[&GameMode::Foosball2v2].is_empty());
    }

    #[test]
    fn overview_of_empty_club_uses_roster_size() {
        let store = PlayerRatingStore::new(1200);
        let view = overview(&store, &MatchLedger::new(), &ids(&["Ada", "Grace"]), now());
        assert_eq!(view.active_players, 2);
        assert!(view.recent.is_empty());
    }
}
