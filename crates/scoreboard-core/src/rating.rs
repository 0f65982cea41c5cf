//! Elo rating calculation.
//!
//! Ratings are integers per player and mode. A side's rating in a 2v2 contest
//! is the mean of both teammates, which may be fractional, so the calculator
//! works on `f64` inputs and rounds only the resulting deltas.

use serde::{Deserialize, Serialize};

/// Default K-factor applied to every contest.
pub const DEFAULT_K_FACTOR: f64 = 32.0;

/// Rating every player starts with in every mode.
pub const INITIAL_RATING: i32 = 1200;

/// Logistic win probability of a side rated `rating_a` against `rating_b`.
pub fn expected_score(rating_a: f64, rating_b: f64) -> f64 {
    1.0 / (1.0 + 10_f64.powf((rating_b - rating_a) / 400.0))
}

/// Mean rating of one side.
///
/// Returns `0.0` for an empty side.
pub fn team_rating(ratings: &[i32]) -> f64 {
    if ratings.is_empty() {
        return 0.0;
    }
    ratings.iter().map(|&r| r as f64).sum::<f64>() / ratings.len() as f64
}

/// Rounds halves towards positive infinity (`-15.5` becomes `-15`).
fn round_half_up(value: f64) -> i32 {
    (value + 0.5).floor() as i32
}

/// Rating changes produced by one decided contest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RatingDelta {
    /// Applied to every player on the winning side. Never negative.
    pub winner: i32,
    /// Applied to every player on the losing side. Never positive.
    pub loser: i32,
}

/// Result of the stand-alone calculator: odds plus the deltas at stake.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Calculation {
    /// Probability that side A beats side B.
    pub win_probability: f64,
    /// Deltas if side A wins.
    pub delta: RatingDelta,
}

/// Elo calculator with a fixed K-factor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RatingCalculator {
    k_factor: f64,
}

impl Default for RatingCalculator {
    fn default() -> Self {
        Self::new(DEFAULT_K_FACTOR)
    }
}

impl RatingCalculator {
    pub const fn new(k_factor: f64) -> Self {
        Self { k_factor }
    }

    pub const fn k_factor(&self) -> f64 {
        self.k_factor
    }

    /// Deltas for a contest won by a side rated `winner_rating`.
    ///
    /// Both deltas are rounded independently, so `winner` and `-loser` may
    /// differ by one.
    pub fn delta(&self, winner_rating: f64, loser_rating: f64) -> RatingDelta {
        let expected_winner = expected_score(winner_rating, loser_rating);
        let expected_loser = expected_score(loser_rating, winner_rating);

        RatingDelta {
            winner: round_half_up(self.k_factor * (1.0 - expected_winner)),
            loser: round_half_up(self.k_factor * (0.0 - expected_loser)),
        }
    }

    /// Deltas for a contest between two sides, each given as its players' ratings.
    pub fn team_delta(&self, winners: &[i32], losers: &[i32]) -> RatingDelta {
        self.delta(team_rating(winners), team_rating(losers))
    }

    /// Odds and stakes for side A against side B.
    pub fn calculate(&self, rating_a: f64, rating_b: f64) -> Calculation {
        Calculation {
            win_probability: expected_score(rating_a, rating_b),
            delta: self.delta(rating_a, rating_b),
        }
    }
}
