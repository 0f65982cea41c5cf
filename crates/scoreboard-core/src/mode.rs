//! Game modes tracked by the scoreboard.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Error returned when parsing an unknown game mode key.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown game mode: {0}")]
pub struct UnknownModeError(pub String);

/// Number of players on each side of a contest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Arity {
    #[serde(rename = "1v1")]
    OneVsOne,
    #[serde(rename = "2v2")]
    TwoVsTwo,
}

impl Arity {
    /// Players required on each side.
    #[inline]
    pub const fn side_size(self) -> usize {
        match self {
            Arity::OneVsOne => 1,
            Arity::TwoVsTwo => 2,
        }
    }
}

impl fmt::Display for Arity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Arity::OneVsOne => write!(f, "1v1"),
            Arity::TwoVsTwo => write!(f, "2v2"),
        }
    }
}

/// The table game being played.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Sport {
    Pool,
    Foosball,
}

/// A rated game mode. Each player has an independent rating per mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum GameMode {
    #[serde(rename = "pool-1v1")]
    Pool1v1,
    #[serde(rename = "foosball-1v1")]
    Foosball1v1,
    #[serde(rename = "pool-2v2")]
    Pool2v2,
    #[serde(rename = "foosball-2v2")]
    Foosball2v2,
}

impl GameMode {
    /// All modes in display order.
    pub const ALL: [GameMode; 4] = [
        GameMode::Pool1v1,
        GameMode::Foosball1v1,
        GameMode::Pool2v2,
        GameMode::Foosball2v2,
    ];

    pub const fn arity(self) -> Arity {
        match self {
            GameMode::Pool1v1 | GameMode::Foosball1v1 => Arity::OneVsOne,
            GameMode::Pool2v2 | GameMode::Foosball2v2 => Arity::TwoVsTwo,
        }
    }

    pub const fn sport(self) -> Sport {
        match self {
            GameMode::Pool1v1 | GameMode::Pool2v2 => Sport::Pool,
            GameMode::Foosball1v1 | GameMode::Foosball2v2 => Sport::Foosball,
        }
    }

    /// Storage key, e.g. `pool-1v1`.
    pub const fn key(self) -> &'static str {
        match self {
            GameMode::Pool1v1 => "pool-1v1",
            GameMode::Foosball1v1 => "foosball-1v1",
            GameMode::Pool2v2 => "pool-2v2",
            GameMode::Foosball2v2 => "foosball-2v2",
        }
    }

    /// Human readable name, e.g. `1v1 Pool`.
    pub const fn display_name(self) -> &'static str {
        match self {
            GameMode::Pool1v1 => "1v1 Pool",
            GameMode::Foosball1v1 => "1v1 Foosball",
            GameMode::Pool2v2 => "2v2 Pool",
            GameMode::Foosball2v2 => "2v2 Foosball",
        }
    }
}

impl fmt::Display for GameMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for GameMode {
    type Err = UnknownModeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        GameMode::ALL
            .into_iter()
            .find(|mode| mode.key().eq_ignore_ascii_case(s))
            .ok_or_else(|| UnknownModeError(s.to_string()))
    }
}
