//! Configuration file loading for the scoreboard.
//!
//! Settings are read from `scoreboard.toml` in the working directory. Every
//! field is optional; a missing file yields the default configuration.

use crate::cohort::CohortRoster;
use crate::player::PlayerId;
use crate::proposal::DEFAULT_TTL_MINUTES;
use crate::rating::{RatingCalculator, DEFAULT_K_FACTOR, INITIAL_RATING};
use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Longest accepted proposal TTL: one year.
pub const MAX_PROPOSAL_TTL_MINUTES: i64 = 365 * 24 * 60;

/// Errors that can occur when loading or validating configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),
    /// Failed to parse the configuration file as valid TOML.
    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),
    /// A player is listed in both cohorts.
    #[error("Player {0} is listed in both cohorts")]
    OverlappingCohorts(String),
    /// A numeric setting is out of range.
    #[error("Invalid setting: {0}")]
    InvalidSetting(String),
}

/// The two cohorts whose head-to-head wins are tallied.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct CohortConfig {
    /// Label shown for cohort A. Defaults to "new".
    #[serde(default = "default_a_label")]
    pub a_label: String,
    /// Label shown for cohort B. Defaults to "established".
    #[serde(default = "default_b_label")]
    pub b_label: String,
    #[serde(default)]
    pub a: Vec<PlayerId>,
    #[serde(default)]
    pub b: Vec<PlayerId>,
}

impl Default for CohortConfig {
    fn default() -> Self {
        Self {
            a_label: default_a_label(),
            b_label: default_b_label(),
            a: Vec::new(),
            b: Vec::new(),
        }
    }
}

fn default_a_label() -> String {
    "new".to_string()
}

fn default_b_label() -> String {
    "established".to_string()
}

impl CohortConfig {
    pub fn roster(&self) -> CohortRoster {
        CohortRoster::new(self.a.iter().cloned(), self.b.iter().cloned())
    }
}

/// Main scoreboard configuration.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct ScoreboardConfig {
    /// Rating every player starts with in every mode. Defaults to 1200.
    #[serde(default = "default_initial_rating")]
    pub initial_rating: i32,
    /// Elo K-factor. Defaults to 32.
    #[serde(default = "default_k_factor")]
    pub k_factor: f64,
    /// Minutes a proposal stays open before it expires. Defaults to 120.
    #[serde(default = "default_ttl_minutes")]
    pub proposal_ttl_minutes: i64,
    /// Club members. When empty, any player id is accepted.
    #[serde(default)]
    pub roster: Vec<PlayerId>,
    #[serde(default)]
    pub cohorts: CohortConfig,
}

fn default_initial_rating() -> i32 {
    INITIAL_RATING
}

fn default_k_factor() -> f64 {
    DEFAULT_K_FACTOR
}

fn default_ttl_minutes() -> i64 {
    DEFAULT_TTL_MINUTES
}

impl Default for ScoreboardConfig {
    fn default() -> Self {
        Self {
            initial_rating: default_initial_rating(),
            k_factor: default_k_factor(),
            proposal_ttl_minutes: default_ttl_minutes(),
            roster: Vec::new(),
            cohorts: CohortConfig::default(),
        }
    }
}

impl ScoreboardConfig {
    /// Loads the configuration from [`Self::config_path()`], or the default
    /// configuration if that file does not exist.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ReadError`] if the file exists but cannot be read,
    /// [`ConfigError::ParseError`] for invalid TOML, and the validation errors
    /// of [`Self::validate`].
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(Self::config_path())
    }

    /// Loads the configuration from `path`, falling back to the default when
    /// the file does not exist.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            Self::parse(&content)
        } else {
            Ok(Self::default())
        }
    }

    /// Parses and validates a TOML document.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Returns the path to the configuration file.
    ///
    /// Currently returns `scoreboard.toml` in the current working directory.
    pub fn config_path() -> PathBuf {
        PathBuf::from("scoreboard.toml")
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.k_factor.is_finite() && self.k_factor > 0.0) {
            return Err(ConfigError::InvalidSetting(format!(
                "k_factor must be positive, got {}",
                self.k_factor
            )));
        }
        if !(1..=MAX_PROPOSAL_TTL_MINUTES).contains(&self.proposal_ttl_minutes) {
            return Err(ConfigError::InvalidSetting(format!(
                "proposal_ttl_minutes must be between 1 and {MAX_PROPOSAL_TTL_MINUTES}, got {}",
                self.proposal_ttl_minutes
            )));
        }

        let a: BTreeSet<&str> = self.cohorts.a.iter().map(String::as_str).collect();
        if let Some(both) = self.cohorts.b.iter().find(|p| a.contains(p.as_str())) {
            return Err(ConfigError::OverlappingCohorts(both.clone()));
        }
        Ok(())
    }

    pub fn calculator(&self) -> RatingCalculator {
        RatingCalculator::new(self.k_factor)
    }

    /// Proposal TTL, clamped to the accepted range for configs built without
    /// [`Self::validate`].
    pub fn proposal_ttl(&self) -> Duration {
        Duration::minutes(self.proposal_ttl_minutes.clamp(1, MAX_PROPOSAL_TTL_MINUTES))
    }

    /// Roster as a set, or `None` when any player id is accepted.
    pub fn roster_set(&self) -> Option<BTreeSet<PlayerId>> {
        if self.roster.is_empty() {
            None
        } else {
            Some(self.roster.iter().cloned().collect())
        }
    }
}
