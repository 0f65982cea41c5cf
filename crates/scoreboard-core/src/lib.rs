//! Rating and match-confirmation engine for a pool and foosball club.
//!
//! Players report results as proposals; a losing player confirms one with
//! their four digit code, at which point the Elo deltas fixed at proposal
//! time are applied, the match is written to the ledger and the cohort tally
//! is updated. Proposals not confirmed within the TTL expire.
//!
//! ```
//! use scoreboard_core::{GameMode, Scoreboard, ScoreboardConfig};
//!
//! let board = Scoreboard::new(ScoreboardConfig::default());
//! board.set_credential("Grace", "1234").unwrap();
//!
//! let proposal = board
//!     .propose(GameMode::Pool1v1, vec!["Ada".into()], vec!["Grace".into()])
//!     .unwrap();
//! board.confirm(proposal.id, "1234").unwrap();
//!
//! assert_eq!(board.rating_of("Ada", GameMode::Pool1v1).rating, 1216);
//! ```

pub mod cohort;
pub mod config;
pub mod credential;
pub mod error;
pub mod ledger;
pub mod mode;
pub mod player;
pub mod proposal;
pub mod rating;
pub mod scoreboard;
pub mod snapshot;
pub mod stats;

pub use cohort::{Cohort, CohortResult, CohortRoster, CohortTally};
pub use config::{CohortConfig, ConfigError, ScoreboardConfig};
pub use credential::{Credential, CredentialBook, CredentialError, CredentialVerifier};
pub use error::{CompositionError, ScoreboardError};
pub use ledger::{ConfirmedMatchRecord, HistoryFilter, MatchLedger};
pub use mode::{Arity, GameMode, Sport, UnknownModeError};
pub use player::{HistoryEntry, Outcome, PlayerId, PlayerRatingRecord, PlayerRatingStore};
pub use proposal::{MatchProposal, PendingSet, ProposalId, ProposalStatus};
pub use rating::{expected_score, Calculation, RatingCalculator, RatingDelta};
pub use scoreboard::Scoreboard;
pub use snapshot::{BoardSnapshot, RatingTable, StorePath};
pub use stats::{Overview, PlayerSummary, RankingRow, RankingSort, SortField};
