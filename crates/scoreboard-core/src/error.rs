//! Errors surfaced by scoreboard operations.

use crate::mode::Arity;
use crate::proposal::ProposalId;
use thiserror::Error;

/// Reasons a proposed line-up is malformed.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CompositionError {
    #[error("{arity} match needs {expected} player(s) per side, got {winners} winner(s) and {losers} loser(s)")]
    WrongSideSize {
        arity: Arity,
        expected: usize,
        winners: usize,
        losers: usize,
    },

    #[error("player listed more than once: {0}")]
    DuplicatePlayer(String),

    #[error("player is not on the roster: {0}")]
    UnknownPlayer(String),
}

/// Errors returned by [`Scoreboard`](crate::Scoreboard) operations.
///
/// None of these leave partial state behind; the caller may retry with
/// corrected input.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ScoreboardError {
    #[error("invalid match composition: {0}")]
    InvalidComposition(#[from] CompositionError),

    /// The proposal never existed, expired, or was already resolved.
    #[error("no pending proposal with id {0}")]
    NotFound(ProposalId),

    /// The code matched no losing player's credential, including the case
    /// where no loser has a credential at all.
    #[error("confirmation code does not match any losing player")]
    Unauthorized,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = ScoreboardError::from(CompositionError::DuplicatePlayer("Ada".to_string()));
        assert!(err.to_string().contains("Ada"));

        let err = ScoreboardError::NotFound(ProposalId(42));
        assert!(err.to_string().contains("42"));

        let err = CompositionError::WrongSideSize {
            arity: Arity::TwoVsTwo,
            expected: 2,
            winners: 1,
            losers: 2,
        };
        assert!(err.to_string().starts_with("2v2 match needs 2"));
    }
}
