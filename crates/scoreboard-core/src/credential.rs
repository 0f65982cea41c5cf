//! Confirmation codes that gate confirming or rejecting a proposal.
//!
//! Codes are four digits, stored as-is and compared for equality. They keep
//! honest players honest and nothing more. Authorization goes through
//! [`CredentialVerifier`] so a stronger scheme can replace [`CredentialBook`]
//! without touching the proposal state machine.

use crate::player::PlayerId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

/// Number of digits in a confirmation code.
pub const CODE_LENGTH: usize = 4;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CredentialError {
    #[error("confirmation code must be exactly {CODE_LENGTH} digits")]
    InvalidFormat,
}

/// A validated four digit confirmation code.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Credential(String);

impl Credential {
    pub fn parse(code: &str) -> Result<Self, CredentialError> {
        if code.len() == CODE_LENGTH && code.bytes().all(|b| b.is_ascii_digit()) {
            Ok(Self(code.to_string()))
        } else {
            Err(CredentialError::InvalidFormat)
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Credential {
    type Error = CredentialError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Credential> for String {
    fn from(value: Credential) -> Self {
        value.0
    }
}

// Codes stay out of logs.
impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(****)")
    }
}

/// Decides whether a presented code belongs to a player.
pub trait CredentialVerifier {
    /// Returns `false` both for a wrong code and for a player without one.
    fn verify(&self, player: &str, presented: &str) -> bool;
}

/// Plaintext code per player.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CredentialBook {
    codes: BTreeMap<PlayerId, Credential>,
}

impl CredentialBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets or replaces a player's code.
    pub fn set(&mut self, player: impl Into<PlayerId>, credential: Credential) {
        self.codes.insert(player.into(), credential);
    }

    pub fn remove(&mut self, player: &str) -> bool {
        self.codes.remove(player).is_some()
    }

    pub fn has_code(&self, player: &str) -> bool {
        self.codes.contains_key(player)
    }

    pub fn len(&self) -> usize {
        self.codes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }
}

impl CredentialVerifier for CredentialBook {
    fn verify(&self, player: &str, presented: &str) -> bool {
        self.codes
            .get(player)
            .is_some_and(|code| code.as_str() == presented)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_accepts_four_digits() {
        assert_eq!(Credential::parse("0421").unwrap().as_str(), "0421");
    }

    #[test]
    fn parse_rejects_other_shapes() {
        for bad in ["", "123", "12345", "12a4", " 123", "１２３４"] {
            assert_eq!(
                Credential::parse(bad),
                Err(CredentialError::InvalidFormat),
                "{bad:?} should be rejected"
            );
        }
    }

    #[test]
    fn verify_requires_exact_match() {
        let mut book = CredentialBook::new();
        book.set("Ada", Credential::parse("1234").unwrap());

        assert!(book.verify("Ada", "1234"));
        assert!(!book.verify("Ada", "4321"));
        assert!(!book.verify("Grace", "1234"));
    }

    #[test]
    fn set_replaces_and_remove_clears() {
        let mut book = CredentialBook::new();
        book.set("Ada", Credential::parse("1234").unwrap());
        book.set("Ada", Credential::parse("9999").unwrap());
        assert!(book.verify("Ada", "9999"));
        assert_eq!(book.len(), 1);

        assert!(book.remove("Ada"));
        assert!(!book.has_code("Ada"));
        assert!(book.is_empty());
    }

    #[test]
    fn debug_hides_code() {
        let credential = Credential::parse("1234").unwrap();
        assert!(!format!("{credential:?}").contains("1234"));
    }

    #[test]
    fn deserialize_validates() {
        let book: CredentialBook = serde_json::from_str(r#"{"Ada":"0007"}"#).unwrap();
        assert!(book.verify("Ada", "0007"));
        assert!(serde_json::from_str::<CredentialBook>(r#"{"Ada":"7"}"#).is_err());
    }
}
