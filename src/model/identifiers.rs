//! Core identifier newtypes with smart constructors.
//!
//! Artifact ids are lowercase hex strings. Validation happens once, at the
//! repository boundary; everything past it can rely on the invariant.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Number of hex digits shown for an abbreviated id.
pub const SHORT_ID_LEN: usize = 10;

/// Content-addressed artifact identifier (commit, blob, wiki page, ...).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ArtifactId(String);

impl ArtifactId {
    /// Smart constructor: validates a non-empty lowercase hex string.
    pub fn new(raw: impl Into<String>) -> Result<Self, InvalidArtifactId> {
        let raw = raw.into();
        if raw.is_empty() {
            return Err(InvalidArtifactId::Empty);
        }
        if let Some(bad) = raw.chars().find(|c| !matches!(c, '0'..='9' | 'a'..='f')) {
            return Err(InvalidArtifactId::NotHex { found: bad });
        }
        Ok(Self(raw))
    }

    /// Wrap a digest the caller produced as lowercase hex.
    pub(crate) fn from_digest(hex: String) -> Self {
        debug_assert!(hex.chars().all(|c| matches!(c, '0'..='9' | 'a'..='f')));
        Self(hex)
    }

    /// Full id string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Abbreviated id for display.
    pub fn short(&self) -> &str {
        let end = self.0.len().min(SHORT_ID_LEN);
        &self.0[..end]
    }

    /// Whether `prefix` abbreviates this id.
    pub fn has_prefix(&self, prefix: &str) -> bool {
        !prefix.is_empty() && self.0.starts_with(prefix)
    }
}

impl fmt::Display for ArtifactId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for ArtifactId {
    type Error = InvalidArtifactId;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<ArtifactId> for String {
    fn from(id: ArtifactId) -> Self {
        id.0
    }
}

// ===== Error Types =====

/// Rejected artifact id.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InvalidArtifactId {
    /// Empty string.
    #[error("artifact id cannot be empty")]
    Empty,
    /// Contains a character outside `[0-9a-f]`.
    #[error("artifact id must be lowercase hex, found {found:?}")]
    NotHex {
        /// First offending character.
        found: char,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_empty_id() {
        assert_eq!(ArtifactId::new(""), Err(InvalidArtifactId::Empty));
    }

    #[test]
    fn rejects_non_hex_id() {
        assert_eq!(
            ArtifactId::new("abcx"),
            Err(InvalidArtifactId::NotHex { found: 'x' })
        );
        assert!(ArtifactId::new("ABCD").is_err(), "uppercase is not accepted");
    }

    #[test]
    fn short_truncates_long_ids_only() {
        let long = ArtifactId::new("0123456789abcdef").unwrap();
        assert_eq!(long.short(), "0123456789");
        let tiny = ArtifactId::new("abc").unwrap();
        assert_eq!(tiny.short(), "abc");
    }

    #[test]
    fn prefix_match_requires_non_empty_prefix() {
        let id = ArtifactId::new("deadbeef").unwrap();
        assert!(id.has_prefix("dead"));
        assert!(!id.has_prefix(""));
        assert!(!id.has_prefix("beef"));
    }

    #[test]
    fn deserializes_through_validation() {
        let ok: ArtifactId = serde_json::from_str("\"a1b2\"").unwrap();
        assert_eq!(ok.as_str(), "a1b2");
        let bad: Result<ArtifactId, _> = serde_json::from_str("\"zz\"");
        assert!(bad.is_err());
    }
}
