use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Rejected security identifier.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid security id '{0}'")]
pub struct InvalidSecurityId(pub String);

/// Case-insensitive security identifier, stored lower-case.
///
/// The normalized form doubles as a file name inside the store, so anything
/// that could escape a shard directory is rejected up front.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SecurityId(String);

impl SecurityId {
    pub fn new(raw: &str) -> Result<Self, InvalidSecurityId> {
        let normalized = raw.trim().to_lowercase();
        let valid = !normalized.is_empty()
            && normalized != "."
            && normalized != ".."
            && !normalized
                .chars()
                .any(|c| c == '/' || c == '\\' || c.is_whitespace() || c.is_control());
        if valid {
            Ok(Self(normalized))
        } else {
            Err(InvalidSecurityId(raw.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Shard key: the first character of the normalized id.
    pub fn shard(&self) -> char {
        // Non-empty by construction.
        self.0.chars().next().unwrap_or('_')
    }
}

impl fmt::Display for SecurityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for SecurityId {
    type Err = InvalidSecurityId;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for SecurityId {
    type Error = InvalidSecurityId;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(&value)
    }
}

impl From<SecurityId> for String {
    fn from(id: SecurityId) -> Self {
        id.0
    }
}

impl AsRef<str> for SecurityId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_to_lower_case() {
        let a = SecurityId::new("NYSE").unwrap();
        let b = SecurityId::new("  nyse ").unwrap();
        assert_eq!(a, b);
        assert_eq!(a.as_str(), "nyse");
        assert_eq!(a.shard(), 'n');
    }

    #[test]
    fn ordering_uses_normalized_form() {
        let upper = SecurityId::new("B").unwrap();
        let lower = SecurityId::new("a").unwrap();
        assert!(lower < upper);
    }

    #[test]
    fn rejects_path_like_ids() {
        assert!(SecurityId::new("").is_err());
        assert!(SecurityId::new("   ").is_err());
        assert!(SecurityId::new("..").is_err());
        assert!(SecurityId::new("a/b").is_err());
        assert!(SecurityId::new("a\\b").is_err());
        assert!(SecurityId::new("two words").is_err());
    }

    #[test]
    fn serde_goes_through_validation() {
        let id: SecurityId = serde_json::from_str("\"AMD\"").unwrap();
        assert_eq!(id.as_str(), "amd");
        assert!(serde_json::from_str::<SecurityId>("\"../etc\"").is_err());
    }
}
