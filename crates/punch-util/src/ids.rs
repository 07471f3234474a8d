//! Strongly-typed identifiers for punchd

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Platform-assigned user identifier (opaque, stable)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for UserId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for UserId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Scope a shift was opened in (e.g. a guild id).
///
/// Never interpreted by the core; only stored and handed back so that
/// notifications reach the right community.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OriginContext(String);

impl OriginContext {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OriginContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for OriginContext {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Unique identifier for a connected IPC client
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ClientId(Uuid);

impl ClientId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ClientId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_id_equality() {
        let a = UserId::new("1372891969336119358");
        let b = UserId::from("1372891969336119358");
        let c = UserId::new("42");

        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn ids_serialize_as_plain_strings() {
        let user = UserId::new("u-1");
        assert_eq!(serde_json::to_string(&user).unwrap(), "\"u-1\"");

        let origin: OriginContext = serde_json::from_str("\"guild-9\"").unwrap();
        assert_eq!(origin.as_str(), "guild-9");
    }

    #[test]
    fn client_id_uniqueness() {
        assert_ne!(ClientId::new(), ClientId::new());
    }
}
