//! Strongly-typed identifiers for appfence

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Package identifier of an installed application (e.g. `org.example.browser`)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PackageId(String);

impl PackageId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PackageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for PackageId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for PackageId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Identifier of a saved site list
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ListId(String);

impl ListId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generate a fresh random list id
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ListId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ListId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn package_id_equality() {
        let id1 = PackageId::new("org.example.game");
        let id2 = PackageId::new("org.example.game");
        let id3 = PackageId::new("org.example.other");

        assert_eq!(id1, id2);
        assert_ne!(id1, id3);
    }

    #[test]
    fn generated_list_ids_are_unique() {
        assert_ne!(ListId::generate(), ListId::generate());
    }

    #[test]
    fn ids_serialize_deserialize() {
        let pkg = PackageId::new("org.example.game");
        let json = serde_json::to_string(&pkg).unwrap();
        let parsed: PackageId = serde_json::from_str(&json).unwrap();
        assert_eq!(pkg, parsed);

        let list = ListId::generate();
        let json = serde_json::to_string(&list).unwrap();
        let parsed: ListId = serde_json::from_str(&json).unwrap();
        assert_eq!(list, parsed);
    }
}
