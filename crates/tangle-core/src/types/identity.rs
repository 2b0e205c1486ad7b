//! Package identity types.
//!
//! Registries and lock files disagree on id casing (`Newtonsoft.Json` vs
//! `newtonsoft.json`), so ids keep the casing they were first seen with for
//! display but compare, hash and sort case-insensitively.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::borrow::Borrow;
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

use super::Version;

/// Case-insensitive package id
#[derive(Debug, Clone)]
pub struct PackageId {
    display: String,
    folded: String,
}

impl PackageId {
    pub fn new(id: impl Into<String>) -> Self {
        let display = id.into();
        let folded = display.to_lowercase();
        Self { display, folded }
    }

    /// Id as originally written
    pub fn as_str(&self) -> &str {
        &self.display
    }

    /// Lowercase form used for comparisons and registry URLs
    pub fn folded(&self) -> &str {
        &self.folded
    }

    /// Case-insensitive comparison against a raw string
    pub fn matches(&self, other: &str) -> bool {
        self.folded == other.to_lowercase()
    }
}

impl PartialEq for PackageId {
    fn eq(&self, other: &Self) -> bool {
        self.folded == other.folded
    }
}

impl Eq for PackageId {}

impl Hash for PackageId {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.folded.hash(state);
    }
}

impl PartialOrd for PackageId {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for PackageId {
    fn cmp(&self, other: &Self) -> Ordering {
        self.folded.cmp(&other.folded)
    }
}

/// Borrowed lookups must use the lowercase form of the id
impl Borrow<str> for PackageId {
    fn borrow(&self) -> &str {
        &self.folded
    }
}

impl From<&str> for PackageId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for PackageId {
    fn from(id: String) -> Self {
        Self::new(id)
    }
}

impl fmt::Display for PackageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display)
    }
}

impl Serialize for PackageId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.display)
    }
}

impl<'de> Deserialize<'de> for PackageId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(Self::new(String::deserialize(deserializer)?))
    }
}

/// A package id at one concrete version
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PackageIdentity {
    pub id: PackageId,
    pub version: Version,
}

impl PackageIdentity {
    pub fn new(id: impl Into<PackageId>, version: Version) -> Self {
        Self {
            id: id.into(),
            version,
        }
    }

    /// Create identity from id and version string
    pub fn parse(id: &str, version: &str) -> Result<Self, crate::error::TangleError> {
        Ok(Self::new(id, version.parse()?))
    }
}

impl fmt::Display for PackageIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.id, self.version)
    }
}
