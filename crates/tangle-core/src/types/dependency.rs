//! Dependency declarations.

use serde::{Deserialize, Serialize};

use super::{PackageId, Version, VersionRange};

/// A dependency declared by a package or project: target id plus the
/// range of versions it accepts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dependency {
    pub id: PackageId,
    pub range: VersionRange,
}

impl Dependency {
    /// Create a new dependency
    pub fn new(id: impl Into<PackageId>, range: VersionRange) -> Self {
        Self {
            id: id.into(),
            range,
        }
    }

    /// Parse a dependency from an id and range string
    pub fn parse(id: &str, range: &str) -> Result<Self, crate::error::TangleError> {
        Ok(Self::new(id, VersionRange::parse(range)?))
    }

    /// Check whether a concrete package matches this declaration
    pub fn accepts(&self, id: &PackageId, version: &Version) -> bool {
        &self.id == id && self.range.satisfies(version)
    }
}

impl std::fmt::Display for Dependency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.id, self.range)
    }
}
