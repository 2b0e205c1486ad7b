//! Version selection over a set of published versions
//!
//! Prerelease versions are only chosen when the range itself names a
//! prerelease bound, or when no stable version satisfies it.

use std::collections::BTreeSet;

use tangle_core::types::{Version, VersionRange};

/// Selector for picking versions out of a repository listing
#[derive(Debug, Clone, Default)]
pub struct VersionSelector {
    /// Available versions in ascending order
    available_versions: BTreeSet<Version>,
}

impl VersionSelector {
    /// Create new version selector with available versions
    pub fn new(versions: impl IntoIterator<Item = Version>) -> Self {
        Self {
            available_versions: versions.into_iter().collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.available_versions.is_empty()
    }

    /// Lowest version satisfying `range`, preferring stable versions
    pub fn lowest_satisfying(&self, range: &VersionRange) -> Option<Version> {
        self.pick(range, self.available_versions.iter())
    }

    /// Highest version satisfying `range`, preferring stable versions
    pub fn highest_satisfying(&self, range: &VersionRange) -> Option<Version> {
        self.pick(range, self.available_versions.iter().rev())
    }

    /// Find all versions matching `range`, ascending
    pub fn find_matching(&self, range: &VersionRange) -> Vec<Version> {
        self.available_versions
            .iter()
            .filter(|version| range.satisfies(version))
            .cloned()
            .collect()
    }

    fn pick<'a>(&self, range: &VersionRange, ordered: impl Iterator<Item = &'a Version> + Clone) -> Option<Version> {
        let mut matching = ordered.filter(|version| range.satisfies(version));
        if allows_prerelease(range) {
            return matching.next().cloned();
        }
        matching
            .clone()
            .find(|version| !version.is_prerelease())
            .or_else(|| matching.next())
            .cloned()
    }
}

/// Whether a range opts into prerelease versions by naming one in a bound
pub fn allows_prerelease(range: &VersionRange) -> bool {
    range.min_version().map_or(false, Version::is_prerelease)
        || range.max_version().map_or(false, Version::is_prerelease)
}
