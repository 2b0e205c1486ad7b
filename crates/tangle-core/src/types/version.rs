//! Package version type.
//!
//! Registry versions have one to four numeric parts with optional prerelease
//! and build metadata (`1.0`, `4.7.2.1`, `2.0.0-beta.3+sha.abc`). Ordering
//! follows semantic versioning precedence; build metadata never takes part
//! in ordering, equality or hashing.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use crate::error::TangleError;

/// Package version (major.minor.patch[.revision][-prerelease][+build])
#[derive(Debug, Clone)]
pub struct Version {
    pub major: u64,
    pub minor: u64,
    pub patch: u64,
    pub revision: u64,
    pub prerelease: Option<String>,
    pub build: Option<String>,
}

impl Version {
    /// Create a new release version
    pub fn new(major: u64, minor: u64, patch: u64) -> Self {
        Self {
            major,
            minor,
            patch,
            revision: 0,
            prerelease: None,
            build: None,
        }
    }

    /// Attach a prerelease label
    pub fn with_prerelease(mut self, prerelease: impl Into<String>) -> Self {
        self.prerelease = Some(prerelease.into());
        self
    }

    /// Check if this is a prerelease version
    pub fn is_prerelease(&self) -> bool {
        self.prerelease.is_some()
    }

    /// Lowercase normalized form used in registry URLs
    pub fn to_normalized_lowercase(&self) -> String {
        let mut text = format!("{}.{}.{}", self.major, self.minor, self.patch);
        if self.revision != 0 {
            text.push_str(&format!(".{}", self.revision));
        }
        if let Some(ref pre) = self.prerelease {
            text.push('-');
            text.push_str(&pre.to_lowercase());
        }
        text
    }

    fn numeric_parts(&self) -> (u64, u64, u64, u64) {
        (self.major, self.minor, self.patch, self.revision)
    }
}

/// Compare two prerelease labels identifier by identifier
fn compare_prerelease(a: &str, b: &str) -> Ordering {
    let mut left = a.split('.');
    let mut right = b.split('.');

    loop {
        match (left.next(), right.next()) {
            (None, None) => return Ordering::Equal,
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(x), Some(y)) => {
                let ordering = match (x.parse::<u64>(), y.parse::<u64>()) {
                    (Ok(x), Ok(y)) => x.cmp(&y),
                    (Ok(_), Err(_)) => Ordering::Less,
                    (Err(_), Ok(_)) => Ordering::Greater,
                    (Err(_), Err(_)) => x.to_lowercase().cmp(&y.to_lowercase()),
                };
                if ordering != Ordering::Equal {
                    return ordering;
                }
            },
        }
    }
}

fn is_valid_label(label: &str) -> bool {
    !label.is_empty()
        && label
            .split('.')
            .all(|part| !part.is_empty() && part.chars().all(|c| c.is_ascii_alphanumeric() || c == '-'))
}

impl FromStr for Version {
    type Err = TangleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let input = s.trim();
        let malformed = || TangleError::malformed(input);

        // Split on '+' for build metadata
        let (version_part, build) = match input.split_once('+') {
            Some((v, b)) => {
                if !is_valid_label(b) {
                    return Err(malformed());
                }
                (v, Some(b.to_string()))
            },
            None => (input, None),
        };

        // Split on '-' for prerelease
        let (core_part, prerelease) = match version_part.split_once('-') {
            Some((c, p)) => {
                if !is_valid_label(p) {
                    return Err(malformed());
                }
                (c, Some(p.to_string()))
            },
            None => (version_part, None),
        };

        let parts: Vec<&str> = core_part.split('.').collect();
        if parts.is_empty() || parts.len() > 4 {
            return Err(malformed());
        }

        let mut numbers = [0u64; 4];
        for (slot, part) in numbers.iter_mut().zip(&parts) {
            if part.is_empty() || !part.chars().all(|c| c.is_ascii_digit()) {
                return Err(malformed());
            }
            *slot = part.parse().map_err(|_| malformed())?;
        }

        Ok(Version {
            major: numbers[0],
            minor: numbers[1],
            patch: numbers[2],
            revision: numbers[3],
            prerelease,
            build,
        })
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)?;

        if self.revision != 0 {
            write!(f, ".{}", self.revision)?;
        }

        if let Some(ref pre) = self.prerelease {
            write!(f, "-{}", pre)?;
        }

        if let Some(ref build) = self.build {
            write!(f, "+{}", build)?;
        }

        Ok(())
    }
}

impl PartialEq for Version {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Version {}

impl Hash for Version {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.numeric_parts().hash(state);
        self.prerelease.as_ref().map(|p| p.to_lowercase()).hash(state);
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        match self.numeric_parts().cmp(&other.numeric_parts()) {
            Ordering::Equal => match (&self.prerelease, &other.prerelease) {
                (None, None) => Ordering::Equal,
                (Some(_), None) => Ordering::Less, // prerelease < release
                (None, Some(_)) => Ordering::Greater,
                (Some(a), Some(b)) => compare_prerelease(a, b),
            },
            other => other,
        }
    }
}

impl Serialize for Version {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Version {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_parsing() {
        let v = Version::from_str("1.2.3").unwrap();
        assert_eq!(v.major, 1);
        assert_eq!(v.minor, 2);
        assert_eq!(v.patch, 3);
        assert_eq!(v.revision, 0);
        assert_eq!(v.prerelease, None);
        assert_eq!(v.build, None);
    }

    #[test]
    fn test_short_and_four_part_versions() {
        assert_eq!(Version::from_str("1.0").unwrap(), Version::new(1, 0, 0));
        assert_eq!(Version::from_str("3").unwrap(), Version::new(3, 0, 0));

        let v = Version::from_str("4.7.2.1").unwrap();
        assert_eq!(v.revision, 1);
        assert_eq!(v.to_string(), "4.7.2.1");
        assert!(v > Version::new(4, 7, 2));
    }

    #[test]
    fn test_version_with_prerelease_and_build() {
        let v = Version::from_str("1.2.3-alpha.1+build.7").unwrap();
        assert_eq!(v.prerelease, Some("alpha.1".to_string()));
        assert_eq!(v.build, Some("build.7".to_string()));
        assert_eq!(v.to_string(), "1.2.3-alpha.1+build.7");
    }

    #[test]
    fn test_malformed_versions() {
        for text in ["", "a.b", "1..2", "1.2.3.4.5", "1.0-", "1.0+", "v1.0", "1.0-be ta"] {
            match Version::from_str(text) {
                Err(TangleError::MalformedVersion { .. }) => {},
                other => panic!("expected malformed for {:?}, got {:?}", text, other),
            }
        }
    }

    #[test]
    fn test_version_comparison() {
        let v1 = Version::new(1, 0, 0);
        let v2 = Version::new(2, 0, 0);
        let v3 = Version::new(1, 1, 0);

        assert!(v1 < v2);
        assert!(v1 < v3);
        assert!(v3 < v2);
    }

    #[test]
    fn test_prerelease_precedence() {
        let ordered = [
            "1.0.0-alpha",
            "1.0.0-alpha.1",
            "1.0.0-alpha.beta",
            "1.0.0-beta",
            "1.0.0-beta.2",
            "1.0.0-beta.11",
            "1.0.0-rc.1",
            "1.0.0",
        ];
        for pair in ordered.windows(2) {
            let a = Version::from_str(pair[0]).unwrap();
            let b = Version::from_str(pair[1]).unwrap();
            assert!(a < b, "{} should sort before {}", a, b);
        }
    }

    #[test]
    fn test_build_metadata_is_ignored() {
        let a = Version::from_str("1.0.0+one").unwrap();
        let b = Version::from_str("1.0.0+two").unwrap();
        assert_eq!(a, b);

        let c = Version::from_str("1.0.0-RC.1").unwrap();
        let d = Version::from_str("1.0.0-rc.1").unwrap();
        assert_eq!(c, d);
    }

    #[test]
    fn test_normalized_lowercase() {
        let v = Version::from_str("1.0-Beta").unwrap();
        assert_eq!(v.to_normalized_lowercase(), "1.0.0-beta");
    }

    #[test]
    fn test_serde_as_string() {
        let v = Version::from_str("2.1.0-preview.3").unwrap();
        let json = serde_json::to_string(&v).unwrap();
        assert_eq!(json, "\"2.1.0-preview.3\"");
        let back: Version = serde_json::from_str(&json).unwrap();
        assert_eq!(back, v);
    }
}
