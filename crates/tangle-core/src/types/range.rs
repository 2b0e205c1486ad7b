//! Version ranges in interval notation.
//!
//! `1.0` means "1.0 or newer", `[1.0]` pins an exact version and
//! `[1.0,2.0)` style brackets give explicit inclusive/exclusive bounds.
//! The text a range was parsed from is kept so it can be reported verbatim
//! as an edge label.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use super::Version;
use crate::error::TangleError;

/// Interval constraint over versions
#[derive(Debug, Clone)]
pub struct VersionRange {
    min: Option<Version>,
    min_inclusive: bool,
    max: Option<Version>,
    max_inclusive: bool,
    original: String,
}

impl VersionRange {
    /// Parse a range string
    pub fn parse(input: &str) -> Result<Self, TangleError> {
        let original = input.trim();
        let malformed = || TangleError::malformed(original);

        if original.is_empty() || original == "*" {
            return Ok(Self::all_with_text(original));
        }

        let first = original.chars().next().ok_or_else(malformed)?;
        if first != '[' && first != '(' {
            // A bare version is an inclusive lower bound
            let min = Version::from_str(original)?;
            return Ok(Self {
                min: Some(min),
                min_inclusive: true,
                max: None,
                max_inclusive: false,
                original: original.to_string(),
            });
        }

        let last = original.chars().last().ok_or_else(malformed)?;
        if original.len() < 2 || (last != ']' && last != ')') {
            return Err(malformed());
        }

        let min_inclusive = first == '[';
        let max_inclusive = last == ']';
        let inner = original[1..original.len() - 1].trim();

        let parts: Vec<&str> = inner.split(',').map(str::trim).collect();
        let range = match parts.as_slice() {
            [exact] => {
                // "[1.0]" is the only single-part bracket form
                if exact.is_empty() || !min_inclusive || !max_inclusive {
                    return Err(malformed());
                }
                let version = Version::from_str(exact)?;
                Self {
                    min: Some(version.clone()),
                    min_inclusive: true,
                    max: Some(version),
                    max_inclusive: true,
                    original: original.to_string(),
                }
            },
            [low, high] => {
                let min = if low.is_empty() { None } else { Some(Version::from_str(low)?) };
                let max = if high.is_empty() { None } else { Some(Version::from_str(high)?) };
                if min.is_none() && max.is_none() {
                    return Err(malformed());
                }
                Self {
                    min,
                    min_inclusive,
                    max,
                    max_inclusive,
                    original: original.to_string(),
                }
            },
            _ => return Err(malformed()),
        };

        if let (Some(min), Some(max)) = (&range.min, &range.max) {
            let empty = min > max || (min == max && !(range.min_inclusive && range.max_inclusive));
            if empty {
                return Err(malformed());
            }
        }

        Ok(range)
    }

    /// Range that accepts every version
    pub fn all() -> Self {
        Self::all_with_text("*")
    }

    fn all_with_text(text: &str) -> Self {
        Self {
            min: None,
            min_inclusive: false,
            max: None,
            max_inclusive: false,
            original: text.to_string(),
        }
    }

    /// Range that accepts exactly one version
    pub fn exact(version: Version) -> Self {
        let original = format!("[{}]", version);
        Self {
            min: Some(version.clone()),
            min_inclusive: true,
            max: Some(version),
            max_inclusive: true,
            original,
        }
    }

    /// Range accepting `version` and anything newer, written `[version, )`
    pub fn at_least(version: Version) -> Self {
        let original = format!("[{}, )", version);
        Self {
            min: Some(version),
            min_inclusive: true,
            max: None,
            max_inclusive: false,
            original,
        }
    }

    /// Check whether a version lies inside this range
    pub fn satisfies(&self, version: &Version) -> bool {
        let above_min = match &self.min {
            Some(min) if self.min_inclusive => version >= min,
            Some(min) => version > min,
            None => true,
        };
        let below_max = match &self.max {
            Some(max) if self.max_inclusive => version <= max,
            Some(max) => version < max,
            None => true,
        };
        above_min && below_max
    }

    /// Lower bound of the range, if any
    pub fn min_version(&self) -> Option<&Version> {
        self.min.as_ref()
    }

    /// Upper bound of the range, if any
    pub fn max_version(&self) -> Option<&Version> {
        self.max.as_ref()
    }

    pub fn is_min_inclusive(&self) -> bool {
        self.min_inclusive
    }

    pub fn is_max_inclusive(&self) -> bool {
        self.max_inclusive
    }

    /// Text the range was parsed from
    pub fn as_str(&self) -> &str {
        &self.original
    }
}

impl PartialEq for VersionRange {
    fn eq(&self, other: &Self) -> bool {
        self.min == other.min
            && self.max == other.max
            && (self.min.is_none() || self.min_inclusive == other.min_inclusive)
            && (self.max.is_none() || self.max_inclusive == other.max_inclusive)
    }
}

impl Eq for VersionRange {}

impl FromStr for VersionRange {
    type Err = TangleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for VersionRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.original)
    }
}

impl Serialize for VersionRange {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.original)
    }
}

impl<'de> Deserialize<'de> for VersionRange {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        Self::parse(&text).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(text: &str) -> Version {
        Version::from_str(text).unwrap()
    }

    #[test]
    fn test_bare_version_is_minimum() {
        let range = VersionRange::parse("1.0").unwrap();
        assert_eq!(range.min_version(), Some(&v("1.0.0")));
        assert!(range.satisfies(&v("1.0.0")));
        assert!(range.satisfies(&v("99.0.0")));
        assert!(!range.satisfies(&v("0.9.9")));
        assert_eq!(range.to_string(), "1.0");
    }

    #[test]
    fn test_open_ended_interval() {
        let range = VersionRange::parse("[1.0.0, )").unwrap();
        assert!(range.satisfies(&v("1.0.0")));
        assert!(range.satisfies(&v("1.1.0")));
        assert!(!range.satisfies(&v("0.1.0")));
        assert_eq!(range.max_version(), None);
        assert_eq!(range.as_str(), "[1.0.0, )");
    }

    #[test]
    fn test_exact_range() {
        let range = VersionRange::parse("[1.2.3]").unwrap();
        assert!(range.satisfies(&v("1.2.3")));
        assert!(!range.satisfies(&v("1.2.4")));
        assert_eq!(range, VersionRange::exact(v("1.2.3")));
    }

    #[test]
    fn test_bounds_inclusivity() {
        let range = VersionRange::parse("(1.0,2.0]").unwrap();
        assert!(!range.satisfies(&v("1.0")));
        assert!(range.satisfies(&v("1.5")));
        assert!(range.satisfies(&v("2.0")));
        assert!(!range.satisfies(&v("2.0.1")));

        let range = VersionRange::parse("[1.0,2.0)").unwrap();
        assert!(range.satisfies(&v("1.0")));
        assert!(!range.satisfies(&v("2.0")));
        assert!(range.satisfies(&v("2.0.0-beta")));
    }

    #[test]
    fn test_upper_bound_only() {
        let range = VersionRange::parse("(,1.0]").unwrap();
        assert_eq!(range.min_version(), None);
        assert!(range.satisfies(&v("0.0.1")));
        assert!(!range.satisfies(&v("1.0.1")));
    }

    #[test]
    fn test_wildcard() {
        let range = VersionRange::parse("*").unwrap();
        assert!(range.satisfies(&v("0.0.0")));
        assert!(range.satisfies(&v("123.4.5")));
        assert_eq!(range, VersionRange::all());
    }

    #[test]
    fn test_malformed_ranges() {
        for text in ["[1.0", "1.0]", "[]", "(1.0)", "[1.0,2.0,3.0]", "[2.0,1.0]", "(1.0,1.0)", "(,)", "[abc,)"] {
            assert!(
                matches!(VersionRange::parse(text), Err(TangleError::MalformedVersion { .. })),
                "expected {:?} to be malformed",
                text
            );
        }
    }

    #[test]
    fn test_equality_ignores_text() {
        let a = VersionRange::parse("1.0").unwrap();
        let b = VersionRange::parse("[1.0.0, )").unwrap();
        assert_eq!(a, b);
        assert_eq!(VersionRange::at_least(v("1.0")), a);
    }
}
