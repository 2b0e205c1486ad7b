//! Target frameworks and the compatibility table used for nearest-framework
//! asset selection.
//!
//! The table is explicit (see `TargetFramework::can_consume`):
//!
//! | consumer            | consumes                                              |
//! |---------------------|-------------------------------------------------------|
//! | `net{x}`            | `net{y}` for y <= x, `netstandard` per `NETFX_FLOOR`   |
//! | `netcoreapp{x}`/`net5.0+` | same family y <= x, `netstandard` up to `NETCORE_CEILING` |
//! | `netstandard{x}`    | `netstandard{y}` for y <= x                            |
//! | any                 | everything; everything consumes `any`                  |
//!
//! Platform-specific assets (`net6.0-windows7.0`) additionally need a
//! consumer on the same platform whose platform version is not lower.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::error::TangleError;

/// Framework family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FrameworkFamily {
    /// .NET Framework (`net20` .. `net481`)
    NetFramework,
    /// .NET Standard (`netstandard1.0` .. `netstandard2.1`)
    NetStandard,
    /// .NET Core and .NET 5+ (`netcoreapp3.1`, `net8.0`)
    NetCoreApp,
    /// Framework-neutral assets
    Any,
}

/// Three-part framework version (`4.6.1`, `2.0`, `8.0`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct FrameworkVersion {
    pub major: u32,
    pub minor: u32,
    pub build: u32,
}

impl FrameworkVersion {
    pub const fn new(major: u32, minor: u32, build: u32) -> Self {
        Self { major, minor, build }
    }

    fn parse_dotted(text: &str) -> Option<Self> {
        let parts: Vec<&str> = text.split('.').collect();
        if parts.is_empty() || parts.len() > 4 {
            return None;
        }
        let mut numbers = [0u32; 3];
        for (slot, part) in numbers.iter_mut().zip(&parts) {
            *slot = part.parse().ok()?;
        }
        Some(Self::new(numbers[0], numbers[1], numbers[2]))
    }

    /// `48` -> 4.8, `461` -> 4.6.1, `403` -> 4.0.3
    fn parse_compact(text: &str) -> Option<Self> {
        if text.is_empty() || text.len() > 3 || !text.chars().all(|c| c.is_ascii_digit()) {
            return None;
        }
        let mut digits = text.chars().filter_map(|c| c.to_digit(10));
        Some(Self::new(
            digits.next().unwrap_or(0),
            digits.next().unwrap_or(0),
            digits.next().unwrap_or(0),
        ))
    }
}

impl fmt::Display for FrameworkVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)?;
        if self.build != 0 {
            write!(f, ".{}", self.build)?;
        }
        Ok(())
    }
}

/// Operating system a .NET 5+ moniker is specific to (`windows`,
/// `android31.0`, `windows10.0.19041`)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FrameworkPlatform {
    /// Lowercase platform name
    pub name: String,
    /// Platform version, absent when the moniker leaves it to the SDK default
    pub version: Option<FrameworkVersion>,
}

impl FrameworkPlatform {
    pub fn new(name: impl Into<String>, version: Option<FrameworkVersion>) -> Self {
        Self {
            name: name.into().to_lowercase(),
            version,
        }
    }

    /// `windows7.0` -> (`windows`, 7.0)
    fn parse(text: &str) -> Option<Self> {
        let split = text.find(|c: char| c.is_ascii_digit()).unwrap_or(text.len());
        let (name, version) = text.split_at(split);
        if name.is_empty() || !name.chars().all(|c| c.is_ascii_alphabetic()) {
            return None;
        }
        let version = if version.is_empty() {
            None
        } else {
            Some(FrameworkVersion::parse_dotted(version)?)
        };
        Some(Self::new(name, version))
    }

    pub fn same_name(&self, other: &FrameworkPlatform) -> bool {
        self.name.eq_ignore_ascii_case(&other.name)
    }

    /// Whether a consumer on `self` can use assets built for `candidate`.
    ///
    /// Versions are only compared when both sides name one.
    pub fn can_consume(&self, candidate: &FrameworkPlatform) -> bool {
        if !self.same_name(candidate) {
            return false;
        }
        match (self.version, candidate.version) {
            (Some(own), Some(theirs)) => theirs <= own,
            _ => true,
        }
    }
}

impl fmt::Display for FrameworkPlatform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)?;
        if let Some(version) = self.version {
            write!(f, "{}", version)?;
        }
        Ok(())
    }
}

/// Lowest .NET Framework version able to consume a .NET Standard version
const NETFX_FLOOR: &[((u32, u32), FrameworkVersion)] = &[
    ((1, 0), FrameworkVersion::new(4, 5, 0)),
    ((1, 1), FrameworkVersion::new(4, 5, 0)),
    ((1, 2), FrameworkVersion::new(4, 5, 1)),
    ((1, 3), FrameworkVersion::new(4, 6, 0)),
    ((1, 4), FrameworkVersion::new(4, 6, 1)),
    ((1, 5), FrameworkVersion::new(4, 6, 1)),
    ((1, 6), FrameworkVersion::new(4, 6, 1)),
    ((2, 0), FrameworkVersion::new(4, 6, 1)),
];

/// Highest .NET Standard version consumable by a .NET Core major version
const NETCORE_CEILING: &[(u32, FrameworkVersion)] = &[
    (1, FrameworkVersion::new(1, 6, 0)),
    (2, FrameworkVersion::new(2, 0, 0)),
];

const NETCORE_CEILING_LATEST: FrameworkVersion = FrameworkVersion::new(2, 1, 0);

/// A target framework moniker
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TargetFramework {
    pub family: FrameworkFamily,
    pub version: FrameworkVersion,
    pub platform: Option<FrameworkPlatform>,
}

impl TargetFramework {
    pub fn new(family: FrameworkFamily, version: FrameworkVersion) -> Self {
        Self {
            family,
            version,
            platform: None,
        }
    }

    /// Framework-neutral moniker
    pub fn any() -> Self {
        Self::new(FrameworkFamily::Any, FrameworkVersion::default())
    }

    pub fn is_any(&self) -> bool {
        self.family == FrameworkFamily::Any
    }

    /// Parse a short folder name (`net48`) or a long name
    /// (`.NETFramework,Version=v4.8`)
    pub fn parse(input: &str) -> Result<Self, TangleError> {
        let text = input.trim();
        let unsupported = || TangleError::UnsupportedFramework {
            text: text.to_string(),
        };

        if text.starts_with('.') {
            return Self::parse_long(text).ok_or_else(unsupported);
        }

        let lower = text.to_lowercase();
        if lower.is_empty() || lower == "any" || lower == "agnostic" {
            return Ok(Self::any());
        }

        let (moniker, platform) = match lower.split_once('-') {
            Some((m, p)) => (m, Some(FrameworkPlatform::parse(p).ok_or_else(unsupported)?)),
            None => (lower.as_str(), None),
        };

        let parsed = if let Some(rest) = moniker.strip_prefix("netstandard") {
            FrameworkVersion::parse_dotted(rest).map(|v| Self::new(FrameworkFamily::NetStandard, v))
        } else if let Some(rest) = moniker.strip_prefix("netcoreapp") {
            FrameworkVersion::parse_dotted(rest).map(|v| Self::new(FrameworkFamily::NetCoreApp, v))
        } else if let Some(rest) = moniker.strip_prefix("net") {
            if rest.contains('.') {
                FrameworkVersion::parse_dotted(rest)
                    .filter(|v| v.major >= 5)
                    .map(|v| Self::new(FrameworkFamily::NetCoreApp, v))
            } else {
                FrameworkVersion::parse_compact(rest)
                    .filter(|v| v.major < 5)
                    .map(|v| Self::new(FrameworkFamily::NetFramework, v))
            }
        } else {
            None
        };

        let mut framework = parsed.ok_or_else(unsupported)?;
        if platform.is_some() {
            // Platform suffixes only exist on .NET 5+ monikers
            if framework.family != FrameworkFamily::NetCoreApp || framework.version.major < 5 {
                return Err(unsupported());
            }
            framework.platform = platform;
        }
        Ok(framework)
    }

    fn parse_long(text: &str) -> Option<Self> {
        let mut segments = text.split(',');
        let head = segments.next()?.trim();

        let families = [
            (".netframework", FrameworkFamily::NetFramework),
            (".netstandard", FrameworkFamily::NetStandard),
            (".netcoreapp", FrameworkFamily::NetCoreApp),
        ];
        let lower_head = head.to_lowercase();
        let (prefix, family) = families
            .iter()
            .find(|(prefix, _)| lower_head.starts_with(prefix))?;

        // ".NETFramework4.0" carries the version inline
        let inline = &lower_head[prefix.len()..];
        let version_text = if inline.is_empty() {
            segments
                .map(str::trim)
                .find_map(|s| s.to_lowercase().strip_prefix("version=").map(str::to_string))?
        } else {
            inline.to_string()
        };

        let version = FrameworkVersion::parse_dotted(version_text.trim_start_matches('v'))?;
        Some(Self::new(*family, version))
    }

    /// Whether `self` and `other` name the same restore target.
    ///
    /// A platform version written on only one side still matches, so
    /// `net6.0-windows` finds a `net6.0-windows7.0` lock file section.
    pub fn same_target(&self, other: &TargetFramework) -> bool {
        if self.family != other.family || self.version != other.version {
            return false;
        }
        match (&self.platform, &other.platform) {
            (None, None) => true,
            (Some(own), Some(theirs)) => {
                own.same_name(theirs)
                    && match (own.version, theirs.version) {
                        (Some(a), Some(b)) => a == b,
                        _ => true,
                    }
            },
            _ => false,
        }
    }

    /// Whether a project targeting `self` can use assets built for `candidate`
    pub fn can_consume(&self, candidate: &TargetFramework) -> bool {
        if let Some(platform) = &candidate.platform {
            match &self.platform {
                Some(own) if own.can_consume(platform) => {},
                _ => return false,
            }
        }

        use FrameworkFamily::*;
        match (self.family, candidate.family) {
            (_, Any) | (Any, _) => true,
            (a, b) if a == b => candidate.version <= self.version,
            (NetFramework, NetStandard) => NETFX_FLOOR
                .iter()
                .find(|((major, minor), _)| {
                    *major == candidate.version.major && *minor == candidate.version.minor
                })
                .map_or(false, |(_, floor)| self.version >= *floor),
            (NetCoreApp, NetStandard) => {
                let ceiling = NETCORE_CEILING
                    .iter()
                    .find(|(major, _)| *major == self.version.major)
                    .map(|(_, ceiling)| *ceiling)
                    .unwrap_or(NETCORE_CEILING_LATEST);
                candidate.version <= ceiling
            },
            _ => false,
        }
    }

    /// Index of the nearest compatible framework among `candidates`.
    ///
    /// Preference: same family, then .NET Standard, then framework-neutral;
    /// platform-specific over platform-neutral; then the highest version.
    /// Ties keep the earliest candidate.
    pub fn nearest_index<'a, I>(&self, candidates: I) -> Option<usize>
    where
        I: IntoIterator<Item = &'a TargetFramework>,
    {
        let mut best: Option<(usize, (u8, bool, FrameworkVersion))> = None;

        for (index, candidate) in candidates.into_iter().enumerate() {
            if !self.can_consume(candidate) {
                continue;
            }
            let rank = self.family_rank(candidate);
            let score = (rank, candidate.platform.is_some(), candidate.version);
            let better = match &best {
                None => true,
                Some((_, current)) => {
                    score.0 < current.0
                        || (score.0 == current.0 && score.1 && !current.1)
                        || (score.0 == current.0 && score.1 == current.1 && score.2 > current.2)
                },
            };
            if better {
                best = Some((index, score));
            }
        }

        best.map(|(index, _)| index)
    }

    /// Nearest compatible framework among `candidates`
    pub fn nearest<'a>(&self, candidates: &'a [TargetFramework]) -> Option<&'a TargetFramework> {
        self.nearest_index(candidates).map(|index| &candidates[index])
    }

    fn family_rank(&self, candidate: &TargetFramework) -> u8 {
        if candidate.family == self.family {
            0
        } else if candidate.family == FrameworkFamily::NetStandard {
            1
        } else {
            2
        }
    }

    /// Short folder name (`net48`, `netstandard2.0`, `net8.0-windows`)
    pub fn short_name(&self) -> String {
        let v = self.version;
        let mut name = match self.family {
            FrameworkFamily::Any => return "any".to_string(),
            FrameworkFamily::NetFramework => {
                if v.build == 0 {
                    format!("net{}{}", v.major, v.minor)
                } else {
                    format!("net{}{}{}", v.major, v.minor, v.build)
                }
            },
            FrameworkFamily::NetStandard => format!("netstandard{}.{}", v.major, v.minor),
            FrameworkFamily::NetCoreApp if v.major >= 5 => format!("net{}.{}", v.major, v.minor),
            FrameworkFamily::NetCoreApp => format!("netcoreapp{}.{}", v.major, v.minor),
        };
        if let Some(platform) = &self.platform {
            name.push('-');
            name.push_str(&platform.to_string());
        }
        name
    }
}

impl FromStr for TargetFramework {
    type Err = TangleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for TargetFramework {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.short_name())
    }
}

impl Serialize for TargetFramework {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.short_name())
    }
}

impl<'de> Deserialize<'de> for TargetFramework {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        Self::parse(&text).map_err(serde::de::Error::custom)
    }
}
