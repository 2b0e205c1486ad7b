//! Configuration for tangle
//!
//! This crate parses `tangle.toml` files and layers the global file, the
//! project file, `TANGLE_*` environment variables and command line flags
//! into one effective `Settings` value.

pub mod merge;
pub mod toml;

// Re-export main types
pub use merge::{CliOverrides, ConfigLayering, ConfigLoader, ConfigSource, Settings};
pub use self::toml::{CacheSection, RepositoryEntry, ResolverSection, TangleToml};

use tangle_core::error::TangleError;

/// Result type for configuration operations
pub type ConfigResult<T> = Result<T, TangleError>;
