//! Core data types for tangle.
//!
//! This module provides the fundamental value types used throughout tangle:
//! - Versions and version ranges
//! - Case-insensitive package ids and identities
//! - Dependency declarations
//! - Target frameworks and their compatibility table

pub mod dependency;
pub mod framework;
pub mod identity;
pub mod range;
pub mod version;

// Re-export all public types
pub use dependency::Dependency;
pub use framework::{FrameworkFamily, FrameworkPlatform, FrameworkVersion, TargetFramework};
pub use identity::{PackageId, PackageIdentity};
pub use range::VersionRange;
pub use version::Version;
