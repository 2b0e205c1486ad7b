//! # tangle-core
//!
//! Core types and utilities shared across all tangle crates.
//!
//! This crate provides:
//! - Version, VersionRange and case-insensitive package identity types
//! - Target framework parsing and the framework compatibility table
//! - TangleError enum for unified error handling
//! - Path helpers used to key project nodes
//!
//! ## Architecture
//!
//! The crate is organized into modules:
//! - `types`: Core value types (Version, VersionRange, PackageIdentity, TargetFramework)
//! - `error`: Error types and result aliases
//! - `utils`: Utility functions and helpers

pub mod error;
pub mod types;
pub mod utils;

// Re-export commonly used types
pub use error::{TangleError, TangleResult};
pub use types::{
    Dependency, FrameworkFamily, FrameworkPlatform, PackageId, PackageIdentity, TargetFramework,
    Version, VersionRange,
};
