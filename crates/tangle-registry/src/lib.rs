//! Package repository clients for tangle
//!
//! This crate defines the boundary the resolver talks to (`Repository`) and
//! ships two implementations: an HTTP client for package-base-address feeds
//! with retry, authentication and metadata caching, and an in-memory
//! repository for embedding and tests.

pub mod api;
pub mod archive;
pub mod cache;
pub mod client;
pub mod memory;
pub mod nuspec;

// Re-export main types
pub use api::{
    CandidatePackage, FrameworkItems, PackageContents, PackageDependencyInfo, Repository,
    RepositoryHandle, RepositorySet,
};
pub use cache::{CacheEntry, CacheKey, CacheStats, MetadataCache};
pub use client::{AuthConfig, HttpRepository, RetryConfig};
pub use memory::MemoryRepository;
pub use nuspec::{DependencyGroup, PackageManifest};

use tangle_core::error::TangleError;

/// Result type for registry operations
pub type RegistryResult<T> = Result<T, TangleError>;
