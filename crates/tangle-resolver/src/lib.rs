//! Dependency resolution and graph assembly for tangle
//!
//! The registry path runs `RemoteResolver` to discover candidates,
//! `VersionPruner` to keep one version per id, `AssetSelector` to pick each
//! package's binaries for the target framework, and `GraphAssembler` to
//! freeze the result into a `DependencyGraph`. The project path feeds a lock
//! file snapshot straight into the assembler.

pub mod assemble;
pub mod assets;
pub mod graph;
pub mod prune;
pub mod remote;
pub mod semver;

// Re-export main types
pub use assemble::{AssemblerOptions, GraphAssembler};
pub use assets::{AssetSelector, SelectedAssets};
pub use graph::{
    AssemblyName, AssemblyReferenceNode, DependencyGraph, Edge, GraphBuilder, Node, NodeKey,
    PackageReferenceNode, ProjectReferenceNode,
};
pub use prune::VersionPruner;
pub use remote::{CandidateSet, RemoteResolver, ResolverOptions};
pub use semver::VersionSelector;

pub use tokio_util::sync::CancellationToken;

use tangle_core::error::TangleError;

/// Result type for resolver operations
pub type ResolverResult<T> = Result<T, TangleError>;
