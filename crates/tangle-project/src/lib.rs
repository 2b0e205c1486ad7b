//! Project loading for tangle
//!
//! Turns a restored project into a `ProjectSnapshot`: the effective target
//! framework, every library the lock file resolved for it, and the
//! project's own direct references. The build system is never invoked; the
//! lock file must already exist.

pub mod loader;
pub mod lockfile;
pub mod msbuild;
pub mod snapshot;

// Re-export main types
pub use loader::AssetsFileLoader;
pub use lockfile::{parse_lock_file, LockFile};
pub use msbuild::{parse_project_file, ProjectFile};
pub use snapshot::{LibraryKind, LockLibrary, ProjectLoader, ProjectSnapshot};

use tangle_core::error::TangleError;

/// Result type for project loading
pub type ProjectResult<T> = Result<T, TangleError>;
