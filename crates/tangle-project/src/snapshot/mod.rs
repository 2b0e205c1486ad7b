//! What a restored project looks like to the graph assembler

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use tangle_core::types::{Dependency, PackageId, TargetFramework, Version};

use crate::ProjectResult;

/// Whether a lock-file library is a package or another project
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LibraryKind {
    Package,
    Project,
}

/// One library the lock file resolved for the project's framework
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockLibrary {
    pub id: PackageId,
    pub version: Version,
    pub kind: LibraryKind,
    /// Project file of a project library, resolved against the project
    /// directory
    pub path: Option<PathBuf>,
    /// Assemblies the library expects the framework to provide
    pub framework_assemblies: Vec<String>,
    /// Runtime assembly paths as recorded in the lock file
    pub runtime_assemblies: Vec<String>,
    pub dependencies: Vec<Dependency>,
}

impl LockLibrary {
    pub fn is_project(&self) -> bool {
        self.kind == LibraryKind::Project
    }
}

/// Inputs of the lock-file-driven graph path
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectSnapshot {
    pub project_path: PathBuf,
    pub target_framework: TargetFramework,
    pub libraries: Vec<LockLibrary>,
    /// Packages the project references directly, range as written
    pub package_references: Vec<Dependency>,
    /// Assembly file names the project references directly
    pub file_references: Vec<String>,
}

impl ProjectSnapshot {
    /// Library with `id`, matched case-insensitively
    pub fn library(&self, id: &PackageId) -> Option<&LockLibrary> {
        self.libraries.iter().find(|library| &library.id == id)
    }
}

/// Produces a snapshot for a project file
pub trait ProjectLoader {
    /// Load `project` for `framework`, or for the project's own framework
    /// when none is given
    fn load(&self, project: &Path, framework: Option<&TargetFramework>) -> ProjectResult<ProjectSnapshot>;
}
