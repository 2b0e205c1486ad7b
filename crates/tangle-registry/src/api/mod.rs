//! Repository boundary types
//!
//! The resolver only ever sees repositories through `Repository` and the
//! ordered `RepositorySet` the caller supplies.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use tangle_core::types::{Dependency, PackageId, PackageIdentity, TargetFramework, Version};

use crate::RegistryResult;

/// Dependency metadata a repository reports for one package version
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageDependencyInfo {
    /// Identity as reported by the repository
    pub identity: PackageIdentity,
    /// Dependencies applicable to the requested framework
    pub dependencies: Vec<Dependency>,
}

/// Position and name of a repository in the caller-supplied order
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RepositoryHandle {
    pub index: usize,
    pub name: String,
}

/// A (package, version) discovered during resolution, before pruning
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidatePackage {
    pub identity: PackageIdentity,
    /// Repository whose answer was kept for this identity
    pub source: RepositoryHandle,
    pub dependencies: Vec<Dependency>,
}

/// Items a package publishes for one framework
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameworkItems {
    pub framework: TargetFramework,
    pub items: Vec<String>,
}

/// Downloaded package contents, grouped by framework
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageContents {
    /// Library files (`lib/<tfm>/<file>`)
    pub library_items: Vec<FrameworkItems>,
    /// Assemblies the package expects the framework itself to provide
    pub framework_items: Vec<FrameworkItems>,
}

/// A package source the resolver can query
#[async_trait]
pub trait Repository: Send + Sync + fmt::Debug {
    /// Display name used in logs and candidate handles
    fn name(&self) -> &str;

    /// Dependency metadata for an exact identity, `None` when the repository
    /// does not have it
    async fn lookup_dependency_info(
        &self,
        identity: &PackageIdentity,
        framework: &TargetFramework,
    ) -> RegistryResult<Option<PackageDependencyInfo>>;

    /// Every published version of `id`; repositories that cannot enumerate
    /// return an empty list
    async fn list_versions(&self, _id: &PackageId) -> RegistryResult<Vec<Version>> {
        Ok(Vec::new())
    }

    /// Fetch the package's library and framework items
    async fn download(&self, identity: &PackageIdentity) -> RegistryResult<PackageContents>;
}

impl PackageDependencyInfo {
    /// Attach the answering repository to produce a candidate
    pub fn into_candidate(self, source: RepositoryHandle) -> CandidatePackage {
        CandidatePackage {
            identity: self.identity,
            source,
            dependencies: self.dependencies,
        }
    }
}

impl FrameworkItems {
    pub fn new(framework: TargetFramework, items: Vec<String>) -> Self {
        Self { framework, items }
    }
}

impl PackageContents {
    /// Check whether the package publishes nothing at all
    pub fn is_empty(&self) -> bool {
        self.library_items.iter().all(|group| group.items.is_empty())
            && self.framework_items.iter().all(|group| group.items.is_empty())
    }
}

impl fmt::Display for RepositoryHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.name, self.index)
    }
}

/// Ordered list of repositories; earlier repositories answer first
#[derive(Debug, Clone, Default)]
pub struct RepositorySet {
    repositories: Vec<Arc<dyn Repository>>,
}

impl RepositorySet {
    pub fn new(repositories: Vec<Arc<dyn Repository>>) -> Self {
        Self { repositories }
    }

    /// Append a repository at the lowest priority
    pub fn push(&mut self, repository: Arc<dyn Repository>) {
        self.repositories.push(repository);
    }

    pub fn len(&self) -> usize {
        self.repositories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.repositories.is_empty()
    }

    /// Repositories with their handles, in priority order
    pub fn iter(&self) -> impl Iterator<Item = (RepositoryHandle, &Arc<dyn Repository>)> {
        self.repositories.iter().enumerate().map(|(index, repository)| {
            let handle = RepositoryHandle {
                index,
                name: repository.name().to_string(),
            };
            (handle, repository)
        })
    }

    /// Repository a handle refers to
    pub fn get(&self, handle: &RepositoryHandle) -> Option<&Arc<dyn Repository>> {
        self.repositories.get(handle.index)
    }
}
