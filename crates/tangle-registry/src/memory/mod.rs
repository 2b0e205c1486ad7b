//! In-process repository populated programmatically

use async_trait::async_trait;
use dashmap::{DashMap, DashSet};
use tracing::debug;

use tangle_core::error::TangleError;
use tangle_core::types::{Dependency, PackageId, PackageIdentity, TargetFramework, Version};

use crate::api::{PackageContents, PackageDependencyInfo, Repository};
use crate::nuspec::DependencyGroup;
use crate::RegistryResult;

#[derive(Debug, Clone)]
struct StoredPackage {
    identity: PackageIdentity,
    groups: Vec<DependencyGroup>,
    contents: PackageContents,
}

/// Repository whose packages live in memory
///
/// Useful for embedding callers that already hold package metadata and for
/// exercising the resolver without a network.
#[derive(Debug)]
pub struct MemoryRepository {
    name: String,
    packages: DashMap<PackageIdentity, StoredPackage>,
    enumerable: bool,
    failing: DashSet<PackageIdentity>,
}

impl MemoryRepository {
    /// Create an empty repository that can enumerate versions
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            packages: DashMap::new(),
            enumerable: true,
            failing: DashSet::new(),
        }
    }

    /// Stop answering version listings, like feeds that only serve exact
    /// identities
    pub fn without_version_listing(mut self) -> Self {
        self.enumerable = false;
        self
    }

    /// Add a package whose dependencies apply to every framework
    pub fn add_package(&self, identity: PackageIdentity, dependencies: Vec<Dependency>) {
        self.add_package_with_groups(
            identity,
            vec![DependencyGroup {
                framework: TargetFramework::any(),
                dependencies,
            }],
        );
    }

    /// Add a package with per-framework dependency groups
    pub fn add_package_with_groups(&self, identity: PackageIdentity, groups: Vec<DependencyGroup>) {
        let contents = self
            .packages
            .get(&identity)
            .map(|stored| stored.contents.clone())
            .unwrap_or_default();
        self.packages.insert(
            identity.clone(),
            StoredPackage {
                identity,
                groups,
                contents,
            },
        );
    }

    /// Set what `download` returns for an identity already added
    pub fn set_contents(&self, identity: &PackageIdentity, contents: PackageContents) -> RegistryResult<()> {
        let mut stored = self
            .packages
            .get_mut(identity)
            .ok_or_else(|| TangleError::PackageNotFound {
                identity: identity.to_string(),
            })?;
        stored.contents = contents;
        Ok(())
    }

    /// Make every request for `identity` fail with a network error
    pub fn fail_on(&self, identity: PackageIdentity) {
        self.failing.insert(identity);
    }

    pub fn len(&self) -> usize {
        self.packages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.packages.is_empty()
    }

    fn check_failure(&self, identity: &PackageIdentity) -> RegistryResult<()> {
        if self.failing.contains(identity) {
            return Err(TangleError::Network {
                message: format!("{} is unavailable from '{}'", identity, self.name),
                source: None,
            });
        }
        Ok(())
    }
}

#[async_trait]
impl Repository for MemoryRepository {
    fn name(&self) -> &str {
        &self.name
    }

    async fn lookup_dependency_info(
        &self,
        identity: &PackageIdentity,
        framework: &TargetFramework,
    ) -> RegistryResult<Option<PackageDependencyInfo>> {
        self.check_failure(identity)?;

        let Some(stored) = self.packages.get(identity) else {
            debug!("{} not found in '{}'", identity, self.name);
            return Ok(None);
        };
        let dependencies = framework
            .nearest_index(stored.groups.iter().map(|group| &group.framework))
            .map(|index| stored.groups[index].dependencies.clone())
            .unwrap_or_default();

        Ok(Some(PackageDependencyInfo {
            identity: stored.identity.clone(),
            dependencies,
        }))
    }

    async fn list_versions(&self, id: &PackageId) -> RegistryResult<Vec<Version>> {
        if !self.enumerable {
            return Ok(Vec::new());
        }
        let mut versions: Vec<Version> = self
            .packages
            .iter()
            .filter(|entry| &entry.key().id == id)
            .map(|entry| entry.key().version.clone())
            .collect();
        versions.sort();
        Ok(versions)
    }

    async fn download(&self, identity: &PackageIdentity) -> RegistryResult<PackageContents> {
        self.check_failure(identity)?;

        self.packages
            .get(identity)
            .map(|stored| stored.contents.clone())
            .ok_or_else(|| TangleError::PackageNotFound {
                identity: identity.to_string(),
            })
    }
}
