//! Candidate discovery across repositories
//!
//! Walks the dependency tree depth-first from a root identity with an
//! explicit stack. The visited set is keyed by full identity, so several
//! versions of one id may be discovered; the pruner settles those later.

use std::collections::{HashMap, HashSet};

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use tangle_core::error::TangleError;
use tangle_core::types::{Dependency, PackageId, PackageIdentity, TargetFramework, Version};
use tangle_registry::{CandidatePackage, Repository, RepositorySet};

use crate::semver::VersionSelector;
use crate::ResolverResult;

/// Resolver tuning
#[derive(Debug, Clone)]
pub struct ResolverOptions {
    /// Also seed the newest listed version satisfying each range, not just
    /// the lowest
    pub include_newest: bool,
}

impl Default for ResolverOptions {
    fn default() -> Self {
        Self { include_newest: true }
    }
}

/// Discovered candidates in discovery order, at most one per identity
#[derive(Debug, Clone, Default)]
pub struct CandidateSet {
    candidates: Vec<CandidatePackage>,
    index: HashMap<PackageIdentity, usize>,
}

impl CandidateSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a candidate; returns false and keeps the existing entry when the
    /// identity is already present
    pub fn insert(&mut self, candidate: CandidatePackage) -> bool {
        if self.index.contains_key(&candidate.identity) {
            return false;
        }
        self.index.insert(candidate.identity.clone(), self.candidates.len());
        self.candidates.push(candidate);
        true
    }

    pub fn get(&self, identity: &PackageIdentity) -> Option<&CandidatePackage> {
        self.index.get(identity).map(|&position| &self.candidates[position])
    }

    pub fn contains(&self, identity: &PackageIdentity) -> bool {
        self.index.contains_key(identity)
    }

    /// Candidates in discovery order
    pub fn iter(&self) -> impl Iterator<Item = &CandidatePackage> {
        self.candidates.iter()
    }

    /// Candidates sharing `id`, in discovery order
    pub fn versions_of<'a>(&'a self, id: &'a PackageId) -> impl Iterator<Item = &'a CandidatePackage> + 'a {
        self.candidates.iter().filter(move |candidate| &candidate.identity.id == id)
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    pub fn into_vec(self) -> Vec<CandidatePackage> {
        self.candidates
    }
}

impl FromIterator<CandidatePackage> for CandidateSet {
    fn from_iter<I: IntoIterator<Item = CandidatePackage>>(iter: I) -> Self {
        let mut set = Self::new();
        for candidate in iter {
            set.insert(candidate);
        }
        set
    }
}

/// Discovers every candidate reachable from a root identity
#[derive(Debug, Clone)]
pub struct RemoteResolver {
    repositories: RepositorySet,
    options: ResolverOptions,
}

/// Mutable state of one resolution, owned by the walk
#[derive(Default)]
struct Walk {
    candidates: CandidateSet,
    visited: HashSet<PackageIdentity>,
    listings: HashMap<PackageId, VersionSelector>,
}

impl RemoteResolver {
    pub fn new(repositories: RepositorySet, options: ResolverOptions) -> Self {
        Self { repositories, options }
    }

    pub fn repositories(&self) -> &RepositorySet {
        &self.repositories
    }

    /// Discover all candidates reachable from `root` for `framework`
    ///
    /// Fails with `PackageNotFound` when any reached identity is unknown to
    /// every repository, and with `Cancelled` as soon as `cancel` fires.
    pub async fn resolve(
        &self,
        root: &PackageIdentity,
        framework: &TargetFramework,
        cancel: &CancellationToken,
    ) -> ResolverResult<CandidateSet> {
        info!("Resolving {} for {}", root, framework);
        let mut walk = Walk::default();
        let mut stack = vec![root.clone()];

        while let Some(identity) = stack.pop() {
            if !walk.visited.insert(identity.clone()) {
                continue;
            }
            if cancel.is_cancelled() {
                return Err(TangleError::Cancelled);
            }

            let candidate = self
                .lookup(&identity, framework, cancel)
                .await?
                .ok_or_else(|| TangleError::PackageNotFound {
                    identity: identity.to_string(),
                })?;
            debug!(
                "Found {} in {} with {} dependencies",
                candidate.identity,
                candidate.source,
                candidate.dependencies.len()
            );

            let mut seeds = Vec::new();
            for dependency in &candidate.dependencies {
                seeds.extend(self.seed(dependency, &mut walk.listings, cancel).await?);
            }
            walk.candidates.insert(candidate);

            // first declared dependency is explored first
            for seed in seeds.into_iter().rev() {
                if !walk.visited.contains(&seed) {
                    stack.push(seed);
                }
            }
        }

        info!("Discovered {} candidates for {}", walk.candidates.len(), root);
        Ok(walk.candidates)
    }

    /// Ask every repository for `identity`; the first answer wins
    async fn lookup(
        &self,
        identity: &PackageIdentity,
        framework: &TargetFramework,
        cancel: &CancellationToken,
    ) -> ResolverResult<Option<CandidatePackage>> {
        let mut found: Option<CandidatePackage> = None;

        for (handle, repository) in self.repositories.iter() {
            let result = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(TangleError::Cancelled),
                result = repository.lookup_dependency_info(identity, framework) => result,
            };

            match result {
                Ok(Some(info)) if found.is_none() => found = Some(info.into_candidate(handle)),
                Ok(Some(_)) => warn!("Ignoring duplicate answer for {} from {}", identity, handle),
                Ok(None) => debug!("{} not in {}", identity, handle),
                Err(TangleError::Cancelled) => return Err(TangleError::Cancelled),
                Err(error) => warn!("Lookup of {} in {} failed: {}", identity, handle, error),
            }
        }

        Ok(found)
    }

    /// Identities to visit for one declared dependency
    async fn seed(
        &self,
        dependency: &Dependency,
        listings: &mut HashMap<PackageId, VersionSelector>,
        cancel: &CancellationToken,
    ) -> ResolverResult<Vec<PackageIdentity>> {
        if !listings.contains_key(&dependency.id) {
            let selector = self.list_versions(&dependency.id, cancel).await?;
            listings.insert(dependency.id.clone(), selector);
        }
        let selector = &listings[&dependency.id];

        let mut versions: Vec<Version> = Vec::new();
        if let Some(lowest) = selector.lowest_satisfying(&dependency.range) {
            versions.push(lowest);
            if self.options.include_newest {
                if let Some(highest) = selector.highest_satisfying(&dependency.range) {
                    if !versions.contains(&highest) {
                        versions.push(highest);
                    }
                }
            }
        } else if let Some(min) = dependency.range.min_version() {
            versions.push(min.clone());
        } else {
            return Err(TangleError::UnsatisfiedDependency {
                id: dependency.id.to_string(),
                range: dependency.range.to_string(),
            });
        }

        Ok(versions
            .into_iter()
            .map(|version| PackageIdentity::new(dependency.id.clone(), version))
            .collect())
    }

    /// Union of every repository's listing for `id`
    async fn list_versions(&self, id: &PackageId, cancel: &CancellationToken) -> ResolverResult<VersionSelector> {
        let mut versions = Vec::new();
        for (handle, repository) in self.repositories.iter() {
            let result = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(TangleError::Cancelled),
                result = repository.list_versions(id) => result,
            };
            match result {
                Ok(listed) => versions.extend(listed),
                Err(error) => warn!("Listing versions of {} in {} failed: {}", id, handle, error),
            }
        }
        Ok(VersionSelector::new(versions))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tangle_registry::{MemoryRepository, RepositoryHandle};

    fn identity(id: &str, version: &str) -> PackageIdentity {
        PackageIdentity::parse(id, version).unwrap()
    }

    fn dependency(id: &str, range: &str) -> Dependency {
        Dependency::parse(id, range).unwrap()
    }

    fn resolver(repositories: Vec<Arc<MemoryRepository>>, options: ResolverOptions) -> RemoteResolver {
        let set = RepositorySet::new(
            repositories
                .into_iter()
                .map(|repository| repository as Arc<dyn Repository>)
                .collect(),
        );
        RemoteResolver::new(set, options)
    }

    fn scenario_a() -> Arc<MemoryRepository> {
        let repository = Arc::new(MemoryRepository::new("feed"));
        repository.add_package(identity("A", "1.0.0"), vec![dependency("B", "[1.0.0, )")]);
        repository.add_package(identity("B", "1.0.0"), vec![]);
        repository.add_package(identity("B", "1.1.0"), vec![]);
        repository
    }

    fn discovered(set: &CandidateSet) -> Vec<String> {
        set.iter().map(|candidate| candidate.identity.to_string()).collect()
    }

    #[test]
    fn test_candidate_set_first_wins() {
        let handle = |index: usize| RepositoryHandle {
            index,
            name: format!("repo{}", index),
        };
        let candidate = |id: &str, index: usize| CandidatePackage {
            identity: identity(id, "1.0.0"),
            source: handle(index),
            dependencies: vec![],
        };

        let mut set = CandidateSet::new();
        assert!(set.insert(candidate("A", 0)));
        assert!(!set.insert(candidate("a", 1)));
        assert!(set.insert(candidate("B", 1)));

        assert_eq!(set.len(), 2);
        assert_eq!(set.get(&identity("A", "1.0.0")).unwrap().source.index, 0);
        assert_eq!(set.versions_of(&PackageId::new("b")).count(), 1);
    }

    #[tokio::test]
    async fn test_seeds_lowest_and_newest() {
        let resolver = resolver(vec![scenario_a()], ResolverOptions::default());
        let set = resolver
            .resolve(&identity("A", "1.0.0"), &TargetFramework::any(), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(discovered(&set), vec!["A@1.0.0", "B@1.0.0", "B@1.1.0"]);
    }

    #[tokio::test]
    async fn test_seeds_lowest_only() {
        let options = ResolverOptions { include_newest: false };
        let resolver = resolver(vec![scenario_a()], options);
        let set = resolver
            .resolve(&identity("A", "1.0.0"), &TargetFramework::any(), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(discovered(&set), vec!["A@1.0.0", "B@1.0.0"]);
    }

    #[tokio::test]
    async fn test_range_minimum_without_listing() {
        let repository = Arc::new(MemoryRepository::new("exact").without_version_listing());
        repository.add_package(identity("A", "1.0.0"), vec![dependency("B", "[1.0.0, )")]);
        repository.add_package(identity("B", "1.0.0"), vec![]);
        repository.add_package(identity("B", "1.1.0"), vec![]);

        let resolver = resolver(vec![repository], ResolverOptions::default());
        let set = resolver
            .resolve(&identity("A", "1.0.0"), &TargetFramework::any(), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(discovered(&set), vec!["A@1.0.0", "B@1.0.0"]);
    }

    #[tokio::test]
    async fn test_unbounded_range_without_listing_fails() {
        let repository = Arc::new(MemoryRepository::new("exact").without_version_listing());
        repository.add_package(identity("A", "1.0.0"), vec![dependency("B", "(, 2.0)")]);

        let resolver = resolver(vec![repository], ResolverOptions::default());
        let result = resolver
            .resolve(&identity("A", "1.0.0"), &TargetFramework::any(), &CancellationToken::new())
            .await;

        assert!(matches!(result, Err(TangleError::UnsatisfiedDependency { .. })));
    }

    #[tokio::test]
    async fn test_cycles_terminate() {
        let repository = Arc::new(MemoryRepository::new("feed"));
        repository.add_package(identity("A", "1.0.0"), vec![dependency("B", "[1.0.0]")]);
        repository.add_package(identity("B", "1.0.0"), vec![dependency("A", "[1.0.0]")]);

        let resolver = resolver(vec![repository], ResolverOptions::default());
        let set = resolver
            .resolve(&identity("A", "1.0.0"), &TargetFramework::any(), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(set.len(), 2);
    }

    #[tokio::test]
    async fn test_first_repository_wins_and_failures_are_misses() {
        let broken = Arc::new(MemoryRepository::new("broken"));
        broken.add_package(identity("A", "1.0.0"), vec![]);
        broken.fail_on(identity("A", "1.0.0"));

        let primary = Arc::new(MemoryRepository::new("primary"));
        primary.add_package(identity("A", "1.0.0"), vec![dependency("B", "[1.0.0]")]);
        primary.add_package(identity("B", "1.0.0"), vec![]);

        let mirror = Arc::new(MemoryRepository::new("mirror"));
        mirror.add_package(identity("A", "1.0.0"), vec![]);

        let resolver = resolver(vec![broken, primary, mirror], ResolverOptions::default());
        let set = resolver
            .resolve(&identity("A", "1.0.0"), &TargetFramework::any(), &CancellationToken::new())
            .await
            .unwrap();

        let root = set.get(&identity("A", "1.0.0")).unwrap();
        assert_eq!(root.source.name, "primary");
        assert_eq!(root.dependencies.len(), 1);
        assert!(set.contains(&identity("B", "1.0.0")));
    }

    #[tokio::test]
    async fn test_missing_root() {
        let resolver = resolver(vec![scenario_a()], ResolverOptions::default());
        let result = resolver
            .resolve(&identity("Nope", "1.0.0"), &TargetFramework::any(), &CancellationToken::new())
            .await;

        match result {
            Err(TangleError::PackageNotFound { identity }) => assert_eq!(identity, "Nope@1.0.0"),
            other => panic!("Expected PackageNotFound, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_missing_transitive_dependency() {
        let repository = Arc::new(MemoryRepository::new("feed").without_version_listing());
        repository.add_package(identity("A", "1.0.0"), vec![dependency("Gone", "[3.0.0, )")]);

        let resolver = resolver(vec![repository], ResolverOptions::default());
        let result = resolver
            .resolve(&identity("A", "1.0.0"), &TargetFramework::any(), &CancellationToken::new())
            .await;

        assert!(matches!(result, Err(TangleError::PackageNotFound { .. })));
    }

    #[tokio::test]
    async fn test_cancelled_before_start() {
        let resolver = resolver(vec![scenario_a()], ResolverOptions::default());
        let cancel = CancellationToken::new();
        cancel.cancel();

        let result = resolver
            .resolve(&identity("A", "1.0.0"), &TargetFramework::any(), &cancel)
            .await;
        assert!(matches!(result, Err(TangleError::Cancelled)));
    }

    #[tokio::test]
    async fn test_framework_specific_dependencies() {
        use tangle_registry::DependencyGroup;

        let repository = Arc::new(MemoryRepository::new("feed"));
        repository.add_package_with_groups(
            identity("A", "1.0.0"),
            vec![
                DependencyGroup {
                    framework: TargetFramework::parse("net45").unwrap(),
                    dependencies: vec![],
                },
                DependencyGroup {
                    framework: TargetFramework::parse("netstandard2.0").unwrap(),
                    dependencies: vec![dependency("B", "1.0.0")],
                },
            ],
        );
        repository.add_package(identity("B", "1.0.0"), vec![]);

        let resolver = resolver(vec![repository], ResolverOptions::default());
        let cancel = CancellationToken::new();

        let net48 = TargetFramework::parse("net48").unwrap();
        let set = resolver.resolve(&identity("A", "1.0.0"), &net48, &cancel).await.unwrap();
        assert_eq!(set.len(), 1);

        let net8 = TargetFramework::parse("net8.0").unwrap();
        let set = resolver.resolve(&identity("A", "1.0.0"), &net8, &cancel).await.unwrap();
        assert_eq!(set.len(), 2);
    }
}
