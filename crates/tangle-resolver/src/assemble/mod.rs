//! Building dependency graphs
//!
//! Two entry points share one builder discipline: every node is registered
//! before any edge that references it.
//!
//! - `from_package` resolves a root identity against the repositories,
//!   prunes to one version per id, downloads each survivor and selects its
//!   assets for the target framework.
//! - `from_project` takes a lock file snapshot that a restore already
//!   computed.

use futures::stream::{self, StreamExt, TryStreamExt};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use tangle_core::error::TangleError;
use tangle_core::types::{PackageId, PackageIdentity, TargetFramework};
use tangle_core::utils::item_file_name;
use tangle_project::{LibraryKind, LockLibrary, ProjectSnapshot};
use tangle_registry::{CandidatePackage, PackageContents, RepositorySet};

use crate::assets::{AssetSelector, SelectedAssets};
use crate::graph::{DependencyGraph, GraphBuilder, Node, NodeKey};
use crate::prune::VersionPruner;
use crate::remote::{RemoteResolver, ResolverOptions};
use crate::ResolverResult;

/// Default number of package downloads in flight
pub const DEFAULT_DOWNLOAD_CONCURRENCY: usize = 8;

/// Marker file packages use to publish an empty folder
const EMPTY_FOLDER_MARKER: &str = "_._";

/// Assembler tuning
#[derive(Debug, Clone)]
pub struct AssemblerOptions {
    pub resolver: ResolverOptions,
    /// Maximum concurrent package downloads
    pub download_concurrency: usize,
}

impl Default for AssemblerOptions {
    fn default() -> Self {
        Self {
            resolver: ResolverOptions::default(),
            download_concurrency: DEFAULT_DOWNLOAD_CONCURRENCY,
        }
    }
}

/// Builds dependency graphs from a package root or a restored project
#[derive(Debug, Clone)]
pub struct GraphAssembler {
    resolver: RemoteResolver,
    options: AssemblerOptions,
}

impl GraphAssembler {
    pub fn new(repositories: RepositorySet, options: AssemblerOptions) -> Self {
        Self {
            resolver: RemoteResolver::new(repositories, options.resolver.clone()),
            options,
        }
    }

    pub fn options(&self) -> &AssemblerOptions {
        &self.options
    }

    /// Graph of `root` and everything it pulls in for `framework`
    ///
    /// Either the complete graph is returned or an error; cancellation at any
    /// point yields `Cancelled`.
    pub async fn from_package(
        &self,
        root: &PackageIdentity,
        framework: &TargetFramework,
        cancel: &CancellationToken,
    ) -> ResolverResult<DependencyGraph> {
        let candidates = self.resolver.resolve(root, framework, cancel).await?;
        let pruned = VersionPruner::prune(&candidates, root)?;
        info!("Downloading {} packages for {}", pruned.len(), framework);

        let selector = &AssetSelector::new(framework.clone());
        let assets: Vec<SelectedAssets> = stream::iter(
            pruned
                .iter()
                .map(move |candidate| self.select_assets(candidate, selector, cancel)),
        )
        .buffered(self.options.download_concurrency.max(1))
        .try_collect()
        .await?;

        let mut builder = GraphBuilder::new(Node::package(root.clone()));
        for (candidate, selected) in pruned.iter().zip(&assets) {
            let node = Node::package(candidate.identity.clone());
            let key = node.key();
            builder.with_node(node);
            for name in selected.names() {
                add_assembly(&mut builder, &key, name)?;
            }
        }

        for candidate in &pruned {
            let from = NodeKey::Package(candidate.identity.clone());
            for dependency in &candidate.dependencies {
                let target = pruned
                    .iter()
                    .find(|other| dependency.accepts(&other.identity.id, &other.identity.version))
                    .ok_or_else(|| TangleError::UnsatisfiedDependency {
                        id: dependency.id.to_string(),
                        range: dependency.range.to_string(),
                    })?;
                let to = NodeKey::Package(target.identity.clone());
                builder.with_edge(&from, &to, Some(dependency.range.to_string()))?;
            }
        }

        let graph = builder.build();
        info!(
            "Built graph for {} with {} nodes and {} edges",
            root,
            graph.node_count(),
            graph.edge_count()
        );
        Ok(graph)
    }

    async fn select_assets(
        &self,
        candidate: &CandidatePackage,
        selector: &AssetSelector,
        cancel: &CancellationToken,
    ) -> ResolverResult<SelectedAssets> {
        let contents = self.download(candidate, cancel).await?;
        let selected = selector.select(&contents);
        if selected.is_empty() {
            debug!("{} has no assets for {}", candidate.identity, selector.framework());
        }
        Ok(selected)
    }

    /// Download from the repository that answered for the candidate, then
    /// from the others in order when it fails
    async fn download(&self, candidate: &CandidatePackage, cancel: &CancellationToken) -> ResolverResult<PackageContents> {
        let repositories = self.resolver.repositories();
        let source = repositories
            .get(&candidate.source)
            .map(|repository| (candidate.source.clone(), repository));
        let fallbacks = repositories
            .iter()
            .filter(|(handle, _)| handle.index != candidate.source.index);

        let mut last_error = None;
        for (handle, repository) in source.into_iter().chain(fallbacks) {
            let result = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(TangleError::Cancelled),
                result = repository.download(&candidate.identity) => result,
            };
            match result {
                Ok(contents) => return Ok(contents),
                Err(error) if error.is_recoverable() || matches!(error, TangleError::PackageNotFound { .. }) => {
                    warn!("Download of {} from {} failed: {}", candidate.identity, handle, error);
                    last_error = Some(error);
                },
                Err(error) => return Err(error),
            }
        }

        Err(last_error.unwrap_or_else(|| TangleError::PackageNotFound {
            identity: candidate.identity.to_string(),
        }))
    }

    /// Graph of a restored project from its lock file snapshot
    pub fn from_project(snapshot: &ProjectSnapshot) -> ResolverResult<DependencyGraph> {
        let root = Node::project(&snapshot.project_path);
        let root_key = root.key();
        let mut builder = GraphBuilder::new(root);

        let mut library_keys = Vec::with_capacity(snapshot.libraries.len());
        for library in &snapshot.libraries {
            let node = library_node(library);
            let key = node.key();
            builder.with_node(node);
            for name in library_assemblies(library) {
                add_assembly(&mut builder, &key, name)?;
            }
            library_keys.push(key);
        }

        let key_of = |id: &PackageId, range: String| {
            snapshot
                .libraries
                .iter()
                .position(|library| &library.id == id)
                .map(|index| &library_keys[index])
                .ok_or_else(|| TangleError::UnsatisfiedDependency {
                    id: id.to_string(),
                    range,
                })
        };

        for (library, from) in snapshot.libraries.iter().zip(&library_keys) {
            for dependency in &library.dependencies {
                let label = dependency.range.to_string();
                let to = key_of(&dependency.id, label.clone())?;
                builder.with_edge(from, to, Some(label))?;
            }
        }

        for reference in &snapshot.package_references {
            let label = reference.range.to_string();
            let to = key_of(&reference.id, label.clone())?;
            builder.with_edge(&root_key, to, Some(label))?;
        }
        for reference in &snapshot.file_references {
            add_assembly(&mut builder, &root_key, reference)?;
        }

        let graph = builder.build();
        info!(
            "Built graph for {} with {} nodes and {} edges",
            snapshot.project_path.display(),
            graph.node_count(),
            graph.edge_count()
        );
        Ok(graph)
    }
}

fn add_assembly(builder: &mut GraphBuilder, from: &NodeKey, name: &str) -> ResolverResult<()> {
    let node = Node::assembly(name);
    let key = node.key();
    builder.with_node(node);
    builder.with_edge(from, &key, None)
}

fn library_node(library: &LockLibrary) -> Node {
    match (library.kind, &library.path) {
        (LibraryKind::Project, Some(path)) => Node::project(path),
        _ => Node::package(PackageIdentity::new(library.id.clone(), library.version.clone())),
    }
}

/// Framework assemblies, then runtime file names, without placeholders
fn library_assemblies(library: &LockLibrary) -> impl Iterator<Item = &str> {
    let framework = library.framework_assemblies.iter().map(|name| name.trim());
    let runtime = library.runtime_assemblies.iter().map(|path| item_file_name(path));
    framework
        .chain(runtime)
        .filter(|name| !name.is_empty() && *name != EMPTY_FOLDER_MARKER)
}
