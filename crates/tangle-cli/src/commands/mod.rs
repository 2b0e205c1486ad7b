//! Command implementations and dispatch logic.
//!
//! Each command is an async function that takes the shared `CommandContext`.

use camino::Utf8PathBuf;
use std::sync::Arc;
use tangle_config::{ConfigLoader, Settings};
use tangle_core::error::{TangleError, TangleResult};
use tangle_registry::{AuthConfig, HttpRepository, MetadataCache, RepositorySet};
use tangle_resolver::{AssemblerOptions, ResolverOptions};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

pub mod package;
pub mod project;


use crate::{output::OutputHandler, Commands};

/// Shared context for all commands
pub struct CommandContext {
    pub cwd: Utf8PathBuf,
    pub config: ConfigLoader,
    pub output: OutputHandler,
    /// Cancelled on Ctrl-C
    pub cancel: CancellationToken,
}

impl CommandContext {
    /// Create a command context for the current directory
    pub fn new(cancel: CancellationToken) -> TangleResult<Self> {
        let cwd = std::env::current_dir()
            .map_err(|e| TangleError::io("Failed to get current directory".to_string(), e))?;
        let cwd = Utf8PathBuf::from_path_buf(cwd).map_err(|path| TangleError::ConfigValidation {
            field: "cwd".to_string(),
            reason: format!("Current directory {} is not valid UTF-8", path.display()),
        })?;

        Ok(Self {
            config: ConfigLoader::new(cwd.clone()),
            cwd,
            output: OutputHandler::new(),
            cancel,
        })
    }
}

/// Dispatch a command to its handler
pub async fn dispatch_command(command: Commands, ctx: &CommandContext) -> TangleResult<()> {
    match command {
        Commands::Package {
            id,
            version,
            framework,
            sources,
            json,
        } => {
            info!("Resolving package {} {}", id, version);
            package::execute(&id, &version, framework, sources, json, ctx).await
        },
        Commands::Project { path, framework, json } => {
            info!("Reading project {}", path.display());
            project::execute(&path, framework.as_deref(), json, ctx).await
        },
    }
}

/// One HTTP repository per configured entry, sharing a manifest cache
pub fn build_repositories(settings: &Settings) -> TangleResult<RepositorySet> {
    let cache = Arc::new(MetadataCache::with_default_ttl(settings.cache_ttl));
    let mut repositories = RepositorySet::default();

    for entry in &settings.repositories {
        let auth = AuthConfig {
            token: entry.token.clone(),
            username: entry.username.clone(),
            password: entry.password.clone(),
        };
        let repository = if auth.token.is_some() || auth.username.is_some() {
            HttpRepository::with_auth(entry.name.as_str(), &entry.url, auth)?
        } else {
            HttpRepository::new(entry.name.as_str(), &entry.url)?
        };
        debug!("Using repository {} at {}", entry.name, repository.base_url());
        repositories.push(Arc::new(repository.with_cache(cache.clone())));
    }

    Ok(repositories)
}

/// Assembler tuning taken from the effective settings
pub fn assembler_options(settings: &Settings) -> AssemblerOptions {
    AssemblerOptions {
        resolver: ResolverOptions {
            include_newest: settings.include_newest,
        },
        download_concurrency: settings.download_concurrency,
    }
}
