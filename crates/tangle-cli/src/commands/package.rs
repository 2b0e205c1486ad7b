//! `tangle package` command implementation.
//!
//! Resolves a package identity against the configured repositories and
//! prints the graph for one target framework.

use tangle_config::{CliOverrides, ConfigLayering};
use tangle_core::error::{TangleError, TangleResult};
use tangle_core::types::PackageIdentity;
use tangle_resolver::GraphAssembler;

use super::{assembler_options, build_repositories, CommandContext};

/// Execute the `tangle package` command
pub async fn execute(
    id: &str,
    version: &str,
    framework: Option<String>,
    sources: Vec<String>,
    json: bool,
    ctx: &CommandContext,
) -> TangleResult<()> {
    let identity = PackageIdentity::parse(id, version)?;

    let overrides = CliOverrides {
        framework,
        sources,
        ..CliOverrides::default()
    };
    let settings = ctx
        .config
        .load(&ConfigLayering::collect_env_overrides(), &overrides)
        .await?;

    let framework = settings
        .default_framework
        .clone()
        .ok_or_else(|| TangleError::ConfigValidation {
            field: "framework".to_string(),
            reason: "No target framework; pass --framework or set default-framework in tangle.toml".to_string(),
        })?;

    let assembler = GraphAssembler::new(build_repositories(&settings)?, assembler_options(&settings));
    let graph = assembler.from_package(&identity, &framework, &ctx.cancel).await?;

    ctx.output.graph(&graph, json)
}
