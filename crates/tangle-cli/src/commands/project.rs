//! `tangle project` command implementation.
//!
//! Reads the lock file a restore left next to the project; nothing is
//! fetched from the network.

use std::path::Path;
use tangle_core::error::TangleResult;
use tangle_core::types::TargetFramework;
use tangle_project::{AssetsFileLoader, ProjectLoader};
use tangle_resolver::GraphAssembler;

use super::CommandContext;

/// Execute the `tangle project` command
pub async fn execute(path: &Path, framework: Option<&str>, json: bool, ctx: &CommandContext) -> TangleResult<()> {
    let project = ctx.cwd.as_std_path().join(path);
    let framework = framework.map(TargetFramework::parse).transpose()?;

    let snapshot = AssetsFileLoader::new().load(&project, framework.as_ref())?;
    let graph = GraphAssembler::from_project(&snapshot)?;

    ctx.output.graph(&graph, json)
}
