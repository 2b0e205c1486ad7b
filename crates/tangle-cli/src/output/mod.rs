//! Terminal output: colors, graph rendering and error messages.

pub mod colors;
pub mod errors;
pub mod tree;

use tangle_core::error::{TangleError, TangleResult};
use tangle_resolver::DependencyGraph;

/// Prints command results to stdout
pub struct OutputHandler {
    colors: colors::ColorSupport,
}

impl OutputHandler {
    /// Create a new output handler
    pub fn new() -> Self {
        Self {
            colors: colors::ColorSupport::detect(),
        }
    }

    /// Print a graph as an indented tree or as JSON
    pub fn graph(&self, graph: &DependencyGraph, json: bool) -> TangleResult<()> {
        if json {
            println!("{}", render_json(graph)?);
        } else {
            print!("{}", tree::render_tree(graph));
            eprintln!(
                "{}",
                self.colors
                    .dim(&format!("{} nodes, {} edges", graph.node_count(), graph.edge_count()))
            );
        }
        Ok(())
    }
}

impl Default for OutputHandler {
    fn default() -> Self {
        Self::new()
    }
}

/// Pretty-printed JSON document of the graph
pub fn render_json(graph: &DependencyGraph) -> TangleResult<String> {
    serde_json::to_string_pretty(graph)
        .map_err(|e| TangleError::io("Failed to serialize dependency graph".to_string(), e.into()))
}
