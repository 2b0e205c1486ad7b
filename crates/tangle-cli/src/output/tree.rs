//! Indented text rendering of a dependency graph.

use std::collections::HashSet;
use std::fmt::Write;

use tangle_resolver::{DependencyGraph, Node, NodeKey};

const BRANCH: &str = "├── ";
const LAST_BRANCH: &str = "└── ";
const PIPE: &str = "│   ";
const SPACE: &str = "    ";

/// Tree from the root, children in edge order
///
/// A package or project reached a second time is printed once more with
/// `(*)` and not expanded again.
pub fn render_tree(graph: &DependencyGraph) -> String {
    let mut out = String::new();
    let mut expanded = HashSet::new();
    expanded.insert(graph.root_key().clone());

    let _ = writeln!(out, "{}", graph.root());
    render_children(graph, graph.root_key(), "", &mut expanded, &mut out);
    out
}

fn render_children(
    graph: &DependencyGraph,
    key: &NodeKey,
    prefix: &str,
    expanded: &mut HashSet<NodeKey>,
    out: &mut String,
) {
    let edges = graph.edges_from(key);
    for (position, edge) in edges.iter().enumerate() {
        let Some(node) = graph.node(&edge.to) else {
            continue;
        };
        let last = position + 1 == edges.len();
        let branch = if last { LAST_BRANCH } else { BRANCH };

        let mut line = format!("{}{}{}", prefix, branch, node);
        if let Some(label) = &edge.label {
            let _ = write!(line, " {}", label);
        }

        let repeated = !matches!(node, Node::Assembly(_)) && !expanded.insert(edge.to.clone());
        if repeated && !graph.edges_from(&edge.to).is_empty() {
            line.push_str(" (*)");
        }
        let _ = writeln!(out, "{}", line);

        if !repeated {
            let child_prefix = format!("{}{}", prefix, if last { SPACE } else { PIPE });
            render_children(graph, &edge.to, &child_prefix, expanded, out);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tangle_core::types::PackageIdentity;
    use tangle_resolver::GraphBuilder;

    fn package(id: &str, version: &str) -> Node {
        Node::package(PackageIdentity::parse(id, version).unwrap())
    }

    #[test]
    fn test_render_shared_dependency() {
        let root = package("App.Root", "1.0.0");
        let left = package("Left", "1.0.0");
        let right = package("Right", "2.0.0");
        let shared = package("Shared", "3.0.0");
        let dll = Node::assembly("Shared.dll");

        let mut builder = GraphBuilder::new(root.clone());
        for node in [&left, &right, &shared, &dll] {
            builder.with_node(node.clone());
        }
        builder.with_edge(&root.key(), &left.key(), Some("[1.0.0, )".to_string())).unwrap();
        builder.with_edge(&root.key(), &right.key(), Some("[2.0.0, )".to_string())).unwrap();
        builder.with_edge(&left.key(), &shared.key(), Some("[3.0.0, )".to_string())).unwrap();
        builder.with_edge(&right.key(), &shared.key(), Some("[3.0.0, )".to_string())).unwrap();
        builder.with_edge(&shared.key(), &dll.key(), None).unwrap();

        let expected = "\
App.Root 1.0.0
├── Left 1.0.0 [1.0.0, )
│   └── Shared 3.0.0 [3.0.0, )
│       └── Shared.dll
└── Right 2.0.0 [2.0.0, )
    └── Shared 3.0.0 [3.0.0, ) (*)
";
        assert_eq!(render_tree(&builder.build()), expected);
    }

    #[test]
    fn test_render_lone_root() {
        let root = package("Alone", "0.1.0");
        let graph = GraphBuilder::new(root).build();
        assert_eq!(render_tree(&graph), "Alone 0.1.0\n");
    }

    #[test]
    fn test_repeated_leaf_is_not_marked() {
        let root = Node::project("/src/App/App.csproj");
        let leaf = package("Leaf", "1.0.0");
        let middle = package("Middle", "1.0.0");

        let mut builder = GraphBuilder::new(root.clone());
        builder.with_node(leaf.clone());
        builder.with_node(middle.clone());
        builder.with_edge(&root.key(), &middle.key(), None).unwrap();
        builder.with_edge(&middle.key(), &leaf.key(), None).unwrap();
        builder.with_edge(&root.key(), &leaf.key(), None).unwrap();

        let rendered = render_tree(&builder.build());
        assert!(rendered.starts_with("App.csproj\n"));
        assert!(rendered.ends_with("└── Leaf 1.0.0\n"));
        assert!(!rendered.contains("(*)"));
    }
}
