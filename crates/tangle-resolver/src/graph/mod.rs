//! Dependency graph model using petgraph
//!
//! Nodes are a tagged variant over packages, projects and assemblies, each
//! identified by a typed `NodeKey`. A `GraphBuilder` is the only mutator; it
//! is consumed once to produce an immutable `DependencyGraph` that answers
//! structural queries through an internal petgraph index.

use std::collections::{HashMap, HashSet, VecDeque};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use petgraph::algo::{tarjan_scc, toposort};
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::{Dfs, EdgeRef};
use petgraph::Direction;
use serde::{Serialize, Serializer};

use tangle_core::error::TangleError;
use tangle_core::types::PackageIdentity;
use tangle_core::utils::normalize_path;

use crate::ResolverResult;

/// Assembly or file name, compared case-insensitively
#[derive(Debug, Clone)]
pub struct AssemblyName {
    display: String,
    folded: String,
}

impl AssemblyName {
    pub fn new(name: impl Into<String>) -> Self {
        let display = name.into();
        let folded = display.to_lowercase();
        Self { display, folded }
    }

    pub fn as_str(&self) -> &str {
        &self.display
    }
}

impl PartialEq for AssemblyName {
    fn eq(&self, other: &Self) -> bool {
        self.folded == other.folded
    }
}

impl Eq for AssemblyName {}

impl Hash for AssemblyName {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.folded.hash(state);
    }
}

impl fmt::Display for AssemblyName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display)
    }
}

impl Serialize for AssemblyName {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.display)
    }
}

/// Typed identity of a node; no two nodes of a graph share one
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "kind", content = "key", rename_all = "lowercase")]
pub enum NodeKey {
    Package(PackageIdentity),
    Project(PathBuf),
    Assembly(AssemblyName),
}

impl fmt::Display for NodeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeKey::Package(identity) => write!(f, "{}", identity),
            NodeKey::Project(path) => write!(f, "{}", path.display()),
            NodeKey::Assembly(name) => write!(f, "{}", name),
        }
    }
}

/// A package at a resolved version
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PackageReferenceNode {
    pub identity: PackageIdentity,
}

/// A project, keyed by its normalized path
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProjectReferenceNode {
    pub path: PathBuf,
}

/// A binary file or framework assembly
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AssemblyReferenceNode {
    pub name: AssemblyName,
}

/// Graph node
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Node {
    Package(PackageReferenceNode),
    Project(ProjectReferenceNode),
    Assembly(AssemblyReferenceNode),
}

impl Node {
    pub fn package(identity: PackageIdentity) -> Self {
        Node::Package(PackageReferenceNode { identity })
    }

    /// Project node; the path is normalized so equivalent spellings collapse
    pub fn project(path: impl AsRef<Path>) -> Self {
        Node::Project(ProjectReferenceNode {
            path: normalize_path(path.as_ref()),
        })
    }

    pub fn assembly(name: impl Into<String>) -> Self {
        Node::Assembly(AssemblyReferenceNode {
            name: AssemblyName::new(name),
        })
    }

    pub fn key(&self) -> NodeKey {
        match self {
            Node::Package(node) => NodeKey::Package(node.identity.clone()),
            Node::Project(node) => NodeKey::Project(node.path.clone()),
            Node::Assembly(node) => NodeKey::Assembly(node.name.clone()),
        }
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Node::Package(node) => write!(f, "{} {}", node.identity.id, node.identity.version),
            Node::Project(node) => {
                let name = node
                    .path
                    .file_name()
                    .map(|name| name.to_string_lossy().into_owned())
                    .unwrap_or_else(|| node.path.display().to_string());
                f.write_str(&name)
            },
            Node::Assembly(node) => write!(f, "{}", node.name),
        }
    }
}

/// Directed relationship between two nodes
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Edge {
    pub from: NodeKey,
    pub to: NodeKey,
    /// Declared version range for package dependencies, absent for assemblies
    pub label: Option<String>,
}

/// Accumulates nodes and edges; consumed once by `build`
#[derive(Debug)]
pub struct GraphBuilder {
    root: NodeKey,
    nodes: IndexMap<NodeKey, Node>,
    edges: Vec<Edge>,
    edge_pairs: HashSet<(NodeKey, NodeKey)>,
}

impl GraphBuilder {
    /// Start a graph whose root is `root`
    pub fn new(root: Node) -> Self {
        let key = root.key();
        let mut nodes = IndexMap::new();
        nodes.insert(key.clone(), root);
        Self {
            root: key,
            nodes,
            edges: Vec::new(),
            edge_pairs: HashSet::new(),
        }
    }

    /// Add a node; a node whose key is already present is ignored
    pub fn with_node(&mut self, node: Node) -> &mut Self {
        self.nodes.entry(node.key()).or_insert(node);
        self
    }

    /// Add an edge between two registered nodes
    ///
    /// Repeating a `(from, to)` pair is a no-op and the first label wins.
    pub fn with_edge(&mut self, from: &NodeKey, to: &NodeKey, label: Option<String>) -> ResolverResult<()> {
        if !self.nodes.contains_key(from) || !self.nodes.contains_key(to) {
            return Err(TangleError::DanglingEdge {
                from: from.to_string(),
                to: to.to_string(),
            });
        }
        if self.edge_pairs.insert((from.clone(), to.clone())) {
            self.edges.push(Edge {
                from: from.clone(),
                to: to.clone(),
                label,
            });
        }
        Ok(())
    }

    pub fn contains(&self, key: &NodeKey) -> bool {
        self.nodes.contains_key(key)
    }

    /// Freeze into an immutable graph
    pub fn build(self) -> DependencyGraph {
        let mut graph = DiGraph::with_capacity(self.nodes.len(), self.edges.len());
        let mut indices = HashMap::with_capacity(self.nodes.len());
        for key in self.nodes.keys() {
            indices.insert(key.clone(), graph.add_node(key.clone()));
        }
        for (position, edge) in self.edges.iter().enumerate() {
            // both endpoints were checked in with_edge
            if let (Some(&from), Some(&to)) = (indices.get(&edge.from), indices.get(&edge.to)) {
                graph.add_edge(from, to, position);
            }
        }

        DependencyGraph {
            root: self.root,
            nodes: self.nodes,
            edges: self.edges,
            graph,
            indices,
        }
    }
}

/// Immutable dependency graph
#[derive(Debug, Clone)]
pub struct DependencyGraph {
    root: NodeKey,
    nodes: IndexMap<NodeKey, Node>,
    edges: Vec<Edge>,
    /// Structural index; edge weights are positions in `edges`
    graph: DiGraph<NodeKey, usize>,
    indices: HashMap<NodeKey, NodeIndex>,
}

impl DependencyGraph {
    pub fn root_key(&self) -> &NodeKey {
        &self.root
    }

    pub fn root(&self) -> &Node {
        &self.nodes[&self.root]
    }

    /// Nodes in insertion order
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    /// Edges in insertion order
    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn node(&self, key: &NodeKey) -> Option<&Node> {
        self.nodes.get(key)
    }

    pub fn contains(&self, key: &NodeKey) -> bool {
        self.nodes.contains_key(key)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Outgoing edges of a node, in insertion order
    pub fn edges_from(&self, key: &NodeKey) -> Vec<&Edge> {
        self.incident_edges(key, Direction::Outgoing)
    }

    /// Direct dependencies of a node, in edge order
    pub fn dependencies_of(&self, key: &NodeKey) -> Vec<&Node> {
        self.incident_edges(key, Direction::Outgoing)
            .into_iter()
            .filter_map(|edge| self.nodes.get(&edge.to))
            .collect()
    }

    /// Nodes with an edge into `key`, in edge order
    pub fn dependents_of(&self, key: &NodeKey) -> Vec<&Node> {
        self.incident_edges(key, Direction::Incoming)
            .into_iter()
            .filter_map(|edge| self.nodes.get(&edge.from))
            .collect()
    }

    /// Every node reachable from `key`, excluding `key` itself
    pub fn reachable_from(&self, key: &NodeKey) -> Vec<&Node> {
        let Some(&start) = self.indices.get(key) else {
            return Vec::new();
        };
        let mut reachable = Vec::new();
        let mut dfs = Dfs::new(&self.graph, start);
        while let Some(index) = dfs.next(&self.graph) {
            if index != start {
                reachable.push(&self.nodes[&self.graph[index]]);
            }
        }
        reachable
    }

    /// Nodes ordered so that every node precedes its dependencies
    pub fn topological_order(&self) -> ResolverResult<Vec<&Node>> {
        match toposort(&self.graph, None) {
            Ok(sorted) => Ok(sorted
                .into_iter()
                .map(|index| &self.nodes[&self.graph[index]])
                .collect()),
            Err(cycle) => Err(TangleError::CircularDependency {
                cycle: self.describe_cycle(cycle.node_id()),
            }),
        }
    }

    fn incident_edges(&self, key: &NodeKey, direction: Direction) -> Vec<&Edge> {
        let Some(&index) = self.indices.get(key) else {
            return Vec::new();
        };
        let mut positions: Vec<usize> = self
            .graph
            .edges_directed(index, direction)
            .map(|edge| *edge.weight())
            .collect();
        positions.sort_unstable();
        positions.into_iter().map(|position| &self.edges[position]).collect()
    }

    /// Format a cycle through `start` as "a -> b -> a"
    fn describe_cycle(&self, start: NodeIndex) -> String {
        let component: HashSet<NodeIndex> = tarjan_scc(&self.graph)
            .into_iter()
            .find(|component| component.contains(&start))
            .map(|component| component.into_iter().collect())
            .unwrap_or_default();

        // Shortest path back to start inside the strongly connected component
        let mut parents: HashMap<NodeIndex, NodeIndex> = HashMap::new();
        let mut queue = VecDeque::from([start]);
        let mut closing = None;
        while let Some(current) = queue.pop_front() {
            for next in self.graph.neighbors(current) {
                if next == start {
                    closing = Some(current);
                    break;
                }
                if component.contains(&next) && !parents.contains_key(&next) {
                    parents.insert(next, current);
                    queue.push_back(next);
                }
            }
            if closing.is_some() {
                break;
            }
        }

        let mut path = vec![start];
        if let Some(mut current) = closing {
            let mut tail = Vec::new();
            while current != start {
                tail.push(current);
                match parents.get(&current) {
                    Some(&parent) => current = parent,
                    None => break,
                }
            }
            path.extend(tail.into_iter().rev());
        }
        path.push(start);

        path.iter()
            .map(|index| self.graph[*index].to_string())
            .collect::<Vec<_>>()
            .join(" -> ")
    }
}

impl Serialize for DependencyGraph {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        #[derive(Serialize)]
        struct GraphView<'a> {
            root: &'a NodeKey,
            nodes: Vec<&'a Node>,
            edges: &'a [Edge],
        }

        GraphView {
            root: &self.root,
            nodes: self.nodes.values().collect(),
            edges: &self.edges,
        }
        .serialize(serializer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn package(id: &str, version: &str) -> Node {
        Node::package(PackageIdentity::parse(id, version).unwrap())
    }

    #[test]
    fn test_builder_creation() {
        let graph = GraphBuilder::new(package("App", "1.0.0")).build();
        assert_eq!(graph.node_count(), 1);
        assert_eq!(graph.edge_count(), 0);
        assert_eq!(graph.root(), &package("app", "1.0"));
    }

    #[test]
    fn test_duplicate_node_is_noop() {
        let mut builder = GraphBuilder::new(package("App", "1.0.0"));
        builder
            .with_node(package("Serilog", "2.10.0"))
            .with_node(package("SERILOG", "2.10.0"))
            .with_node(Node::assembly("Serilog.dll"))
            .with_node(Node::assembly("serilog.DLL"));

        let graph = builder.build();
        assert_eq!(graph.node_count(), 3);
        // first insertion keeps its casing
        let serilog = graph.node(&package("serilog", "2.10.0").key()).unwrap();
        assert_eq!(serilog.to_string(), "Serilog 2.10.0");
    }

    #[test]
    fn test_distinct_versions_are_distinct_nodes() {
        let mut builder = GraphBuilder::new(package("App", "1.0.0"));
        builder.with_node(package("B", "1.0.0")).with_node(package("B", "1.1.0"));
        assert_eq!(builder.build().node_count(), 3);
    }

    #[test]
    fn test_project_paths_are_normalized() {
        let mut builder = GraphBuilder::new(Node::project("/src/app/App.csproj"));
        builder.with_node(Node::project("/src/app/../app/./App.csproj"));
        let graph = builder.build();
        assert_eq!(graph.node_count(), 1);
        assert_eq!(graph.root().to_string(), "App.csproj");
    }

    #[test]
    fn test_dangling_edge() {
        let mut builder = GraphBuilder::new(package("App", "1.0.0"));
        let app = package("App", "1.0.0").key();
        let missing = package("Missing", "1.0.0").key();

        let result = builder.with_edge(&app, &missing, None);
        assert!(matches!(result, Err(TangleError::DanglingEdge { .. })));
    }

    #[test]
    fn test_repeated_edge_keeps_first_label() {
        let mut builder = GraphBuilder::new(package("App", "1.0.0"));
        builder.with_node(package("B", "1.1.0"));
        let app = package("App", "1.0.0").key();
        let b = package("B", "1.1.0").key();

        builder.with_edge(&app, &b, Some("[1.0.0, )".to_string())).unwrap();
        builder.with_edge(&app, &b, Some("[1.1.0, )".to_string())).unwrap();

        let graph = builder.build();
        assert_eq!(graph.edge_count(), 1);
        assert_eq!(graph.edges()[0].label.as_deref(), Some("[1.0.0, )"));
    }

    #[test]
    fn test_queries() {
        let mut builder = GraphBuilder::new(package("A", "1.0.0"));
        builder
            .with_node(package("B", "1.0.0"))
            .with_node(package("C", "1.0.0"))
            .with_node(Node::assembly("C.dll"));
        let a = package("A", "1.0.0").key();
        let b = package("B", "1.0.0").key();
        let c = package("C", "1.0.0").key();
        let dll = Node::assembly("C.dll").key();

        builder.with_edge(&a, &c, Some("1.0.0".to_string())).unwrap();
        builder.with_edge(&a, &b, Some("1.0.0".to_string())).unwrap();
        builder.with_edge(&b, &c, Some("1.0.0".to_string())).unwrap();
        builder.with_edge(&c, &dll, None).unwrap();
        let graph = builder.build();

        let deps: Vec<String> = graph.dependencies_of(&a).iter().map(|n| n.to_string()).collect();
        assert_eq!(deps, vec!["C 1.0.0", "B 1.0.0"]);

        let dependents: Vec<String> = graph.dependents_of(&c).iter().map(|n| n.to_string()).collect();
        assert_eq!(dependents, vec!["A 1.0.0", "B 1.0.0"]);

        assert_eq!(graph.reachable_from(&a).len(), 3);
        assert_eq!(graph.reachable_from(&c).len(), 1);
        assert!(graph.reachable_from(&dll).is_empty());
        assert_eq!(graph.edges_from(&c)[0].label, None);

        let order = graph.topological_order().unwrap();
        let position = |key: &NodeKey| order.iter().position(|node| &node.key() == key).unwrap();
        assert!(position(&a) < position(&b));
        assert!(position(&b) < position(&c));
        assert!(position(&c) < position(&dll));
    }

    #[test]
    fn test_cycle_is_reported() {
        let mut builder = GraphBuilder::new(package("A", "1.0.0"));
        builder.with_node(package("B", "1.0.0")).with_node(package("C", "1.0.0"));
        let a = package("A", "1.0.0").key();
        let b = package("B", "1.0.0").key();
        let c = package("C", "1.0.0").key();
        builder.with_edge(&a, &b, None).unwrap();
        builder.with_edge(&b, &c, None).unwrap();
        builder.with_edge(&c, &b, None).unwrap();
        let graph = builder.build();

        match graph.topological_order() {
            Err(TangleError::CircularDependency { cycle }) => {
                assert!(cycle.contains("B@1.0.0"));
                assert!(cycle.contains("C@1.0.0"));
                assert!(!cycle.contains("A@1.0.0"));
                assert_eq!(cycle.matches("->").count(), 2);
            },
            other => panic!("Expected CircularDependency, got {:?}", other),
        }
    }

    #[test]
    fn test_serialize_graph() {
        let mut builder = GraphBuilder::new(package("A", "1.0.0"));
        builder.with_node(Node::assembly("A.dll"));
        builder
            .with_edge(&package("A", "1.0.0").key(), &Node::assembly("A.dll").key(), None)
            .unwrap();
        let json = serde_json::to_value(builder.build()).unwrap();

        assert_eq!(json["root"]["kind"], "package");
        assert_eq!(json["nodes"][0]["identity"]["id"], "A");
        assert_eq!(json["nodes"][1]["kind"], "assembly");
        assert_eq!(json["nodes"][1]["name"], "A.dll");
        assert_eq!(json["edges"][0]["to"]["key"], "A.dll");
        assert!(json["edges"][0]["label"].is_null());
    }
}
