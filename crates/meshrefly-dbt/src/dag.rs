//! Dependency graph (DAG) construction and traversal
//!
//! Builds forward and reverse dependency graphs over a manifest or a
//! publication. Imported public models are leaves: their generic
//! `depends_on_*` accessors are empty, so traversal never expands them.

use std::collections::{HashMap, HashSet, VecDeque};

use crate::manifest::Manifest;
use crate::publication::PublicationArtifact;

/// Node identifier (unique_id)
pub type NodeId = String;

/// Dependency graph with forward and reverse edges
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    /// Forward edges: node -> list of nodes it depends on (parents)
    parents: HashMap<NodeId, Vec<NodeId>>,

    /// Reverse edges: node -> list of nodes that depend on it (children)
    children: HashMap<NodeId, Vec<NodeId>>,

    /// All nodes in the graph
    nodes: HashSet<NodeId>,
}

impl DependencyGraph {
    /// Build a dependency graph from a manifest
    pub fn from_manifest(manifest: &Manifest) -> Self {
        let mut graph = Self::default();

        for (node_id, node) in &manifest.nodes {
            let deps = node
                .depends_on
                .nodes
                .iter()
                .chain(node.depends_on.public_nodes.iter());
            graph.add_node(node_id, deps);
        }

        for (node_id, public_node) in &manifest.public_nodes {
            let deps = public_node
                .depends_on_nodes()
                .iter()
                .chain(public_node.depends_on_public_nodes().iter());
            graph.add_node(node_id, deps);
        }

        graph
    }

    /// Build the graph between the public models of one publication
    ///
    /// Dependencies on models outside the publication are kept as nodes.
    pub fn from_publication(publication: &PublicationArtifact) -> Self {
        let mut graph = Self::default();

        for (node_id, model) in &publication.public_models {
            graph.add_node(node_id, model.public_node_dependencies.iter());
        }

        graph
    }

    fn add_node<'a>(&mut self, node_id: &str, deps: impl Iterator<Item = &'a NodeId>) {
        self.nodes.insert(node_id.to_string());

        for dep_id in deps {
            self.nodes.insert(dep_id.clone());

            self.parents
                .entry(node_id.to_string())
                .or_default()
                .push(dep_id.clone());

            // Build reverse edges
            self.children
                .entry(dep_id.clone())
                .or_default()
                .push(node_id.to_string());
        }
    }

    /// Get all nodes in the graph
    pub fn all_nodes(&self) -> Vec<&NodeId> {
        self.nodes.iter().collect()
    }

    /// Get immediate parents (dependencies) of a node
    pub fn parents(&self, node_id: &str) -> Vec<&NodeId> {
        self.parents
            .get(node_id)
            .map(|deps| deps.iter().collect())
            .unwrap_or_default()
    }

    /// Get immediate children (dependents) of a node
    pub fn children(&self, node_id: &str) -> Vec<&NodeId> {
        self.children
            .get(node_id)
            .map(|deps| deps.iter().collect())
            .unwrap_or_default()
    }

    /// Get all downstream nodes (transitive closure of children)
    ///
    /// This is the "blast radius" - all models affected if this node changes.
    pub fn downstream(&self, node_id: &str) -> Vec<NodeId> {
        Self::walk(&self.children, node_id)
    }

    /// Get all upstream nodes (transitive closure of parents)
    pub fn upstream(&self, node_id: &str) -> Vec<NodeId> {
        Self::walk(&self.parents, node_id)
    }

    /// BFS over one edge direction, excluding the start node
    fn walk(edges: &HashMap<NodeId, Vec<NodeId>>, node_id: &str) -> Vec<NodeId> {
        let mut visited = HashSet::new();
        let mut queue = VecDeque::new();
        let mut result = Vec::new();

        if let Some(next) = edges.get(node_id) {
            queue.extend(next.iter().cloned());
        }

        while let Some(current) = queue.pop_front() {
            if current == node_id || !visited.insert(current.clone()) {
                continue;
            }

            if let Some(next) = edges.get(&current) {
                for id in next {
                    if !visited.contains(id) {
                        queue.push_back(id.clone());
                    }
                }
            }

            result.push(current);
        }

        result
    }

    /// Check if there's a path from source to target
    pub fn has_path(&self, source: &str, target: &str) -> bool {
        self.downstream(source).iter().any(|id| id == target)
    }

    /// Get topological sort of all nodes (parents before children)
    ///
    /// Returns `None` if the graph has a cycle.
    pub fn topological_sort(&self) -> Option<Vec<NodeId>> {
        let mut in_degree: HashMap<&NodeId, usize> = self
            .nodes
            .iter()
            .map(|node| (node, self.parents.get(node).map_or(0, Vec::len)))
            .collect();

        // Sorted seeds keep the order stable between runs
        let mut roots: Vec<&NodeId> = in_degree
            .iter()
            .filter(|(_, &degree)| degree == 0)
            .map(|(node, _)| *node)
            .collect();
        roots.sort();

        let mut queue: VecDeque<&NodeId> = roots.into_iter().collect();
        let mut result = Vec::with_capacity(self.nodes.len());

        // Kahn's algorithm
        while let Some(node) = queue.pop_front() {
            result.push(node.clone());

            if let Some(children) = self.children.get(node) {
                for child in children {
                    if let Some(degree) = in_degree.get_mut(child) {
                        *degree -= 1;
                        if *degree == 0 {
                            queue.push_back(child);
                        }
                    }
                }
            }
        }

        if result.len() == self.nodes.len() {
            Some(result)
        } else {
            None
        }
    }
}
