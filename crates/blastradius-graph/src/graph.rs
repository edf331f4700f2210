//! In-memory code graph with O(1) node/edge lookups, crabviz-style.

use std::collections::{HashMap, HashSet};

use blastradius_core::{Edge, EdgeKind, GraphStats, Node, NodeKind};
use serde::{Deserialize, Serialize};

/// Complete code graph: nodes, edges, and the bidirectional indexes built
/// over them.
///
/// Indexes are rebuilt wholesale by [`Graph::rebuild_indexes`] (used after
/// bulk deserialization) or maintained incrementally by
/// [`Graph::add_node`]/[`Graph::add_edge`]. The two paths must stay in sync;
/// `rebuild_indexes` is the source of truth and is exercised by the tests
/// that round-trip a graph through the incremental path.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Graph {
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,

    #[serde(skip)]
    node_map: HashMap<String, usize>,
    #[serde(skip)]
    edges_from: HashMap<String, Vec<usize>>,
    #[serde(skip)]
    edges_to: HashMap<String, Vec<usize>>,
    #[serde(skip)]
    edge_keys: HashSet<String>,
    #[serde(skip)]
    contains_children: HashMap<String, Vec<String>>,
    #[serde(skip)]
    contains_parent: HashMap<String, String>,
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild all indexes from `nodes`/`edges`. Required after
    /// deserializing a graph (the indexes are not serialized) or after any
    /// bulk mutation of the `nodes`/`edges` vectors directly.
    pub fn rebuild_indexes(&mut self) {
        self.node_map = self
            .nodes
            .iter()
            .enumerate()
            .map(|(i, n)| (n.id.clone(), i))
            .collect();
        self.edges_from.clear();
        self.edges_to.clear();
        self.edge_keys.clear();
        self.contains_children.clear();
        self.contains_parent.clear();

        for (i, e) in self.edges.iter().enumerate() {
            self.edges_from.entry(e.from_id.clone()).or_default().push(i);
            self.edges_to.entry(e.to_id.clone()).or_default().push(i);
            self.edge_keys.insert(e.key());

            if e.kind == EdgeKind::Contains {
                match self.contains_parent.get(&e.to_id) {
                    None => {
                        self.contains_parent.insert(e.to_id.clone(), e.from_id.clone());
                        self.contains_children
                            .entry(e.from_id.clone())
                            .or_default()
                            .push(e.to_id.clone());
                    }
                    Some(existing) if existing == &e.from_id => {
                        self.contains_children
                            .entry(e.from_id.clone())
                            .or_default()
                            .push(e.to_id.clone());
                    }
                    // Some parsers (notably tree-sitter on generated code) can
                    // emit ambiguous containment; keep the first parent seen
                    // and drop later conflicting ones rather than erroring.
                    Some(_) => continue,
                }
            }
        }
    }

    pub fn get_node(&self, node_id: &str) -> Option<&Node> {
        self.node_map.get(node_id).map(|&i| &self.nodes[i])
    }

    pub fn get_edges_from(&self, node_id: &str) -> Vec<&Edge> {
        self.edges_from
            .get(node_id)
            .map(|idxs| idxs.iter().map(|&i| &self.edges[i]).collect())
            .unwrap_or_default()
    }

    pub fn get_edges_to(&self, node_id: &str) -> Vec<&Edge> {
        self.edges_to
            .get(node_id)
            .map(|idxs| idxs.iter().map(|&i| &self.edges[i]).collect())
            .unwrap_or_default()
    }

    /// Add `node` if its ID is not already present. Returns `true` if added.
    pub fn add_node(&mut self, node: Node) -> bool {
        if self.node_map.contains_key(&node.id) {
            return false;
        }
        let idx = self.nodes.len();
        self.node_map.insert(node.id.clone(), idx);
        self.nodes.push(node);
        true
    }

    /// Add `edge` if it is not a duplicate of an existing edge (by `key()`).
    /// Returns `true` if added.
    pub fn add_edge(&mut self, edge: Edge) -> bool {
        let key = edge.key();
        if self.edge_keys.contains(&key) {
            return false;
        }

        if edge.kind == EdgeKind::Contains {
            if let Some(existing) = self.contains_parent.get(&edge.to_id) {
                if existing != &edge.from_id {
                    return false;
                }
            }
        }

        let idx = self.edges.len();
        self.edge_keys.insert(key);
        self.edges_from.entry(edge.from_id.clone()).or_default().push(idx);
        self.edges_to.entry(edge.to_id.clone()).or_default().push(idx);

        if edge.kind == EdgeKind::Contains {
            self.contains_parent
                .entry(edge.to_id.clone())
                .or_insert_with(|| edge.from_id.clone());
            self.contains_children
                .entry(edge.from_id.clone())
                .or_default()
                .push(edge.to_id.clone());
        }

        self.edges.push(edge);
        true
    }

    pub fn get_parent_id(&self, node_id: &str) -> Option<&str> {
        self.contains_parent.get(node_id).map(|s| s.as_str())
    }

    pub fn get_parent(&self, node_id: &str) -> Option<&Node> {
        self.get_parent_id(node_id).and_then(|pid| self.get_node(pid))
    }

    pub fn get_children_ids(&self, parent_id: &str) -> Vec<String> {
        self.contains_children.get(parent_id).cloned().unwrap_or_default()
    }

    pub fn get_children(&self, parent_id: &str) -> Vec<&Node> {
        self.get_children_ids(parent_id)
            .iter()
            .filter_map(|cid| self.get_node(cid))
            .collect()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn stats(&self) -> GraphStats {
        let mut s = GraphStats::default();
        for n in &self.nodes {
            match n.kind {
                NodeKind::Module => s.modules += 1,
                NodeKind::Class => s.classes += 1,
                NodeKind::Func => s.funcs += 1,
            }
        }
        for e in &self.edges {
            match e.kind {
                EdgeKind::Import => s.import_edges += 1,
                EdgeKind::Call => s.call_edges += 1,
                EdgeKind::Contains => s.contains_edges += 1,
            }
        }
        s
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn module(id: &str) -> Node {
        Node::module(id, id, format!("{id}.py"))
    }

    #[test]
    fn add_node_rejects_duplicates() {
        let mut g = Graph::new();
        assert!(g.add_node(module("mod_a")));
        assert!(!g.add_node(module("mod_a")));
        assert_eq!(g.node_count(), 1);
    }

    #[test]
    fn add_edge_dedups_by_key() {
        let mut g = Graph::new();
        g.add_node(module("mod_a"));
        g.add_node(module("mod_b"));
        assert!(g.add_edge(Edge::new("mod_a", "mod_b", EdgeKind::Import)));
        assert!(!g.add_edge(Edge::new("mod_a", "mod_b", EdgeKind::Import)));
        assert_eq!(g.edge_count(), 1);
    }

    #[test]
    fn contains_enforces_single_parent() {
        let mut g = Graph::new();
        g.add_node(module("mod_a"));
        g.add_node(module("mod_b"));
        g.add_node(module("cls_x"));
        assert!(g.add_edge(Edge::new("mod_a", "cls_x", EdgeKind::Contains)));
        // Conflicting second parent is rejected.
        assert!(!g.add_edge(Edge::new("mod_b", "cls_x", EdgeKind::Contains)));
        assert_eq!(g.get_parent_id("cls_x"), Some("mod_a"));
        assert_eq!(g.get_children_ids("mod_a"), vec!["cls_x".to_string()]);
    }

    #[test]
    fn rebuild_indexes_matches_incremental() {
        let mut g = Graph::new();
        g.add_node(module("mod_a"));
        g.add_node(module("cls_x"));
        g.add_edge(Edge::new("mod_a", "cls_x", EdgeKind::Contains));

        let mut g2 = Graph {
            nodes: g.nodes.clone(),
            edges: g.edges.clone(),
            ..Graph::default()
        };
        g2.rebuild_indexes();

        assert_eq!(g2.get_parent_id("cls_x"), g.get_parent_id("cls_x"));
        assert_eq!(g2.get_children_ids("mod_a"), g.get_children_ids("mod_a"));
        assert_eq!(g2.stats().contains_edges, g.stats().contains_edges);
    }
}
