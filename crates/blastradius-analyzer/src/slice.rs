//! `compute_slice` and `neighborhood` (§4.G): BFS-based impact slices and
//! bounded k-hop neighborhoods over the code graph.

use std::collections::{HashSet, VecDeque};

use blastradius_core::{EdgeKind, NodeKind};
use blastradius_graph::Graph;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    In,
    Out,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImpactSlice {
    pub nodes: Vec<String>,
    pub edges: Vec<String>,
    pub target: String,
    pub direction: Direction,
}

/// Fold CONTAINS ancestors of every node in `closure` into `closure`/`edges`
/// so display groups correctly (module for a class, class+module for a
/// method) — §4.G "include ancestors".
fn include_ancestors(graph: &Graph, closure: &mut HashSet<String>, edges: &mut HashSet<String>) {
    let seed: Vec<String> = closure.iter().cloned().collect();
    for id in seed {
        let mut current = id;
        while let Some(parent) = graph.get_parent(&current) {
            let is_new = closure.insert(parent.id.clone());
            let contains_edge = blastradius_core::Edge::new(parent.id.clone(), current.clone(), EdgeKind::Contains);
            edges.insert(contains_edge.key());
            if !is_new {
                break;
            }
            current = parent.id.clone();
        }
    }
}

/// Seed the BFS frontier for `start`: the node itself, plus every FUNC
/// child if `start` is a CLASS (classes carry no calls of their own).
fn seed_frontier(graph: &Graph, start: &str) -> Vec<String> {
    let mut frontier = vec![start.to_string()];
    if let Some(node) = graph.get_node(start) {
        if node.kind == NodeKind::Class {
            for child in graph.get_children(start) {
                if child.kind == NodeKind::Func {
                    frontier.push(child.id.clone());
                }
            }
        }
    }
    frontier
}

fn wanted_kind(kind: EdgeKind, include_imports: bool, include_calls: bool) -> bool {
    match kind {
        EdgeKind::Import => include_imports,
        EdgeKind::Call => include_calls,
        EdgeKind::Contains => false,
    }
}

/// Compute the forward/reverse impact slice reachable from `start`.
pub fn compute_slice(
    graph: &Graph,
    start: &str,
    direction: Direction,
    include_imports: bool,
    include_calls: bool,
) -> ImpactSlice {
    let seeds = seed_frontier(graph, start);
    let mut visited: HashSet<String> = seeds.iter().cloned().collect();
    let mut edge_keys: HashSet<String> = HashSet::new();
    let mut queue: VecDeque<String> = seeds.into_iter().collect();

    while let Some(current) = queue.pop_front() {
        let edges = match direction {
            Direction::Out => graph.get_edges_from(&current),
            Direction::In => graph.get_edges_to(&current),
        };
        for edge in edges {
            if !wanted_kind(edge.kind, include_imports, include_calls) {
                continue;
            }
            edge_keys.insert(edge.key());
            let next = match direction {
                Direction::Out => &edge.to_id,
                Direction::In => &edge.from_id,
            };
            if visited.insert(next.clone()) {
                queue.push_back(next.clone());
            }
        }
    }

    include_ancestors(graph, &mut visited, &mut edge_keys);

    ImpactSlice {
        nodes: visited.into_iter().collect(),
        edges: edge_keys.into_iter().collect(),
        target: start.to_string(),
        direction,
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Neighborhood {
    pub nodes: Vec<String>,
    pub edges: Vec<String>,
}

/// Bidirectional BFS up to `hops` hops around `id`, ancestors folded in
/// before the `max_nodes` cap is applied; the center node is always kept.
pub fn neighborhood(graph: &Graph, id: &str, hops: usize, max_nodes: usize) -> Neighborhood {
    let mut visited: HashSet<String> = HashSet::new();
    visited.insert(id.to_string());
    let mut frontier = vec![id.to_string()];

    for _ in 0..hops {
        let mut next_frontier = Vec::new();
        for current in &frontier {
            for edge in graph.get_edges_from(current).into_iter().chain(graph.get_edges_to(current)) {
                let (a, b) = (&edge.from_id, &edge.to_id);
                let other = if a == current { b } else { a };
                if visited.insert(other.clone()) {
                    next_frontier.push(other.clone());
                }
            }
        }
        if next_frontier.is_empty() {
            break;
        }
        frontier = next_frontier;
    }

    include_ancestors(graph, &mut visited, &mut HashSet::new());

    let mut ordered: Vec<String> = vec![id.to_string()];
    for n in &visited {
        if n != id {
            ordered.push(n.clone());
        }
    }
    ordered.truncate(max_nodes);
    let kept: HashSet<String> = ordered.iter().cloned().collect();

    let mut edges = HashSet::new();
    for n in &kept {
        for edge in graph.get_edges_from(n) {
            if kept.contains(&edge.to_id) {
                edges.insert(edge.key());
            }
        }
    }

    Neighborhood {
        nodes: ordered,
        edges: edges.into_iter().collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use blastradius_core::{Edge, Node};

    fn module(id: &str) -> Node {
        Node::module(id, id, format!("{id}.py"))
    }

    fn func(id: &str, fs_path: &str) -> Node {
        Node {
            id: id.to_string(),
            kind: NodeKind::Func,
            label: id.to_string(),
            fs_path: fs_path.to_string(),
            snippet: None,
            start_line: Some(0),
            start_char: Some(0),
            end_line: Some(1),
            end_char: Some(0),
        }
    }

    fn sample_graph() -> Graph {
        let mut g = Graph::new();
        g.add_node(module("mod_a"));
        g.add_node(func("fn_a", "a.py"));
        g.add_node(func("fn_b", "a.py"));
        g.add_edge(Edge::new("mod_a", "fn_a", EdgeKind::Contains));
        g.add_edge(Edge::new("mod_a", "fn_b", EdgeKind::Contains));
        g.add_edge(Edge::new("fn_a", "fn_b", EdgeKind::Call));
        g.rebuild_indexes();
        g
    }

    #[test]
    fn neighborhood_zero_hops_returns_self_plus_ancestors() {
        let g = sample_graph();
        let n = neighborhood(&g, "fn_a", 0, 20);
        let set: HashSet<_> = n.nodes.into_iter().collect();
        assert_eq!(set, HashSet::from(["fn_a".to_string(), "mod_a".to_string()]));
    }

    #[test]
    fn compute_slice_out_follows_call_edges() {
        let g = sample_graph();
        let slice = compute_slice(&g, "fn_a", Direction::Out, false, true);
        assert!(slice.nodes.contains(&"fn_b".to_string()));
        assert!(slice.nodes.contains(&"mod_a".to_string()));
    }

    #[test]
    fn compute_slice_respects_edge_kind_filters() {
        let g = sample_graph();
        let slice = compute_slice(&g, "fn_a", Direction::Out, false, false);
        assert!(!slice.nodes.contains(&"fn_b".to_string()));
    }
}
