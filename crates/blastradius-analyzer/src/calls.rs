//! `impact_call_counts` (§4.G): how many call sites touch a node, with
//! class nodes aggregating the counts of their FUNC children.

use std::collections::HashMap;

use blastradius_core::{EdgeKind, NodeKind};
use blastradius_graph::Graph;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CallCounts {
    pub incoming: usize,
    pub outgoing: usize,
    pub callers: HashMap<String, usize>,
    pub callees: HashMap<String, usize>,
}

fn call_counts_for_node(graph: &Graph, id: &str) -> CallCounts {
    let mut counts = CallCounts::default();
    for edge in graph.get_edges_to(id) {
        if edge.kind != EdgeKind::Call {
            continue;
        }
        counts.incoming += 1;
        *counts.callers.entry(edge.from_id.clone()).or_insert(0) += 1;
    }
    for edge in graph.get_edges_from(id) {
        if edge.kind != EdgeKind::Call {
            continue;
        }
        counts.outgoing += 1;
        *counts.callees.entry(edge.to_id.clone()).or_insert(0) += 1;
    }
    counts
}

/// Aggregate call-edge counts touching `id`. A CLASS node reports the sum
/// of its FUNC children's counts since classes carry no calls directly.
pub fn impact_call_counts(graph: &Graph, id: &str) -> Option<CallCounts> {
    let node = graph.get_node(id)?;

    if node.kind != NodeKind::Class {
        return Some(call_counts_for_node(graph, id));
    }

    let mut total = CallCounts::default();
    for child in graph.get_children(id) {
        if child.kind != NodeKind::Func {
            continue;
        }
        let child_counts = call_counts_for_node(graph, &child.id);
        total.incoming += child_counts.incoming;
        total.outgoing += child_counts.outgoing;
        for (caller, n) in child_counts.callers {
            *total.callers.entry(caller).or_insert(0) += n;
        }
        for (callee, n) in child_counts.callees {
            *total.callees.entry(callee).or_insert(0) += n;
        }
    }
    Some(total)
}

#[cfg(test)]
mod tests {
    use super::*;
    use blastradius_core::{Edge, Node};

    fn func(id: &str) -> Node {
        Node {
            id: id.to_string(),
            kind: NodeKind::Func,
            label: id.to_string(),
            fs_path: "a.py".to_string(),
            snippet: None,
            start_line: None,
            start_char: None,
            end_line: None,
            end_char: None,
        }
    }

    fn class(id: &str) -> Node {
        Node {
            id: id.to_string(),
            kind: NodeKind::Class,
            label: id.to_string(),
            fs_path: "a.py".to_string(),
            snippet: None,
            start_line: None,
            start_char: None,
            end_line: None,
            end_char: None,
        }
    }

    #[test]
    fn func_node_counts_direct_call_edges() {
        let mut g = Graph::new();
        g.add_node(func("fn_a"));
        g.add_node(func("fn_b"));
        g.add_edge(Edge::new("fn_a", "fn_b", EdgeKind::Call));
        g.rebuild_indexes();

        let counts = impact_call_counts(&g, "fn_b").unwrap();
        assert_eq!(counts.incoming, 1);
        assert_eq!(counts.outgoing, 0);
    }

    #[test]
    fn class_node_aggregates_method_counts() {
        let mut g = Graph::new();
        g.add_node(class("cls_x"));
        g.add_node(func("cls_x.m1"));
        g.add_node(func("cls_x.m2"));
        g.add_node(func("fn_caller"));
        g.add_edge(Edge::new("cls_x", "cls_x.m1", EdgeKind::Contains));
        g.add_edge(Edge::new("cls_x", "cls_x.m2", EdgeKind::Contains));
        g.add_edge(Edge::new("fn_caller", "cls_x.m1", EdgeKind::Call));
        g.add_edge(Edge::new("fn_caller", "cls_x.m2", EdgeKind::Call));
        g.rebuild_indexes();

        let counts = impact_call_counts(&g, "cls_x").unwrap();
        assert_eq!(counts.incoming, 2);
    }
}
