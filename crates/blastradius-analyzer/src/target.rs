//! `find_target` (§4.G): resolve a free-text query to a single node.
//!
//! Resolution order: exact id, exact label, case-insensitive substring on
//! label. Ties among candidates are broken by degree, then kind priority,
//! child count, "is not a header file", and finally label, so that e.g. a
//! `.cpp` definition of `foo` wins over a `.h` declaration sharing the name
//! (§8 scenario 3).

use blastradius_core::{Node, NodeKind};
use blastradius_graph::Graph;

const HEADER_EXTENSIONS: &[&str] = &["h", "hpp", "hh", "hxx"];

fn is_header(node: &Node) -> bool {
    std::path::Path::new(&node.fs_path)
        .extension()
        .and_then(|e| e.to_str())
        .map(|ext| HEADER_EXTENSIONS.contains(&ext))
        .unwrap_or(false)
}

fn kind_priority(kind: NodeKind) -> u8 {
    match kind {
        NodeKind::Func => 2,
        NodeKind::Class => 1,
        NodeKind::Module => 0,
    }
}

fn degree(graph: &Graph, id: &str) -> usize {
    graph.get_edges_from(id).len() + graph.get_edges_to(id).len()
}

/// Pick the best candidate among nodes tied on the same resolution step.
fn pick_best<'a>(graph: &Graph, candidates: Vec<&'a Node>) -> Option<&'a Node> {
    candidates.into_iter().max_by(|a, b| {
        degree(graph, &a.id)
            .cmp(&degree(graph, &b.id))
            .then_with(|| kind_priority(a.kind).cmp(&kind_priority(b.kind)))
            .then_with(|| graph.get_children_ids(&a.id).len().cmp(&graph.get_children_ids(&b.id).len()))
            .then_with(|| is_header(b).cmp(&is_header(a))) // non-header (false) sorts greater
            .then_with(|| b.label.cmp(&a.label)) // lexicographically smaller label wins ties
    })
}

/// Resolve `query` to the single best-matching node, or `None` if nothing
/// matches at any resolution step.
pub fn find_target<'a>(graph: &'a Graph, query: &str) -> Option<&'a Node> {
    if let Some(node) = graph.get_node(query) {
        return Some(node);
    }

    let exact_label: Vec<&Node> = graph.nodes.iter().filter(|n| n.label == query).collect();
    if !exact_label.is_empty() {
        return pick_best(graph, exact_label);
    }

    let query_lower = query.to_lowercase();
    let substring: Vec<&Node> = graph
        .nodes
        .iter()
        .filter(|n| n.label.to_lowercase().contains(&query_lower))
        .collect();
    if !substring.is_empty() {
        return pick_best(graph, substring);
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use blastradius_core::{Edge, EdgeKind};

    fn node(id: &str, label: &str, kind: NodeKind, fs_path: &str) -> Node {
        Node {
            id: id.to_string(),
            kind,
            label: label.to_string(),
            fs_path: fs_path.to_string(),
            snippet: None,
            start_line: None,
            start_char: None,
            end_line: None,
            end_char: None,
        }
    }

    #[test]
    fn exact_id_wins_immediately() {
        let mut graph = Graph::new();
        graph.add_node(node("fn_1", "foo", NodeKind::Func, "a.c"));
        let found = find_target(&graph, "fn_1").unwrap();
        assert_eq!(found.id, "fn_1");
    }

    #[test]
    fn cpp_definition_preferred_over_header_declaration() {
        let mut graph = Graph::new();
        graph.add_node(node("fn_header", "foo", NodeKind::Func, "foo.h"));
        graph.add_node(node("fn_impl", "foo", NodeKind::Func, "foo.cpp"));
        graph.add_node(node("fn_caller", "caller", NodeKind::Func, "caller.cpp"));
        graph.add_edge(Edge::new("fn_caller", "fn_impl", EdgeKind::Call));

        let found = find_target(&graph, "foo").unwrap();
        assert_eq!(found.id, "fn_impl");
    }

    #[test]
    fn substring_match_is_case_insensitive() {
        let mut graph = Graph::new();
        graph.add_node(node("fn_1", "computeTotal", NodeKind::Func, "a.ts"));
        let found = find_target(&graph, "total").unwrap();
        assert_eq!(found.id, "fn_1");
    }
}
