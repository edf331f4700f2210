//! `find_similar_symbols` (§4.G): fuzzy symbol lookup ported from the
//! original `Analyzer.find_similar_symbols` scoring table.

use blastradius_core::NodeKind;
use blastradius_graph::Graph;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimilarSymbol {
    pub id: String,
    pub label: String,
    pub score: i64,
}

fn score(query_lower: &str, label_lower: &str) -> Option<i64> {
    if label_lower == query_lower {
        return Some(100);
    }
    if label_lower.contains(query_lower) {
        return Some(80);
    }
    if label_lower.starts_with(query_lower) {
        return Some(70);
    }
    if query_lower.starts_with(label_lower) {
        return Some(60);
    }

    let overlap = query_lower.chars().filter(|c| label_lower.contains(*c)).count();
    if overlap > query_lower.chars().count() / 2 {
        Some(30 + overlap as i64)
    } else {
        None
    }
}

/// Rank non-MODULE nodes by similarity to `query`, highest score first,
/// ties broken by label, truncated to `limit`.
pub fn find_similar_symbols(graph: &Graph, query: &str, limit: usize) -> Vec<SimilarSymbol> {
    let query_lower = query.to_lowercase();

    let mut matches: Vec<SimilarSymbol> = graph
        .nodes
        .iter()
        .filter(|n| n.kind != NodeKind::Module)
        .filter_map(|n| {
            let label_lower = n.label.to_lowercase();
            score(&query_lower, &label_lower).map(|s| SimilarSymbol {
                id: n.id.clone(),
                label: n.label.clone(),
                score: s,
            })
        })
        .collect();

    matches.sort_by(|a, b| b.score.cmp(&a.score).then_with(|| a.label.cmp(&b.label)));
    matches.truncate(limit);
    matches
}

#[cfg(test)]
mod tests {
    use super::*;
    use blastradius_core::Node;

    fn func(id: &str, label: &str) -> Node {
        Node {
            id: id.to_string(),
            kind: NodeKind::Func,
            label: label.to_string(),
            fs_path: "a.py".to_string(),
            snippet: None,
            start_line: None,
            start_char: None,
            end_line: None,
            end_char: None,
        }
    }

    #[test]
    fn exact_match_outranks_contains() {
        let mut g = Graph::new();
        g.add_node(func("fn_1", "computeTotal"));
        g.add_node(func("fn_2", "total"));
        let results = find_similar_symbols(&g, "total", 10);
        assert_eq!(results[0].id, "fn_2");
        assert_eq!(results[0].score, 100);
    }

    #[test]
    fn module_nodes_are_excluded() {
        let mut g = Graph::new();
        g.add_node(Node::module("mod_total", "total", "total.py"));
        let results = find_similar_symbols(&g, "total", 10);
        assert!(results.is_empty());
    }

    #[test]
    fn overlap_is_character_membership_not_common_prefix() {
        let mut g = Graph::new();
        g.add_node(func("fn_1", "zyx"));
        let results = find_similar_symbols(&g, "xyz", 10);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].score, 33);
    }

    #[test]
    fn limit_truncates_results() {
        let mut g = Graph::new();
        for i in 0..5 {
            g.add_node(func(&format!("fn_{i}"), "totalValue"));
        }
        let results = find_similar_symbols(&g, "total", 2);
        assert_eq!(results.len(), 2);
    }
}
