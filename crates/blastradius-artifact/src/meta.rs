//! `compute_graph_meta` (§4.H): the per-digest metadata object bundling the
//! Merkle digest, graph stats, and a pointer to the architecture render.

use std::collections::HashMap;
use std::path::Path;

use blastradius_core::{BlastradiusConfig, GraphStats, Language, NodeKind};
use blastradius_graph::Graph;
use blastradius_parser::ParseSummary;
use serde::{Deserialize, Serialize};

use crate::merkle::{compute_leaf, config_leaf_hash, merkle_root, Leaf};

pub const GRAPH_META_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParserMetaBlock {
    pub use_lsp: bool,
    pub lsp_langs: Vec<String>,
    pub label_strip_prefix: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GraphQuality {
    /// `files_parsed / files_seen`, or `1.0` when no files were seen.
    pub parsed_ratio: f64,
    /// `lsp_files / (lsp_files + tree_sitter_files)`, or `0.0` if neither ran.
    pub lsp_ratio: f64,
}

impl GraphQuality {
    fn from_summary(summary: &ParseSummary) -> Self {
        let parsed_ratio = if summary.files_seen == 0 {
            1.0
        } else {
            summary.files_parsed as f64 / summary.files_seen as f64
        };
        let backend_total = summary.lsp_files + summary.tree_sitter_files;
        let lsp_ratio = if backend_total == 0 {
            0.0
        } else {
            summary.lsp_files as f64 / backend_total as f64
        };
        Self { parsed_ratio, lsp_ratio }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphMetaBlock {
    pub digest: String,
    pub stats: GraphStats,
    pub parse_summary: ParseSummary,
    pub quality: GraphQuality,
    pub symbol_files: HashMap<String, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MerkleBlock {
    pub leaves: Vec<Leaf>,
    pub root: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArchitectureBlock {
    pub png_path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphMeta {
    pub version: u32,
    pub parser: ParserMetaBlock,
    pub merkle: MerkleBlock,
    pub graph: GraphMetaBlock,
    pub architecture: ArchitectureBlock,
}

impl GraphMeta {
    pub fn digest(&self) -> &str {
        &self.merkle.root
    }
}

fn canonical_config_json(parser: &ParserMetaBlock) -> String {
    // Field order is fixed by construction, which is sufficient for a
    // deterministic canonical form here (no user-controlled key set).
    serde_json::json!({
        "schema_version": GRAPH_META_VERSION,
        "use_lsp": parser.use_lsp,
        "lsp_langs_sorted": {
            let mut langs = parser.lsp_langs.clone();
            langs.sort();
            langs
        },
        "label_strip_prefix": parser.label_strip_prefix,
    })
    .to_string()
}

fn existing_leaf_for<'a>(existing: Option<&'a GraphMeta>, label: &str) -> Option<&'a Leaf> {
    existing.and_then(|m| m.merkle.leaves.iter().find(|l| l.label == label))
}

/// Build the full graph-meta object for `graph`, reusing stat-matching
/// leaves from `existing_meta` unless `config.merkle_always_rehash`.
pub fn compute_graph_meta(
    graph: &Graph,
    parse_summary: &ParseSummary,
    use_lsp: bool,
    lsp_langs: &[Language],
    label_strip_prefix: Option<&str>,
    architecture_png_path: &str,
    config: &BlastradiusConfig,
    existing_meta: Option<&GraphMeta>,
) -> GraphMeta {
    let parser = ParserMetaBlock {
        use_lsp,
        lsp_langs: lsp_langs.iter().map(|l| l.key().to_string()).collect(),
        label_strip_prefix: label_strip_prefix.map(str::to_string),
    };

    let leaves: Vec<Leaf> = graph
        .nodes
        .iter()
        .filter(|n| n.kind == NodeKind::Module)
        .map(|n| {
            let existing = existing_leaf_for(existing_meta, &n.label);
            compute_leaf(&n.label, &n.fs_path, existing, config.merkle_always_rehash)
        })
        .collect();

    let config_hash = config_leaf_hash(&canonical_config_json(&parser));
    let root = merkle_root(&leaves, &config_hash);

    let symbol_files: HashMap<String, String> = graph
        .nodes
        .iter()
        .map(|n| (n.id.clone(), n.fs_path.clone()))
        .collect();

    GraphMeta {
        version: GRAPH_META_VERSION,
        parser,
        merkle: MerkleBlock { leaves, root: root.clone() },
        graph: GraphMetaBlock {
            digest: root,
            stats: graph.stats(),
            parse_summary: parse_summary.clone(),
            quality: GraphQuality::from_summary(parse_summary),
            symbol_files,
        },
        architecture: ArchitectureBlock {
            png_path: architecture_png_path.to_string(),
        },
    }
}

pub fn graph_meta_filename(digest: &str) -> String {
    format!("graph_meta.{digest}.json")
}

pub fn architecture_filename(digest: &str) -> String {
    format!("architecture.{digest}.png")
}

pub fn graph_meta_path(canvas_dir: &Path, digest: &str) -> std::path::PathBuf {
    canvas_dir.join(graph_meta_filename(digest))
}

#[cfg(test)]
mod tests {
    use super::*;
    use blastradius_core::Node;
    use std::io::Write;
    use tempfile::TempDir;

    fn graph_with_one_module(path: &Path, label: &str) -> Graph {
        let mut g = Graph::new();
        g.add_node(Node::module(format!("mod_{label}"), label, path.to_str().unwrap()));
        g.rebuild_indexes();
        g
    }

    #[test]
    fn deterministic_digest_across_recompute() {
        let dir = TempDir::new().unwrap();
        let file_path = dir.path().join("a.py");
        std::fs::File::create(&file_path).unwrap().write_all(b"x = 1").unwrap();

        let graph = graph_with_one_module(&file_path, "a.py");
        let summary = ParseSummary::default();
        let config = BlastradiusConfig::default();

        let first = compute_graph_meta(&graph, &summary, false, &[], None, "architecture.png", &config, None);
        let second = compute_graph_meta(&graph, &summary, false, &[], None, "architecture.png", &config, Some(&first));

        assert_eq!(first.digest(), second.digest());
    }

    #[test]
    fn digest_changes_when_file_content_changes() {
        let dir = TempDir::new().unwrap();
        let file_path = dir.path().join("a.py");
        std::fs::write(&file_path, "x = 1").unwrap();

        let graph = graph_with_one_module(&file_path, "a.py");
        let summary = ParseSummary::default();
        let config = BlastradiusConfig::default();
        let first = compute_graph_meta(&graph, &summary, false, &[], None, "architecture.png", &config, None);

        std::fs::write(&file_path, "x = 2").unwrap();
        let second = compute_graph_meta(&graph, &summary, false, &[], None, "architecture.png", &config, Some(&first));

        assert_ne!(first.digest(), second.digest());
    }
}
