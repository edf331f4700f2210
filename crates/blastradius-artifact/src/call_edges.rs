//! `call_edges.{digest}.json` cache (§4.H, §6): written per digest,
//! discarded on load if its `graph_digest` no longer matches.

use std::path::{Path, PathBuf};

use blastradius_core::{Edge, Result};
use chrono::Utc;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EdgeRecord {
    pub from_id: String,
    pub to_id: String,
}

impl From<&Edge> for EdgeRecord {
    fn from(e: &Edge) -> Self {
        Self {
            from_id: e.from_id.clone(),
            to_id: e.to_id.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallEdgesStats {
    pub edge_count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallEdgesFile {
    pub version: u32,
    pub project_path: String,
    pub generated_at: String,
    pub generation: u64,
    pub source: String,
    pub instance_id: String,
    pub graph_digest: String,
    pub edges: Vec<EdgeRecord>,
    pub stats: CallEdgesStats,
}

pub fn call_edges_filename(digest: &str) -> String {
    format!("call_edges.{digest}.json")
}

pub fn call_edges_path(canvas_dir: &Path, digest: &str) -> PathBuf {
    canvas_dir.join(call_edges_filename(digest))
}

pub fn build_call_edges_file(
    project_path: &str,
    generation: u64,
    instance_id: &str,
    graph_digest: &str,
    edges: &[Edge],
) -> CallEdgesFile {
    CallEdgesFile {
        version: 1,
        project_path: project_path.to_string(),
        generated_at: Utc::now().to_rfc3339(),
        generation,
        source: "call_graph_builder".to_string(),
        instance_id: instance_id.to_string(),
        graph_digest: graph_digest.to_string(),
        edges: edges.iter().map(EdgeRecord::from).collect(),
        stats: CallEdgesStats { edge_count: edges.len() },
    }
}

pub fn write_call_edges(canvas_dir: &Path, file: &CallEdgesFile) -> Result<()> {
    crate::write::write_json_atomic(&call_edges_path(canvas_dir, &file.graph_digest), file)
}

/// Load `call_edges.{digest}.json`, discarding (returning `None`) if it is
/// missing, unreadable, or its `graph_digest` doesn't match `current_digest`.
pub fn load_call_edges_if_current(canvas_dir: &Path, current_digest: &str) -> Option<CallEdgesFile> {
    let path = call_edges_path(canvas_dir, current_digest);
    let bytes = std::fs::read(path).ok()?;
    let file: CallEdgesFile = serde_json::from_slice(&bytes).ok()?;
    if file.graph_digest != current_digest {
        return None;
    }
    Some(file)
}

#[cfg(test)]
mod tests {
    use super::*;
    use blastradius_core::EdgeKind;
    use tempfile::TempDir;

    #[test]
    fn digest_mismatch_is_discarded() {
        let dir = TempDir::new().unwrap();
        let edges = vec![Edge::new("fn_a", "fn_b", EdgeKind::Call)];
        let file = build_call_edges_file("/repo", 1, "inst-1", "old_digest", &edges);
        write_call_edges(dir.path(), &file).unwrap();

        assert!(load_call_edges_if_current(dir.path(), "new_digest").is_none());
        assert!(load_call_edges_if_current(dir.path(), "old_digest").is_some());
    }
}
