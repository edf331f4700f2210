//! `state.json` glue (§6): authored by an external "scratchpad" layer, read
//! and partially updated here. The core never owns this file's lifecycle —
//! it reads the fields it needs and writes back only `call_graph_summary`.

use std::path::Path;

use blastradius_callgraph::CallGraphBuildResult;
use blastradius_parser::ParseSummary;
use serde::{Deserialize, Serialize};

pub const STATE_SCHEMA_VERSION: u32 = 2;
const STATE_FILENAME: &str = "state.json";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StateFile {
    #[serde(default)]
    pub schema_version: u32,
    #[serde(default)]
    pub project_path: Option<String>,
    #[serde(default)]
    pub use_lsp: Option<bool>,
    #[serde(default)]
    pub parse_summary: Option<ParseSummary>,
    #[serde(default)]
    pub graph_digest: Option<String>,
    #[serde(default)]
    pub call_edges_digest: Option<String>,
    #[serde(default)]
    pub call_graph_summary: Option<CallGraphBuildResult>,
}

fn state_path(canvas_dir: &Path) -> std::path::PathBuf {
    canvas_dir.join(STATE_FILENAME)
}

/// Read `state.json`, defaulting to an empty state if absent or unreadable
/// (the core never fails on a missing scratchpad file).
pub fn read_state(canvas_dir: &Path) -> StateFile {
    std::fs::read(state_path(canvas_dir))
        .ok()
        .and_then(|bytes| serde_json::from_slice(&bytes).ok())
        .unwrap_or_default()
}

/// Write back only `call_graph_summary`, preserving whatever else the
/// scratchpad layer has already stored in the file.
pub fn write_call_graph_summary(canvas_dir: &Path, summary: &CallGraphBuildResult) -> blastradius_core::Result<()> {
    let mut state = read_state(canvas_dir);
    state.schema_version = STATE_SCHEMA_VERSION;
    state.call_graph_summary = Some(summary.clone());
    blastradius_artifact::write_json_atomic(&state_path(canvas_dir), &state)
}

/// Overwrite the full scratchpad with `state` (used by `Engine::init`, which
/// owns every field it writes, unlike the partial `write_call_graph_summary`
/// update a background build performs later).
pub fn write_init_state(canvas_dir: &Path, state: &StateFile) -> blastradius_core::Result<()> {
    blastradius_artifact::write_json_atomic(&state_path(canvas_dir), state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn write_call_graph_summary_preserves_other_fields() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join(STATE_FILENAME),
            serde_json::to_vec(&serde_json::json!({
                "schema_version": 2,
                "project_path": "/repo",
                "use_lsp": true
            }))
            .unwrap(),
        )
        .unwrap();

        write_call_graph_summary(dir.path(), &CallGraphBuildResult::default()).unwrap();

        let state = read_state(dir.path());
        assert_eq!(state.project_path.as_deref(), Some("/repo"));
        assert!(state.call_graph_summary.is_some());
    }

    #[test]
    fn read_state_defaults_when_file_is_missing() {
        let dir = TempDir::new().unwrap();
        let state = read_state(dir.path());
        assert_eq!(state.schema_version, 0);
        assert!(state.project_path.is_none());
    }
}
