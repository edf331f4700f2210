//! Manifest file (§4.H): accumulates the list of per-digest artifacts for
//! external extraction (e.g. an archiver that ships old digests off disk).

use std::collections::BTreeSet;
use std::path::Path;

use blastradius_core::Result;
use serde::{Deserialize, Serialize};

const MANIFEST_FILENAME: &str = "manifest.json";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Manifest {
    pub artifacts: BTreeSet<String>,
}

fn manifest_path(canvas_dir: &Path) -> std::path::PathBuf {
    canvas_dir.join(MANIFEST_FILENAME)
}

pub fn load_manifest(canvas_dir: &Path) -> Manifest {
    std::fs::read(manifest_path(canvas_dir))
        .ok()
        .and_then(|bytes| serde_json::from_slice(&bytes).ok())
        .unwrap_or_default()
}

/// Record `filenames` into the manifest, creating it if absent. Best-effort:
/// failures are logged by the caller's artifact lock, never propagated.
pub fn record_artifacts(canvas_dir: &Path, filenames: &[String]) -> Result<()> {
    let mut manifest = load_manifest(canvas_dir);
    manifest.artifacts.extend(filenames.iter().cloned());
    crate::write::write_json_atomic(&manifest_path(canvas_dir), &manifest)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn record_artifacts_accumulates_across_calls() {
        let dir = TempDir::new().unwrap();
        record_artifacts(dir.path(), &["graph_meta.aaa.json".to_string()]).unwrap();
        record_artifacts(dir.path(), &["call_edges.aaa.json".to_string()]).unwrap();

        let manifest = load_manifest(dir.path());
        assert_eq!(manifest.artifacts.len(), 2);
    }
}
