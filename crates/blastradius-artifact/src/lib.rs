//! Content-addressed artifact layer (§4.H): Merkle digest over module
//! contents, per-digest `graph_meta`/`call_edges` cache files, atomic
//! writes, and a cross-process advisory lock.

pub mod call_edges;
pub mod canvas;
pub mod lock;
pub mod manifest;
pub mod merkle;
pub mod meta;
pub mod write;

pub use call_edges::{
    build_call_edges_file, call_edges_path, load_call_edges_if_current, write_call_edges, CallEdgesFile,
    EdgeRecord,
};
pub use canvas::canvas_dir;
pub use lock::{canvas_artifact_lock, ArtifactLock};
pub use manifest::{load_manifest, record_artifacts, Manifest};
pub use merkle::{compute_leaf, config_leaf_hash, merkle_root, Leaf};
pub use meta::{architecture_filename, compute_graph_meta, graph_meta_path, GraphMeta, GraphQuality, GRAPH_META_VERSION};
pub use write::{write_atomic, write_json_atomic};

use std::path::Path;
use std::time::Duration;

use blastradius_core::Result;

/// Write `meta` to `graph_meta.{digest}.json` under the artifact lock and
/// record it in the manifest. Best-effort per §7: failures degrade silently
/// at the caller (the lock itself never blocks the main pipeline).
pub fn publish_graph_meta(canvas_dir: &Path, meta: &GraphMeta, lock_timeout: Duration) -> Result<()> {
    let _guard = canvas_artifact_lock(canvas_dir, lock_timeout);
    let path = graph_meta_path(canvas_dir, meta.digest());
    write_json_atomic(&path, meta)?;
    record_artifacts(canvas_dir, &[meta::graph_meta_filename(meta.digest())])
}
