//! Persistent dirty-file queue (§4.I): `<canvas_dir>/dirty.json` under the
//! artifact lock, with claim/ack/reap lifecycle for incremental rebuilds
//! coordinated across processes.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use blastradius_artifact::{canvas_artifact_lock, write_json_atomic};
use blastradius_core::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;
use uuid::Uuid;

use crate::entry::{AckOutcome, DirtyEntry, EntryStatus};

const QUEUE_FILENAME: &str = "dirty.json";
const QUEUE_VERSION: u32 = 2;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueFile {
    pub version: u32,
    pub updated_at: String,
    pub files: HashMap<String, DirtyEntry>,
}

impl Default for QueueFile {
    fn default() -> Self {
        Self {
            version: QUEUE_VERSION,
            updated_at: now_rfc3339(),
            files: HashMap::new(),
        }
    }
}

fn now_rfc3339() -> String {
    Utc::now().to_rfc3339()
}

fn parse_time(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s).ok().map(|t| t.with_timezone(&Utc))
}

fn stat_signature(path: &Path) -> (Option<i128>, Option<u64>) {
    match std::fs::metadata(path) {
        Ok(meta) => {
            let mtime_ns = meta
                .modified()
                .ok()
                .and_then(|t| t.duration_since(std::time::UNIX_EPOCH).ok())
                .map(|d| d.as_nanos() as i128);
            (mtime_ns, Some(meta.len()))
        }
        Err(_) => (None, None),
    }
}

/// Persistent, cross-process dirty-file queue backed by `dirty.json`.
///
/// Every operation takes the artifact lock, reads the file fresh, mutates,
/// and writes it back — there is no cached in-memory state to go stale
/// across processes.
pub struct DirtyQueue {
    canvas_dir: PathBuf,
    lock_timeout: Duration,
}

impl DirtyQueue {
    pub fn new(canvas_dir: impl Into<PathBuf>, lock_timeout: Duration) -> Self {
        Self {
            canvas_dir: canvas_dir.into(),
            lock_timeout,
        }
    }

    fn path(&self) -> PathBuf {
        self.canvas_dir.join(QUEUE_FILENAME)
    }

    fn load(&self) -> QueueFile {
        std::fs::read(self.path())
            .ok()
            .and_then(|bytes| serde_json::from_slice(&bytes).ok())
            .unwrap_or_default()
    }

    fn save(&self, file: &mut QueueFile) -> Result<()> {
        file.updated_at = now_rfc3339();
        write_json_atomic(&self.path(), file)
    }

    /// Record `paths` as dirty under `reason`. Paths not under
    /// `project_dir` are silently dropped (§4.I). Coalesces with an
    /// existing pending entry, preserving its `queued_at`.
    pub fn mark_dirty(&self, project_dir: &Path, paths: &[PathBuf], reason: Option<&str>) -> Result<()> {
        let _guard = canvas_artifact_lock(&self.canvas_dir, self.lock_timeout);
        let mut file = self.load();
        let now = now_rfc3339();

        for path in paths {
            if !path.starts_with(project_dir) {
                continue;
            }
            let key = path.to_string_lossy().to_string();
            let (mtime_ns, size) = stat_signature(path);

            let (queued_at, attempts) = match file.files.get(&key) {
                Some(existing) => (existing.queued_at.clone(), existing.attempts),
                None => (now.clone(), 0),
            };

            file.files.insert(
                key.clone(),
                DirtyEntry {
                    path: key,
                    queued_at,
                    updated_at: now.clone(),
                    status: EntryStatus::Pending,
                    claim_id: None,
                    claimed_at: None,
                    mtime_ns,
                    size,
                    attempts,
                    reason: reason.map(str::to_string),
                    last_error: None,
                },
            );
        }

        self.save(&mut file)
    }

    /// Claim up to `max_items` pending entries, ordered by `updated_at`
    /// ascending, transitioning them to in-progress with a fresh claim id.
    pub fn claim_dirty(&self, max_items: Option<usize>) -> Result<Vec<DirtyEntry>> {
        let _guard = canvas_artifact_lock(&self.canvas_dir, self.lock_timeout);
        let mut file = self.load();

        let mut pending_keys: Vec<String> = file
            .files
            .iter()
            .filter(|(_, e)| e.status == EntryStatus::Pending)
            .map(|(k, _)| k.clone())
            .collect();
        pending_keys.sort_by(|a, b| file.files[a].updated_at.cmp(&file.files[b].updated_at));
        if let Some(max) = max_items {
            pending_keys.truncate(max);
        }

        let now = now_rfc3339();
        let mut claimed = Vec::with_capacity(pending_keys.len());
        for key in pending_keys {
            let entry = file.files.get_mut(&key).expect("key came from files");
            entry.status = EntryStatus::InProgress;
            entry.claim_id = Some(Uuid::new_v4().to_string());
            entry.claimed_at = Some(now.clone());
            claimed.push(entry.clone());
        }

        self.save(&mut file)?;
        Ok(claimed)
    }

    /// Acknowledge a claimed entry. Mismatched `claim_id`s are ignored
    /// (protects against double-processing after a reap).
    pub fn ack_dirty(&self, claim_id: &str, path: &str, outcome: AckOutcome, error: Option<&str>) -> Result<()> {
        let _guard = canvas_artifact_lock(&self.canvas_dir, self.lock_timeout);
        let mut file = self.load();

        let matches = file
            .files
            .get(path)
            .and_then(|e| e.claim_id.as_deref())
            .map(|id| id == claim_id)
            .unwrap_or(false);
        if !matches {
            warn!(claim_id, path, "ack_dirty: claim id mismatch, ignoring");
            return Ok(());
        }

        match outcome {
            AckOutcome::Ok | AckOutcome::Deleted => {
                file.files.remove(path);
            }
            AckOutcome::Deferred => {
                if let Some(entry) = file.files.get_mut(path) {
                    entry.status = EntryStatus::Pending;
                    entry.reason = Some("refresh_deferred".to_string());
                    entry.claim_id = None;
                    entry.claimed_at = None;
                    entry.updated_at = now_rfc3339();
                }
            }
            AckOutcome::Error => {
                if let Some(entry) = file.files.get_mut(path) {
                    entry.status = EntryStatus::Pending;
                    entry.attempts += 1;
                    entry.last_error = error.map(str::to_string);
                    entry.claim_id = None;
                    entry.claimed_at = None;
                    entry.updated_at = now_rfc3339();
                }
            }
        }

        self.save(&mut file)
    }

    /// Requeue any in-progress entry whose `claimed_at` is older than
    /// `ttl_s` seconds. Returns the number of entries reaped.
    pub fn reap_dirty(&self, ttl_s: f64) -> Result<usize> {
        let _guard = canvas_artifact_lock(&self.canvas_dir, self.lock_timeout);
        let mut file = self.load();
        let now = Utc::now();
        let mut reaped = 0usize;

        for entry in file.files.values_mut() {
            if entry.status != EntryStatus::InProgress {
                continue;
            }
            let Some(claimed_at) = entry.claimed_at.as_deref().and_then(parse_time) else {
                continue;
            };
            let age_s = (now - claimed_at).num_milliseconds() as f64 / 1000.0;
            if age_s >= ttl_s {
                entry.status = EntryStatus::Pending;
                entry.last_error = Some("claim_timeout".to_string());
                entry.claim_id = None;
                entry.claimed_at = None;
                entry.updated_at = now_rfc3339();
                reaped += 1;
            }
        }

        self.save(&mut file)?;
        Ok(reaped)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn queue(canvas: &Path) -> DirtyQueue {
        DirtyQueue::new(canvas, Duration::from_millis(500))
    }

    #[test]
    fn mark_then_claim_then_ack_ok_empties_queue() {
        let dir = TempDir::new().unwrap();
        let project = dir.path().join("project");
        std::fs::create_dir_all(&project).unwrap();
        let file_path = project.join("a.py");
        std::fs::write(&file_path, "x = 1").unwrap();
        let canvas = dir.path().join(".codecanvas");

        let q = queue(&canvas);
        q.mark_dirty(&project, &[file_path.clone()], Some("file_changed")).unwrap();

        let claimed = q.claim_dirty(None).unwrap();
        assert_eq!(claimed.len(), 1);
        let claim_id = claimed[0].claim_id.clone().unwrap();

        q.ack_dirty(&claim_id, &file_path.to_string_lossy(), AckOutcome::Ok, None).unwrap();

        let remaining = q.claim_dirty(None).unwrap();
        assert!(remaining.is_empty());
    }

    #[test]
    fn mark_dirty_coalesces_and_preserves_queued_at() {
        let dir = TempDir::new().unwrap();
        let project = dir.path().join("project");
        std::fs::create_dir_all(&project).unwrap();
        let file_path = project.join("a.py");
        std::fs::write(&file_path, "x = 1").unwrap();
        let canvas = dir.path().join(".codecanvas");

        let q = queue(&canvas);
        q.mark_dirty(&project, &[file_path.clone()], None).unwrap();
        let first = q.load();
        let queued_at_first = first.files.values().next().unwrap().queued_at.clone();

        q.mark_dirty(&project, &[file_path.clone()], Some("again")).unwrap();
        let second = q.load();
        let entry = second.files.values().next().unwrap();
        assert_eq!(entry.queued_at, queued_at_first);
        assert_eq!(entry.reason.as_deref(), Some("again"));
    }

    #[test]
    fn paths_outside_project_dir_are_dropped() {
        let dir = TempDir::new().unwrap();
        let project = dir.path().join("project");
        std::fs::create_dir_all(&project).unwrap();
        let outside = dir.path().join("outside.py");
        std::fs::write(&outside, "x = 1").unwrap();
        let canvas = dir.path().join(".codecanvas");

        let q = queue(&canvas);
        q.mark_dirty(&project, &[outside], None).unwrap();
        assert!(q.load().files.is_empty());
    }

    #[test]
    fn ack_dirty_ignores_mismatched_claim_id() {
        let dir = TempDir::new().unwrap();
        let project = dir.path().join("project");
        std::fs::create_dir_all(&project).unwrap();
        let file_path = project.join("a.py");
        std::fs::write(&file_path, "x = 1").unwrap();
        let canvas = dir.path().join(".codecanvas");

        let q = queue(&canvas);
        q.mark_dirty(&project, &[file_path.clone()], None).unwrap();
        let claimed = q.claim_dirty(None).unwrap();
        let real_claim_id = claimed[0].claim_id.clone().unwrap();

        q.ack_dirty("not-the-real-id", &file_path.to_string_lossy(), AckOutcome::Ok, None).unwrap();

        let still_there = q.load();
        let entry = still_there.files.get(&file_path.to_string_lossy().to_string()).unwrap();
        assert_eq!(entry.claim_id.as_deref(), Some(real_claim_id.as_str()));
    }

    #[test]
    fn reap_dirty_requeues_stale_in_progress_entries() {
        let dir = TempDir::new().unwrap();
        let project = dir.path().join("project");
        std::fs::create_dir_all(&project).unwrap();
        let file_path = project.join("a.py");
        std::fs::write(&file_path, "x = 1").unwrap();
        let canvas = dir.path().join(".codecanvas");

        let q = queue(&canvas);
        q.mark_dirty(&project, &[file_path.clone()], None).unwrap();
        q.claim_dirty(None).unwrap();

        let reaped = q.reap_dirty(0.0).unwrap();
        assert_eq!(reaped, 1);

        let entry = q.load().files.remove(&file_path.to_string_lossy().to_string()).unwrap();
        assert_eq!(entry.status, EntryStatus::Pending);
        assert_eq!(entry.last_error.as_deref(), Some("claim_timeout"));
    }
}
