//! Workspace-root and project-marker detection.
//!
//! CodeCanvas uses this to choose a stable LSP workspace root (project or
//! worktree) instead of per-file directories, and to decide whether a given
//! root represents a single project or a multi-repo container.

use std::path::{Path, PathBuf};

use dashmap::DashMap;
use once_cell::sync::Lazy;

const PROJECT_MARKERS: &[&str] = &[
    ".git",
    "pyproject.toml",
    "package.json",
    "go.mod",
    "Cargo.toml",
    "pom.xml",
    "build.gradle",
    "build.gradle.kts",
];

static WORKSPACE_ROOT_CACHE: Lazy<DashMap<PathBuf, PathBuf>> = Lazy::new(DashMap::new);

/// `true` if `root` contains any of the recognized project markers.
pub fn has_project_markers(root: &Path) -> bool {
    PROJECT_MARKERS.iter().any(|m| root.join(m).exists())
}

/// Find the most likely workspace root for `start` (a file or directory).
///
/// Resolution order:
/// 1. If `CANVAS_PROJECT_DIR` is set and `start` is inside it, use that.
/// 2. Walk upwards from `start` (at most `max_up` levels) looking for a
///    project marker.
/// 3. Fall back to the nearest existing ancestor directory.
pub fn find_workspace_root(start: &Path, max_up: usize) -> PathBuf {
    let mut p = if start.is_file() {
        start.parent().unwrap_or(start).to_path_buf()
    } else {
        start.to_path_buf()
    };
    p = p.canonicalize().unwrap_or(p);

    if let Ok(env_root) = std::env::var("CANVAS_PROJECT_DIR") {
        if !env_root.is_empty() {
            let env_path = PathBuf::from(&env_root);
            let env_path = env_path.canonicalize().unwrap_or(env_path);
            if env_path.exists() && p.starts_with(&env_path) {
                return env_path;
            }
        }
    }

    if let Some(cached) = WORKSPACE_ROOT_CACHE.get(&p) {
        return cached.clone();
    }

    let found = find_workspace_root_uncached(&p, max_up);
    WORKSPACE_ROOT_CACHE.insert(p, found.clone());
    found
}

fn find_workspace_root_uncached(start: &Path, max_up: usize) -> PathBuf {
    let mut p = start.to_path_buf();
    for _ in 0..max_up {
        if has_project_markers(&p) {
            return p;
        }
        match p.parent() {
            Some(parent) if parent != p => p = parent.to_path_buf(),
            _ => break,
        }
    }
    p
}

/// Immediate children of `root` that look like project roots (each has at
/// least one project marker directly inside it).
pub fn top_level_project_roots(root: &Path) -> Vec<PathBuf> {
    let mut out = Vec::new();
    let Ok(entries) = std::fs::read_dir(root) else {
        return out;
    };
    let mut children: Vec<PathBuf> = entries
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.is_dir())
        .collect();
    children.sort();
    for child in children {
        if has_project_markers(&child) {
            out.push(child);
        }
    }
    out
}

/// For multi-repo roots like `/app`, drop the single top-level project
/// prefix from a display label. If `root` has exactly one marker-backed
/// child (e.g. `/app/pyknotid`), `pyknotid/src/a.py` becomes `src/a.py`. If
/// there are zero or multiple project roots, the label is returned as-is.
pub fn maybe_strip_single_project_prefix(root: &Path, rel_path: &str) -> String {
    let roots = top_level_project_roots(root);
    if roots.len() != 1 {
        return rel_path.to_string();
    }
    let Some(name) = roots[0].file_name().and_then(|n| n.to_str()) else {
        return rel_path.to_string();
    };
    let prefix = format!("{name}/");
    rel_path
        .strip_prefix(prefix.as_str())
        .map(|s| s.to_string())
        .unwrap_or_else(|| rel_path.to_string())
}

/// Directories to scan for language presence: the single subtree if `root`
/// is a single project, each subtree if it contains multiple projects, or
/// `root` itself if it contains none.
pub fn content_roots_for_scan(root: &Path) -> Vec<PathBuf> {
    let roots = top_level_project_roots(root);
    if roots.is_empty() {
        vec![root.to_path_buf()]
    } else {
        roots
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn finds_marker_directory_by_walking_up() {
        let dir = tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join(".git")).unwrap();
        let nested = dir.path().join("a/b/c");
        std::fs::create_dir_all(&nested).unwrap();
        let found = find_workspace_root(&nested, 30);
        assert_eq!(found, dir.path().canonicalize().unwrap());
    }

    #[test]
    fn single_project_root_strips_prefix() {
        let dir = tempdir().unwrap();
        let proj = dir.path().join("pyknotid");
        std::fs::create_dir_all(proj.join(".git")).unwrap();
        let stripped = maybe_strip_single_project_prefix(dir.path(), "pyknotid/src/a.py");
        assert_eq!(stripped, "src/a.py");
    }

    #[test]
    fn multi_project_root_preserves_prefix() {
        let dir = tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("a/.git")).unwrap();
        std::fs::create_dir_all(dir.path().join("b/.git")).unwrap();
        let stripped = maybe_strip_single_project_prefix(dir.path(), "a/src/x.py");
        assert_eq!(stripped, "a/src/x.py");
    }
}
