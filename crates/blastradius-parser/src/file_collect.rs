//! Phase 1 discovery (§4.D): walk the scan root with directory pruning and
//! collect candidate files whose extension is in the allow-list.

use std::path::{Path, PathBuf};

use ignore::WalkBuilder;

/// Extensions the orchestrator ever considers (§6 + R, which has no
/// tree-sitter grammar but still gets a MODULE node and regex imports).
pub const ALLOWED_EXTENSIONS: &[&str] = &[
    "py", "pyi", "ts", "tsx", "js", "jsx", "go", "rs", "java", "rb", "c", "h", "cpp", "hpp", "cc",
    "hh", "cxx", "hxx", "sh", "bash", "r", "R",
];

/// Directory names pruned unconditionally during discovery, matched as a
/// `/name/` substring against the absolute path (§4.D).
pub const DEFAULT_EXCLUDE_DIRS: &[&str] = &[
    "node_modules",
    "__pycache__",
    ".git",
    "venv",
    ".venv",
    "dist",
    "build",
    "target",
    ".codecanvas",
];

fn is_excluded(path: &Path, exclude_substrings: &[String]) -> bool {
    let Some(path_str) = path.to_str() else {
        return false;
    };
    exclude_substrings.iter().any(|pat| path_str.contains(pat.as_str()))
}

/// Walk `root`, pruning any directory whose absolute path contains an
/// exclude substring, and return candidate files whose extension is in
/// [`ALLOWED_EXTENSIONS`].
pub fn discover_files(root: &Path, extra_excludes: &[String]) -> Vec<PathBuf> {
    let exclude_substrings: Vec<String> = DEFAULT_EXCLUDE_DIRS
        .iter()
        .map(|d| format!("/{d}/"))
        .chain(extra_excludes.iter().cloned())
        .collect();

    let mut out = Vec::new();
    let walker = WalkBuilder::new(root)
        .hidden(false)
        .git_ignore(false)
        .git_exclude(false)
        .ignore(false)
        .filter_entry(move |_| true)
        .build();

    for entry in walker.flatten() {
        let path = entry.path();
        if entry.file_type().map(|t| t.is_dir()).unwrap_or(false) {
            continue;
        }
        if is_excluded(path, &exclude_substrings) {
            continue;
        }
        let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
            continue;
        };
        if ALLOWED_EXTENSIONS.contains(&ext) {
            out.push(path.to_path_buf());
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn prunes_excluded_directories() {
        let dir = tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("node_modules")).unwrap();
        std::fs::write(dir.path().join("node_modules/dep.js"), "").unwrap();
        std::fs::write(dir.path().join("main.py"), "").unwrap();

        let files = discover_files(dir.path(), &[]);
        assert_eq!(files.len(), 1);
        assert!(files[0].ends_with("main.py"));
    }

    #[test]
    fn rejects_disallowed_extensions() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("readme.md"), "").unwrap();
        let files = discover_files(dir.path(), &[]);
        assert!(files.is_empty());
    }
}
