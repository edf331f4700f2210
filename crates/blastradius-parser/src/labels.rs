//! Module label computation (§3): POSIX-normalized relative paths from the
//! scan root, with single top-level project prefix stripping delegated to
//! `blastradius_core::workspace`.

use std::path::Path;

use blastradius_core::workspace::maybe_strip_single_project_prefix;

/// Render `path` relative to `root` as a POSIX-normalized label, then apply
/// single-project-prefix stripping.
pub fn module_label(root: &Path, path: &Path) -> String {
    let rel = path.strip_prefix(root).unwrap_or(path);
    let posix: String = rel
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/");
    maybe_strip_single_project_prefix(root, &posix)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn strips_single_project_prefix() {
        let dir = tempdir().unwrap();
        let proj = dir.path().join("pyknotid");
        std::fs::create_dir_all(proj.join(".git")).unwrap();
        let file = proj.join("src/a.py");
        assert_eq!(module_label(dir.path(), &file), "src/a.py");
    }

    #[test]
    fn no_project_marker_keeps_full_relative_path() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("src/a.py");
        assert_eq!(module_label(dir.path(), &file), "src/a.py");
    }
}
