//! Resolve raw [`ImportSpec`] tokens to known module labels (§4.D point 6).
//!
//! Resolution is per-language; an edge is only kept once its target label
//! is confirmed present in the known-module set built during discovery
//! (§8: "for any import edge m1 -> m2, m2.label in known_module_labels").

use std::collections::HashSet;

use crate::extractor::ImportSpec;

/// Try candidate labels for a Python dotted import (`pkg.mod` or
/// `from pkg import mod`) against the known-module set: `pkg/mod.py` first,
/// then the package fallback `pkg/mod/__init__.py`.
pub fn resolve_python(spec: &ImportSpec, known: &HashSet<String>) -> Option<String> {
    let dotted = spec.raw.trim_start_matches('.');
    if dotted.is_empty() {
        return None;
    }
    let as_path = dotted.replace('.', "/");
    let direct = format!("{as_path}.py");
    if known.contains(&direct) {
        return Some(direct);
    }
    let pkg_init = format!("{as_path}/__init__.py");
    if known.contains(&pkg_init) {
        return Some(pkg_init);
    }
    None
}

/// Resolve a TypeScript/JS relative import specifier (`./sibling`,
/// `../other`) against the known-module set, trying extension candidates
/// then an `/index.*` fallback.
pub fn resolve_typescript(spec: &ImportSpec, from_label: &str, known: &HashSet<String>) -> Option<String> {
    if !spec.raw.starts_with('.') {
        return None;
    }
    let base_dir = std::path::Path::new(from_label)
        .parent()
        .unwrap_or_else(|| std::path::Path::new(""));
    let joined = base_dir.join(&spec.raw);
    let normalized = normalize_posix(&joined);

    const EXTS: &[&str] = &["ts", "tsx", "js", "jsx"];
    for ext in EXTS {
        let candidate = format!("{normalized}.{ext}");
        if known.contains(&candidate) {
            return Some(candidate);
        }
    }
    for ext in EXTS {
        let candidate = format!("{normalized}/index.{ext}");
        if known.contains(&candidate) {
            return Some(candidate);
        }
    }
    None
}

/// Collapse `.`/`..` path components and render as a POSIX-style string
/// (mirrors the label normalization used for module labels).
fn normalize_posix(path: &std::path::Path) -> String {
    let mut parts: Vec<&std::ffi::OsStr> = Vec::new();
    for component in path.components() {
        match component {
            std::path::Component::CurDir => {}
            std::path::Component::ParentDir => {
                parts.pop();
            }
            std::path::Component::Normal(s) => parts.push(s),
            _ => {}
        }
    }
    parts
        .iter()
        .map(|p| p.to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

/// For languages whose imports resolve to a bare label already present in
/// the known-module set (C/shell/R regex detectors against a same-directory
/// include, or any other raw token that happens to match a label verbatim).
pub fn resolve_verbatim(spec: &ImportSpec, known: &HashSet<String>) -> Option<String> {
    known.contains(&spec.raw).then(|| spec.raw.clone())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(raw: &str) -> ImportSpec {
        ImportSpec { raw: raw.to_string(), line: 0 }
    }

    #[test]
    fn python_direct_module_resolves() {
        let known: HashSet<String> = ["pkg/b.py".to_string()].into_iter().collect();
        assert_eq!(resolve_python(&spec("pkg.b"), &known), Some("pkg/b.py".to_string()));
    }

    #[test]
    fn python_package_falls_back_to_init() {
        let known: HashSet<String> = ["mypkg/__init__.py".to_string()].into_iter().collect();
        assert_eq!(
            resolve_python(&spec("mypkg"), &known),
            Some("mypkg/__init__.py".to_string())
        );
    }

    #[test]
    fn typescript_relative_import_tries_extensions() {
        let known: HashSet<String> = ["pkg/sibling.ts".to_string()].into_iter().collect();
        assert_eq!(
            resolve_typescript(&spec("./sibling"), "pkg/a.ts", &known),
            Some("pkg/sibling.ts".to_string())
        );
    }

    #[test]
    fn typescript_relative_import_falls_back_to_index() {
        let known: HashSet<String> = ["pkg/sibling/index.ts".to_string()].into_iter().collect();
        assert_eq!(
            resolve_typescript(&spec("./sibling"), "pkg/a.ts", &known),
            Some("pkg/sibling/index.ts".to_string())
        );
    }

    #[test]
    fn typescript_ignores_non_relative_specifiers() {
        let known: HashSet<String> = HashSet::new();
        assert_eq!(resolve_typescript(&spec("lodash"), "pkg/a.ts", &known), None);
    }
}
