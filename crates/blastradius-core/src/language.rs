//! Language identification shared by the parser, LSP, and call-graph layers.

use std::fmt;
use std::path::Path;

/// A recognized source language, keyed the way `state.json`/`graph_meta.json`
/// key it (§6): short lowercase tokens, not full names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Language {
    Python,
    TypeScript,
    Go,
    Rust,
    Java,
    Ruby,
    C,
    Shell,
    R,
    CSharp,
    Kotlin,
    Dart,
}

impl Language {
    /// Detect a language from a file extension (no leading dot).
    pub fn from_extension(ext: &str) -> Option<Self> {
        Some(match ext {
            "py" | "pyi" => Language::Python,
            "ts" | "tsx" | "js" | "jsx" => Language::TypeScript,
            "go" => Language::Go,
            "rs" => Language::Rust,
            "java" => Language::Java,
            "rb" => Language::Ruby,
            "c" | "h" | "cpp" | "hpp" | "cc" | "hh" | "cxx" | "hxx" => Language::C,
            "sh" | "bash" => Language::Shell,
            "r" | "R" => Language::R,
            "cs" => Language::CSharp,
            "kt" | "kts" => Language::Kotlin,
            "dart" => Language::Dart,
            _ => return None,
        })
    }

    /// Detect a language from a file path's extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|e| e.to_str())
            .and_then(Self::from_extension)
    }

    /// The short key used in parse summaries and `state.json` (§6).
    pub fn key(&self) -> &'static str {
        match self {
            Language::Python => "py",
            Language::TypeScript => "ts",
            Language::Go => "go",
            Language::Rust => "rs",
            Language::Java => "java",
            Language::Ruby => "rb",
            Language::C => "c",
            Language::Shell => "sh",
            Language::R => "r",
            Language::CSharp => "cs",
            Language::Kotlin => "kotlin",
            Language::Dart => "dart",
        }
    }

    /// `true` if a tree-sitter grammar is wired up for this language (§6:
    /// available for {py, ts, go, rs, java, rb, c, sh}).
    pub fn has_tree_sitter(&self) -> bool {
        matches!(
            self,
            Language::Python
                | Language::TypeScript
                | Language::Go
                | Language::Rust
                | Language::Java
                | Language::Ruby
                | Language::C
                | Language::Shell
        )
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.key())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_extensions_to_keys() {
        assert_eq!(Language::from_extension("py").map(|l| l.key()), Some("py"));
        assert_eq!(Language::from_extension("tsx").map(|l| l.key()), Some("ts"));
        assert_eq!(Language::from_extension("unknown"), None);
    }

    #[test]
    fn tree_sitter_availability_matches_spec() {
        assert!(Language::Python.has_tree_sitter());
        assert!(Language::Shell.has_tree_sitter());
        assert!(!Language::R.has_tree_sitter());
        assert!(!Language::Kotlin.has_tree_sitter());
    }
}
