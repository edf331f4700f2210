//! Parser orchestrator (§4.D): walks a scan root, chooses a backend per
//! file, and emits a [`Graph`] plus a [`ParseSummary`].

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use blastradius_core::{
    make_class_id, make_func_id, make_module_id, BlastradiusConfig, Edge, EdgeKind, Language, Node, NodeKind,
};
use blastradius_graph::Graph;
use blastradius_lsp::{global_runtime, SessionManager};

use crate::extractor::Definition;
use crate::file_collect::{discover_files, ALLOWED_EXTENSIONS};
use crate::import_resolve::{resolve_python, resolve_typescript, resolve_verbatim};
use crate::labels::module_label;
use crate::language_registry::with_thread_local_parser;
use crate::languages::extractor_for;
use crate::lsp_symbols::{collect_symbols, SymbolNodeKind};
use crate::regex_imports::{detect_c_includes, detect_r_sources, detect_shell_sources};
use crate::summary::ParseSummary;

const MAX_SNIPPET_LINES: usize = 20;
const NO_USE_LSP_TIMEOUT: Duration = Duration::from_millis(1);

/// Per-file scan options (§4.D inputs).
pub struct OrchestratorOptions {
    pub use_lsp: bool,
    /// When set, only these languages are attempted over LSP; `None` means
    /// "whatever has a probed server available".
    pub allowed_lsp_langs: Option<HashSet<Language>>,
    pub extra_excludes: Vec<String>,
}

impl Default for OrchestratorOptions {
    fn default() -> Self {
        Self {
            use_lsp: true,
            allowed_lsp_langs: None,
            extra_excludes: Vec::new(),
        }
    }
}

pub struct ParserOrchestrator<'a> {
    pub root: PathBuf,
    pub options: OrchestratorOptions,
    pub config: &'a BlastradiusConfig,
    pub sessions: Option<&'a SessionManager>,
}

impl<'a> ParserOrchestrator<'a> {
    pub fn new(root: impl Into<PathBuf>, options: OrchestratorOptions, config: &'a BlastradiusConfig) -> Self {
        Self {
            root: root.into(),
            options,
            config,
            sessions: None,
        }
    }

    pub fn with_sessions(mut self, sessions: &'a SessionManager) -> Self {
        self.sessions = Some(sessions);
        self
    }

    /// Run the full three-phase scan and return the built graph and summary.
    pub fn scan(&self) -> (Graph, ParseSummary) {
        tracing::info!(root = %self.root.display(), use_lsp = self.options.use_lsp, "scan start");
        let mut graph = Graph::new();
        let mut summary = ParseSummary::default();

        // Phase 1: discovery.
        let files = discover_files(&self.root, &self.options.extra_excludes);
        summary.files_seen = files.len();

        let known_labels: HashSet<String> = files
            .iter()
            .map(|p| module_label(&self.root, p))
            .collect();

        // Phase 2: per-file parsing.
        for path in &files {
            self.parse_file(path, &known_labels, &mut graph, &mut summary);
        }

        // Phase 3: indexing.
        graph.rebuild_indexes();
        tracing::info!(
            files_seen = summary.files_seen,
            files_parsed = summary.files_parsed,
            files_skipped = summary.files_skipped,
            nodes = graph.node_count(),
            "scan complete"
        );
        (graph, summary)
    }

    fn parse_file(&self, path: &Path, known_labels: &HashSet<String>, graph: &mut Graph, summary: &mut ParseSummary) {
        let label = module_label(&self.root, path);
        let fs_path = path.to_string_lossy().to_string();

        let bytes = match std::fs::read(path) {
            Ok(b) => b,
            Err(_) => {
                summary.record_skip(&label, "decode");
                return;
            }
        };
        let text = String::from_utf8_lossy(&bytes).into_owned();

        let module_id = make_module_id(&label);
        graph.add_node(Node::module(module_id.clone(), label.clone(), fs_path.clone()));

        if text.trim().is_empty() {
            summary.files_parsed += 1;
            return;
        }

        let Some(language) = Language::from_path(path) else {
            summary.record_skip(&label, "unsupported_extension");
            return;
        };
        summary.record_language(language);

        // R has no tree-sitter grammar or LSP server (§6): regex imports
        // only, no definitions beyond the MODULE node already emitted.
        if language == Language::R {
            self.emit_regex_imports(language, &text, &module_id, known_labels, graph);
            summary.files_parsed += 1;
            return;
        }

        let mut emitted_any = false;

        if self.should_try_lsp(language) {
            match self.try_lsp(path, &text, language) {
                Ok(symbols) => {
                    if !symbols.is_empty() {
                        emitted_any = true;
                    }
                    self.emit_lsp_symbols(&symbols, &label, &fs_path, &module_id, &text, graph);
                    summary.lsp_files += 1;
                }
                Err(failure) => {
                    tracing::debug!(label, reason = %failure.reason, "lsp documentSymbol failed, falling back");
                    summary.record_lsp_failure(&label, failure.reason);
                }
            }
        }

        // Fallback to tree-sitter definitions if LSP produced nothing (or
        // wasn't attempted). An authoritative-empty LSP response does not
        // force this fallback (§8 boundary behavior) — `emitted_any` tracks
        // whether LSP ran and returned symbols, not whether it ran at all;
        // see `try_lsp` call above, which only falls through here on Err.
        if !emitted_any && language.has_tree_sitter() {
            if let Some(defs) = self.tree_sitter_definitions(language, &text) {
                self.emit_tree_sitter_definitions(&defs, &label, &fs_path, &module_id, graph);
                summary.tree_sitter_files += 1;
            }
        }

        // Import extraction (§4.D point 6): C and shell use the cheap
        // lexical regex detectors even though both have tree-sitter
        // grammars for definitions/call-sites; every other tree-sitter
        // language resolves import_specs from the same parse.
        if matches!(language, Language::C | Language::Shell) {
            self.emit_regex_imports(language, &text, &module_id, known_labels, graph);
        } else if language.has_tree_sitter() {
            if let Some(specs) = self.tree_sitter_import_specs(language, &text) {
                for spec in specs {
                    let resolved = match language {
                        Language::Python => resolve_python(&spec, known_labels),
                        Language::TypeScript => resolve_typescript(&spec, &label, known_labels)
                            .or_else(|| resolve_verbatim(&spec, known_labels)),
                        _ => resolve_verbatim(&spec, known_labels),
                    };
                    if let Some(target_label) = resolved {
                        let target_id = make_module_id(&target_label);
                        graph.add_edge(Edge::new(module_id.clone(), target_id, EdgeKind::Import));
                    }
                }
            }
        }

        summary.files_parsed += 1;
    }

    fn should_try_lsp(&self, language: Language) -> bool {
        if !self.options.use_lsp || self.sessions.is_none() {
            return false;
        }
        if let Some(allowed) = &self.options.allowed_lsp_langs {
            if !allowed.contains(&language) {
                return false;
            }
        }
        blastradius_lsp::server_registry::server_command(language).is_some()
    }

    fn try_lsp(
        &self,
        path: &Path,
        text: &str,
        language: Language,
    ) -> Result<Vec<crate::lsp_symbols::LspSymbol>, blastradius_lsp::LspFailure> {
        let sessions = self.sessions.expect("checked by should_try_lsp");
        let session = sessions.acquire(language, &self.root);
        let (mtime_ns, size) = stat_fingerprint(path);
        let path = path.to_path_buf();
        let text = text.to_string();
        let timeout = self.config.lsp.request_timeout;

        let result = global_runtime().run(
            async move { session.document_symbol(&path, &text, mtime_ns, size).await },
            timeout.max(NO_USE_LSP_TIMEOUT),
        );

        match result {
            Ok(Ok(value)) => Ok(collect_symbols(&value)),
            Ok(Err(failure)) => Err(failure),
            Err(_) => Err(blastradius_lsp::LspFailure {
                reason: blastradius_lsp::LspFailureReason::Timeout,
                detail: "documentSymbol runtime bridge timed out".to_string(),
            }),
        }
    }

    fn emit_lsp_symbols(
        &self,
        symbols: &[crate::lsp_symbols::LspSymbol],
        label: &str,
        fs_path: &str,
        module_id: &str,
        text: &str,
        graph: &mut Graph,
    ) {
        let lines: Vec<&str> = text.lines().collect();
        for sym in symbols {
            let (id, kind) = match sym.node_kind {
                SymbolNodeKind::Class => (make_class_id(label, &sym.qualified_label), NodeKind::Class),
                SymbolNodeKind::Func => (
                    make_func_id(label, &sym.qualified_label, sym.id_line),
                    NodeKind::Func,
                ),
            };

            let snippet = snippet_from_lines(&lines, sym.start_line, MAX_SNIPPET_LINES);
            let node = Node {
                id: id.clone(),
                kind,
                label: sym.qualified_label.clone(),
                fs_path: fs_path.to_string(),
                snippet: Some(snippet),
                start_line: Some(sym.start_line),
                start_char: Some(sym.start_char),
                end_line: Some(sym.end_line),
                end_char: Some(sym.end_char),
            };
            if !graph.add_node(node) {
                continue;
            }

            let parent_id = match &sym.parent_class_label {
                Some(parent_label) => make_class_id(label, parent_label),
                None => module_id.to_string(),
            };
            graph.add_edge(Edge::new(parent_id, id, EdgeKind::Contains));
        }
    }

    fn tree_sitter_definitions(&self, language: Language, text: &str) -> Option<Vec<Definition>> {
        let extractor = extractor_for(language)?;
        with_thread_local_parser(language, |parser| {
            let tree = parser.parse(text, None)?;
            let parsed = crate::extractor::ParsedFile { tree, source: text };
            Some(extractor.extract(&parsed).definitions)
        })?
    }

    fn tree_sitter_import_specs(&self, language: Language, text: &str) -> Option<Vec<crate::extractor::ImportSpec>> {
        let extractor = extractor_for(language)?;
        with_thread_local_parser(language, |parser| {
            let tree = parser.parse(text, None)?;
            let parsed = crate::extractor::ParsedFile { tree, source: text };
            Some(extractor.extract(&parsed).import_specs)
        })?
    }

    fn emit_tree_sitter_definitions(
        &self,
        defs: &[Definition],
        label: &str,
        fs_path: &str,
        module_id: &str,
        graph: &mut Graph,
    ) {
        for def in defs {
            let (id, kind) = match def.kind {
                NodeKind::Class => (make_class_id(label, &def.name), NodeKind::Class),
                NodeKind::Func => (make_func_id(label, &def.name, def.start_line), NodeKind::Func),
                NodeKind::Module => continue,
            };
            let node = Node {
                id: id.clone(),
                kind,
                label: def.name.clone(),
                fs_path: fs_path.to_string(),
                snippet: None,
                start_line: Some(def.start_line),
                start_char: Some(def.start_char),
                end_line: Some(def.end_line),
                end_char: Some(def.end_char),
            };
            if !graph.add_node(node) {
                continue;
            }
            let parent_id = match &def.parent_class {
                Some(parent_label) => make_class_id(label, parent_label),
                None => module_id.to_string(),
            };
            graph.add_edge(Edge::new(parent_id, id, EdgeKind::Contains));
        }
    }

    fn emit_regex_imports(
        &self,
        language: Language,
        text: &str,
        module_id: &str,
        known_labels: &HashSet<String>,
        graph: &mut Graph,
    ) {
        let specs = match language {
            Language::C => detect_c_includes(text),
            Language::Shell => detect_shell_sources(text),
            Language::R => detect_r_sources(text),
            _ => return,
        };
        for spec in specs {
            if let Some(target_label) = resolve_verbatim(&spec, known_labels) {
                let target_id = make_module_id(&target_label);
                graph.add_edge(Edge::new(module_id.to_string(), target_id, EdgeKind::Import));
            }
        }
    }
}

fn snippet_from_lines(lines: &[&str], start_line: u32, max_lines: usize) -> String {
    let start = start_line as usize;
    if start >= lines.len() {
        return String::new();
    }
    let end = (start + max_lines).min(lines.len());
    lines[start..end].join("\n")
}

fn stat_fingerprint(path: &Path) -> (i128, u64) {
    std::fs::metadata(path)
        .ok()
        .map(|meta| {
            let mtime_ns = meta
                .modified()
                .ok()
                .and_then(|t| t.duration_since(std::time::UNIX_EPOCH).ok())
                .map(|d| d.as_nanos() as i128)
                .unwrap_or(0);
            (mtime_ns, meta.len())
        })
        .unwrap_or((0, 0))
}

/// `ALLOWED_EXTENSIONS` re-exported for embedders that want to validate a
/// path before calling into the orchestrator.
pub fn allowed_extensions() -> &'static [&'static str] {
    ALLOWED_EXTENSIONS
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn options_no_lsp() -> OrchestratorOptions {
        OrchestratorOptions {
            use_lsp: false,
            allowed_lsp_langs: None,
            extra_excludes: Vec::new(),
        }
    }

    #[test]
    fn empty_file_produces_only_a_module_node() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("a.py"), "").unwrap();
        let cfg = BlastradiusConfig::default();
        let orch = ParserOrchestrator::new(dir.path(), options_no_lsp(), &cfg);
        let (graph, summary) = orch.scan();
        assert_eq!(graph.node_count(), 1);
        assert_eq!(graph.edge_count(), 0);
        assert_eq!(summary.files_parsed, 1);
    }

    #[test]
    fn python_relative_import_resolves_to_sibling() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("__init__.py"), "").unwrap();
        std::fs::write(dir.path().join("b.py"), "def b():\n    return 1\n").unwrap();
        std::fs::write(dir.path().join("a.py"), "from .b import b\nprint(b())\n").unwrap();

        let cfg = BlastradiusConfig::default();
        let orch = ParserOrchestrator::new(dir.path(), options_no_lsp(), &cfg);
        let (graph, _summary) = orch.scan();

        let a_id = make_module_id("a.py");
        let b_id = make_module_id("b.py");
        let edges = graph.get_edges_from(&a_id);
        assert!(edges.iter().any(|e| e.to_id == b_id && e.kind == EdgeKind::Import));
    }

    #[test]
    fn nested_function_inside_function_is_not_emitted() {
        let dir = tempdir().unwrap();
        std::fs::write(
            dir.path().join("m.py"),
            "def outer():\n    def inner():\n        return 1\n    return inner()\n",
        )
        .unwrap();
        let cfg = BlastradiusConfig::default();
        let orch = ParserOrchestrator::new(dir.path(), options_no_lsp(), &cfg);
        let (graph, _summary) = orch.scan();
        let func_count = graph.nodes.iter().filter(|n| n.kind == NodeKind::Func).count();
        assert_eq!(func_count, 1);
    }
}
