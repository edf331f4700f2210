//! Call-graph builder (§4.F): resolves tree-sitter call sites against LSP
//! `definition` lookups to produce CALL edges, without mutating the live
//! graph — callers merge the returned edges under the writer lock.

use std::collections::HashMap;
use std::path::Path;
use std::time::{Duration, Instant};

use blastradius_core::{CallGraphConfig, Edge, EdgeKind, Language, LspConfig, Node, NodeKind};
use blastradius_graph::Graph;
use blastradius_lsp::session::BatchDefinitionRequest;
use blastradius_lsp::{global_runtime, server_registry, SessionManager};
use blastradius_parser::language_registry::with_thread_local_parser;
use blastradius_parser::languages::extractor_for;
use blastradius_parser::extractor::ParsedFile;
use serde_json::Value;

use crate::result::CallGraphBuildResult;

/// Per-file FUNC node index sorted by `(start_line, start_char)`, used for
/// both enclosing-caller lookup and callee resolution.
struct FuncIndex<'a> {
    by_file: HashMap<String, Vec<&'a Node>>,
}

impl<'a> FuncIndex<'a> {
    fn build(graph: &'a Graph) -> Self {
        let mut by_file: HashMap<String, Vec<&Node>> = HashMap::new();
        for node in &graph.nodes {
            if node.kind == NodeKind::Func {
                by_file.entry(node.fs_path.clone()).or_default().push(node);
            }
        }
        for nodes in by_file.values_mut() {
            nodes.sort_by_key(|n| (n.start_line.unwrap_or(0), n.start_char.unwrap_or(0)));
        }
        Self { by_file }
    }

    fn is_indexed(&self, fs_path: &str) -> bool {
        self.by_file.contains_key(fs_path)
    }

    /// The innermost FUNC node in `fs_path` containing `(line, char)`, or
    /// `None` if no indexed function covers that position.
    fn enclosing(&self, fs_path: &str, line: u32, char: u32) -> Option<&'a Node> {
        let candidates = self.by_file.get(fs_path)?;
        candidates
            .iter()
            .filter(|n| n.contains_pos(line, char))
            .min_by_key(|n| {
                let span = n.end_line.unwrap_or(u32::MAX).saturating_sub(n.start_line.unwrap_or(0));
                span
            })
            .copied()
    }
}

pub struct CallGraphBuilder<'a> {
    pub graph: &'a Graph,
    pub root: &'a Path,
    pub sessions: &'a SessionManager,
    pub lsp_cfg: LspConfig,
    pub cfg: CallGraphConfig,
}

impl<'a> CallGraphBuilder<'a> {
    /// Run a single build phase (foreground or background share this
    /// algorithm; callers pass different `budget`s per §4.F/§5).
    pub fn build(
        &self,
        budget: Duration,
        should_continue: &dyn Fn() -> bool,
    ) -> (Vec<Edge>, CallGraphBuildResult) {
        tracing::info!(?budget, "call-graph build start");
        let started = Instant::now();
        let func_index = FuncIndex::build(self.graph);
        let mut result = CallGraphBuildResult::default();
        let mut edge_keys = std::collections::HashSet::new();
        let mut edges = Vec::new();

        let modules: Vec<&Node> = self.graph.nodes.iter().filter(|n| n.kind == NodeKind::Module).collect();

        for module in modules {
            if started.elapsed() >= budget || !should_continue() {
                return (edges, finish(result, started, false));
            }
            if result.processed_callsites >= self.cfg.max_callsites_total {
                return (edges, finish(result, started, false));
            }

            let Some(language) = Language::from_path(Path::new(&module.fs_path)) else {
                continue;
            };
            if !language.has_tree_sitter() || server_registry::server_command(language).is_none() {
                continue;
            }

            result.considered_files += 1;
            self.process_module(
                module,
                language,
                &func_index,
                &mut edges,
                &mut edge_keys,
                &mut result,
                started,
                budget,
            );
        }

        (edges, finish(result, started, true))
    }

    #[allow(clippy::too_many_arguments)]
    fn process_module(
        &self,
        module: &Node,
        language: Language,
        func_index: &FuncIndex,
        edges: &mut Vec<Edge>,
        edge_keys: &mut std::collections::HashSet<String>,
        result: &mut CallGraphBuildResult,
        started: Instant,
        budget: Duration,
    ) {
        let path = Path::new(&module.fs_path);
        let Ok(bytes) = std::fs::read(path) else {
            return;
        };
        let text = String::from_utf8_lossy(&bytes).into_owned();

        let Some(extractor) = extractor_for(language) else {
            return;
        };
        let Some(call_sites) = with_thread_local_parser(language, |parser| {
            let tree = parser.parse(&text, None)?;
            let parsed = ParsedFile { tree, source: &text };
            Some(extractor.extract(&parsed).call_sites)
        })
        .flatten() else {
            return;
        };

        let capped: Vec<_> = call_sites.into_iter().take(self.cfg.max_callsites_per_file).collect();

        // Map each call site to its enclosing FUNC node (the caller).
        let mut requests = Vec::new();
        let mut callers = Vec::new();
        for site in &capped {
            match func_index.enclosing(&module.fs_path, site.line, site.char) {
                Some(caller) => {
                    requests.push(BatchDefinitionRequest { line: site.line, character: site.char });
                    callers.push(caller);
                }
                None => result.skipped_no_caller += 1,
            }
        }
        if requests.is_empty() {
            return;
        }

        let (mtime_ns, size) = stat_fingerprint(path);
        let sessions = self.sessions;
        let timeout = self.lsp_cfg.request_timeout;
        let remaining = budget.saturating_sub(started.elapsed()).max(Duration::from_millis(1));
        let effective_timeout = timeout.min(remaining);

        let session = sessions.acquire(language, self.root);
        let path_buf = path.to_path_buf();
        let text_clone = text.clone();
        let outcome = global_runtime().run(
            async move { session.batch_definitions(&path_buf, &text_clone, mtime_ns, size, &requests).await },
            effective_timeout,
        );

        let responses = match outcome {
            Ok(responses) => responses,
            Err(_) => {
                result.record_lsp_failure("timeout");
                return;
            }
        };

        for (caller, response) in callers.into_iter().zip(responses.into_iter()) {
            result.processed_callsites += 1;
            match response {
                Ok(value) => match resolve_callee(&value, func_index) {
                    Ok(callee) => {
                        result.resolved_callsites += 1;
                        let edge = Edge::new(caller.id.clone(), callee.id.clone(), EdgeKind::Call);
                        if edge_keys.insert(edge.key()) {
                            result.edges += 1;
                            edges.push(edge);
                        }
                    }
                    Err(reason) => result.record_no_callee(reason),
                },
                Err(failure) => {
                    result.skipped_no_definition += 1;
                    result.record_lsp_failure(&failure.reason.to_string());
                }
            }
        }
    }
}

/// Pick the first candidate location whose target file is indexed and
/// whose range start falls inside a known FUNC node; that node is the
/// callee. Returns a sub-reason string on failure (§4.F point 5).
fn resolve_callee<'a>(response: &Value, func_index: &'a FuncIndex<'a>) -> Result<&'a Node, &'static str> {
    let candidates: Vec<&Value> = match response {
        Value::Null => return Err("missing_uri"),
        Value::Array(items) => items.iter().collect(),
        Value::Object(_) => vec![response],
        _ => return Err("unknown"),
    };
    if candidates.is_empty() {
        return Err("missing_uri");
    }

    let mut last_reason = "unknown";
    for candidate in candidates {
        let Some(obj) = candidate.as_object() else {
            last_reason = "non_dict_location";
            continue;
        };

        let uri_str = obj
            .get("uri")
            .and_then(Value::as_str)
            .or_else(|| obj.get("targetUri").and_then(Value::as_str));
        let Some(uri_str) = uri_str else {
            last_reason = "missing_uri";
            continue;
        };
        let Ok(url) = url::Url::parse(uri_str) else {
            last_reason = "missing_uri";
            continue;
        };
        let Ok(target_path) = url.to_file_path() else {
            last_reason = "missing_uri";
            continue;
        };
        let target_fs_path = target_path.to_string_lossy().to_string();

        let range = obj
            .get("range")
            .or_else(|| obj.get("targetSelectionRange"))
            .or_else(|| obj.get("targetRange"));
        let Some(range) = range else {
            last_reason = "missing_range";
            continue;
        };
        let (Some(line), Some(character)) = (
            range.get("start").and_then(|s| s.get("line")).and_then(Value::as_u64),
            range
                .get("start")
                .and_then(|s| s.get("character"))
                .and_then(Value::as_u64),
        ) else {
            last_reason = "missing_range";
            continue;
        };

        if !func_index.is_indexed(&target_fs_path) {
            last_reason = "target_not_indexed";
            continue;
        }

        match func_index.enclosing(&target_fs_path, line as u32, character as u32) {
            Some(callee) => return Ok(callee),
            None => last_reason = "no_enclosing_func",
        }
    }

    Err(last_reason)
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

fn finish(mut result: CallGraphBuildResult, started: Instant, complete: bool) -> CallGraphBuildResult {
    result.duration_s = started.elapsed().as_secs_f64();
    result.complete = complete;
    tracing::info!(
        complete,
        edges = result.edges,
        considered_files = result.considered_files,
        duration_s = result.duration_s,
        "call-graph build complete"
    );
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use blastradius_core::Node;

    fn func_node(id: &str, fs_path: &str, start: u32, end: u32) -> Node {
        Node {
            id: id.to_string(),
            kind: NodeKind::Func,
            label: id.to_string(),
            fs_path: fs_path.to_string(),
            snippet: None,
            start_line: Some(start),
            start_char: Some(0),
            end_line: Some(end),
            end_char: Some(0),
        }
    }

    #[test]
    fn enclosing_picks_the_innermost_function() {
        let outer = func_node("fn_outer", "a.py", 0, 10);
        let inner = func_node("fn_inner", "a.py", 2, 4);
        let graph = Graph {
            nodes: vec![outer, inner],
            edges: vec![],
            ..Graph::default()
        };
        let idx = FuncIndex::build(&graph);
        let found = idx.enclosing("a.py", 3, 0).unwrap();
        assert_eq!(found.id, "fn_inner");
    }

    #[test]
    fn resolve_callee_reports_target_not_indexed() {
        let graph = Graph::default();
        let idx = FuncIndex::build(&graph);
        let response = serde_json::json!({
            "uri": "file:///nowhere.py",
            "range": {"start": {"line": 0, "character": 0}, "end": {"line": 0, "character": 1}}
        });
        assert_eq!(resolve_callee(&response, &idx), Err("target_not_indexed"));
    }
}
