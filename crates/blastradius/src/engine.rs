//! The `Engine` facade (§5, §9): a single `RwLock`-guarded graph behind a
//! small public API, replacing the reference implementation's module-level
//! globals. `init` runs the three-phase parse plus a foreground call-graph
//! pass; a build that doesn't finish in budget continues on a background
//! thread gated by a monotonic `generation` counter and a watchdog timeout.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use blastradius_analyzer::{
    compute_slice, find_similar_symbols, find_target, impact_call_counts, neighborhood, CallCounts, Direction,
    ImpactSlice, Neighborhood, SimilarSymbol,
};
use blastradius_artifact::{
    build_call_edges_file, canvas_dir as resolve_canvas_dir, compute_graph_meta, graph_meta_path,
    load_call_edges_if_current, publish_graph_meta, write_call_edges, GraphMeta,
};
use blastradius_callgraph::{CallGraphBuildResult, CallGraphBuilder};
use blastradius_core::{BlastradiusConfig, Edge, EdgeKind, GraphStats, Language, Node, Result};
use blastradius_graph::Graph;
use blastradius_lsp::{server_registry, SessionManager};
use blastradius_parser::{OrchestratorOptions, ParseSummary, ParserOrchestrator};
use blastradius_queue::{AckOutcome, DirtyEntry, DirtyQueue};
use parking_lot::RwLock;
use tracing::{info, warn};
use uuid::Uuid;

use crate::state::{self, StateFile};

/// Grace period added to `config.call_graph.background_budget` before the
/// watchdog cuts off a background build (§5).
const BACKGROUND_GRACE: Duration = Duration::from_secs(5);

const ALL_LANGUAGES: &[Language] = &[
    Language::Python,
    Language::TypeScript,
    Language::Go,
    Language::Rust,
    Language::Java,
    Language::Ruby,
    Language::C,
    Language::Shell,
    Language::R,
    Language::CSharp,
    Language::Kotlin,
    Language::Dart,
];

fn probed_lsp_langs() -> Vec<Language> {
    ALL_LANGUAGES
        .iter()
        .copied()
        .filter(|l| server_registry::server_command(*l).map(|cmd| server_registry::probe(&cmd)).unwrap_or(false))
        .collect()
}

struct EngineState {
    graph: Graph,
    digest: Option<String>,
    parse_summary: Option<ParseSummary>,
    use_lsp: bool,
    call_graph_summary: Option<CallGraphBuildResult>,
}

impl Default for EngineState {
    fn default() -> Self {
        Self {
            graph: Graph::new(),
            digest: None,
            parse_summary: None,
            use_lsp: false,
            call_graph_summary: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct InitResult {
    pub digest: String,
    pub stats: GraphStats,
    pub parse_summary: ParseSummary,
    pub call_graph_summary: Option<CallGraphBuildResult>,
}

/// Owns the shared graph state and wires the parser, call-graph builder,
/// analyzer, artifact, and queue layers behind one lock (§9).
pub struct Engine {
    project_dir: PathBuf,
    canvas_dir: PathBuf,
    config: BlastradiusConfig,
    instance_id: String,
    generation: Arc<AtomicU64>,
    sessions: RwLock<Option<Arc<SessionManager>>>,
    state: Arc<RwLock<EngineState>>,
    queue: DirtyQueue,
}

impl Engine {
    pub fn new(repo_path: &Path) -> Self {
        let config = BlastradiusConfig::from_env();
        let project_dir = blastradius_core::workspace::find_workspace_root(repo_path, 30);
        let canvas_dir = resolve_canvas_dir(&project_dir, &config);
        let queue = DirtyQueue::new(canvas_dir.clone(), config.artifact_lock_timeout);
        Self {
            project_dir,
            canvas_dir,
            config,
            instance_id: Uuid::new_v4().to_string(),
            generation: Arc::new(AtomicU64::new(0)),
            sessions: RwLock::new(None),
            state: Arc::new(RwLock::new(EngineState::default())),
            queue,
        }
    }

    fn load_existing_meta(&self, digest: &str) -> Option<GraphMeta> {
        let bytes = std::fs::read(graph_meta_path(&self.canvas_dir, digest)).ok()?;
        serde_json::from_slice(&bytes).ok()
    }

    /// Run the full scan + foreground call-graph pass (§4.D, §4.F, §5).
    /// Continues an incomplete call-graph build on a background thread.
    pub fn init(&self, use_lsp: bool) -> Result<InitResult> {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;

        let sessions = if use_lsp {
            Some(Arc::new(SessionManager::new(self.config.lsp.clone())))
        } else {
            None
        };
        *self.sessions.write() = sessions.clone();

        let lsp_langs = if use_lsp { probed_lsp_langs() } else { Vec::new() };

        let options = OrchestratorOptions {
            use_lsp,
            allowed_lsp_langs: None,
            extra_excludes: Vec::new(),
        };
        let mut orch = ParserOrchestrator::new(self.project_dir.clone(), options, &self.config);
        if let Some(sessions) = &sessions {
            orch = orch.with_sessions(sessions);
        }
        let (mut graph, parse_summary) = orch.scan();

        let prior_state = state::read_state(&self.canvas_dir);
        let existing_meta = prior_state.graph_digest.as_deref().and_then(|d| self.load_existing_meta(d));

        let architecture_png = blastradius_artifact::architecture_filename("pending");
        let meta = compute_graph_meta(
            &graph,
            &parse_summary,
            use_lsp,
            &lsp_langs,
            None,
            &architecture_png,
            &self.config,
            existing_meta.as_ref(),
        );
        let digest = meta.digest().to_string();

        if let Err(err) = publish_graph_meta(&self.canvas_dir, &meta, self.config.artifact_lock_timeout) {
            warn!(?err, "failed to publish graph_meta, continuing without it");
        }

        let call_graph_summary = match &sessions {
            Some(sessions) => Some(self.build_call_graph(&mut graph, sessions, generation, &digest)),
            None => None,
        };

        graph.rebuild_indexes();

        {
            let mut state = self.state.write();
            state.graph = graph;
            state.digest = Some(digest.clone());
            state.parse_summary = Some(parse_summary.clone());
            state.use_lsp = use_lsp;
            state.call_graph_summary = call_graph_summary.clone();
        }

        state::write_init_state(&self.canvas_dir, &StateFile {
            schema_version: state::STATE_SCHEMA_VERSION,
            project_path: Some(self.project_dir.to_string_lossy().to_string()),
            use_lsp: Some(use_lsp),
            parse_summary: Some(parse_summary.clone()),
            graph_digest: Some(digest.clone()),
            call_edges_digest: Some(digest.clone()),
            call_graph_summary: call_graph_summary.clone(),
        })?;

        Ok(InitResult {
            digest,
            stats: { self.state.read().graph.stats() },
            parse_summary,
            call_graph_summary,
        })
    }

    /// Reuse a digest-matching `call_edges` cache file, else run a
    /// foreground pass and spawn a background continuation if incomplete.
    fn build_call_graph(
        &self,
        graph: &mut Graph,
        sessions: &Arc<SessionManager>,
        generation: u64,
        digest: &str,
    ) -> CallGraphBuildResult {
        if let Some(cached) = load_call_edges_if_current(&self.canvas_dir, digest) {
            info!(edges = cached.edges.len(), "reusing cached call edges for unchanged digest");
            for record in &cached.edges {
                graph.add_edge(Edge::new(record.from_id.clone(), record.to_id.clone(), EdgeKind::Call));
            }
            return CallGraphBuildResult {
                edges: cached.edges.len(),
                complete: true,
                ..CallGraphBuildResult::default()
            };
        }

        let builder = CallGraphBuilder {
            graph,
            root: &self.project_dir,
            sessions,
            lsp_cfg: self.config.lsp.clone(),
            cfg: self.config.call_graph.clone(),
        };
        let (edges, result) = builder.build(self.config.call_graph.foreground_budget, &|| true);
        for edge in &edges {
            graph.add_edge(edge.clone());
        }

        self.persist_call_edges(generation, digest, &edges);

        if !result.complete {
            self.spawn_background_build(sessions.clone(), generation, digest.to_string());
        }

        result
    }

    fn persist_call_edges(&self, generation: u64, digest: &str, edges: &[Edge]) {
        let project_path = self.project_dir.to_string_lossy().to_string();
        let file = build_call_edges_file(&project_path, generation, &self.instance_id, digest, edges);
        if let Err(err) = write_call_edges(&self.canvas_dir, &file) {
            warn!(?err, "failed to persist call_edges cache");
        }
    }

    /// Spawn the background continuation of an incomplete foreground
    /// call-graph build. A watchdog thread enforces `background_budget` +
    /// grace; the `generation` counter cancels the build if `init` runs
    /// again before it finishes.
    fn spawn_background_build(&self, sessions: Arc<SessionManager>, generation_at_start: u64, digest: String) {
        let state = self.state.clone();
        let generation = self.generation.clone();
        let root = self.project_dir.clone();
        let lsp_cfg = self.config.lsp.clone();
        let cg_cfg = self.config.call_graph.clone();
        let canvas_dir = self.canvas_dir.clone();
        let project_path = self.project_dir.to_string_lossy().to_string();
        let instance_id = self.instance_id.clone();
        let budget = cg_cfg.background_budget;

        thread::spawn(move || {
            let timed_out = Arc::new(AtomicBool::new(false));
            let deadline = Instant::now() + budget + BACKGROUND_GRACE;
            let watchdog_flag = timed_out.clone();
            let watchdog = thread::spawn(move || {
                let now = Instant::now();
                if now < deadline {
                    thread::sleep(deadline - now);
                }
                watchdog_flag.store(true, Ordering::SeqCst);
            });

            let graph_snapshot = state.read().graph.clone();
            let builder = CallGraphBuilder {
                graph: &graph_snapshot,
                root: &root,
                sessions: &sessions,
                lsp_cfg,
                cfg: cg_cfg,
            };
            let should_continue =
                || generation.load(Ordering::SeqCst) == generation_at_start && !timed_out.load(Ordering::SeqCst);
            let (edges, result) = builder.build(budget, &should_continue);

            if generation.load(Ordering::SeqCst) == generation_at_start {
                let mut guard = state.write();
                for edge in &edges {
                    guard.graph.add_edge(edge.clone());
                }
                guard.graph.rebuild_indexes();
                guard.call_graph_summary = Some(result.clone());
                drop(guard);

                let file = build_call_edges_file(&project_path, generation_at_start, &instance_id, &digest, &edges);
                if let Err(err) = write_call_edges(&canvas_dir, &file) {
                    warn!(?err, "failed to persist background call_edges cache");
                }
                if let Err(err) = state::write_call_graph_summary(&canvas_dir, &result) {
                    warn!(?err, "failed to write background call_graph_summary");
                }
            } else {
                info!("background call-graph build superseded by a newer generation, discarding");
            }

            let _ = watchdog.join();
        });
    }

    /// Resolve `query` to a single node (§4.G). Returns an owned clone since
    /// the read lock is released on return.
    pub fn find_target(&self, query: &str) -> Option<Node> {
        find_target(&self.state.read().graph, query).cloned()
    }

    /// Inbound/outbound impact slices for `id`. `depth` is accepted for
    /// interface parity but unused: `compute_slice` is full reachability,
    /// not a hop-bounded walk (see `neighborhood` for that).
    pub fn analyze(&self, id: &str, _depth: usize) -> Option<(ImpactSlice, ImpactSlice)> {
        let state = self.state.read();
        state.graph.get_node(id)?;
        let inbound = compute_slice(&state.graph, id, Direction::In, true, true);
        let outbound = compute_slice(&state.graph, id, Direction::Out, true, true);
        Some((inbound, outbound))
    }

    pub fn neighborhood(&self, id: &str, hops: usize, max_nodes: usize) -> Neighborhood {
        neighborhood(&self.state.read().graph, id, hops, max_nodes)
    }

    pub fn impact_call_counts(&self, id: &str) -> Option<CallCounts> {
        impact_call_counts(&self.state.read().graph, id)
    }

    pub fn find_similar_symbols(&self, query: &str, limit: usize) -> Vec<SimilarSymbol> {
        find_similar_symbols(&self.state.read().graph, query, limit)
    }

    pub fn mark_dirty(&self, paths: &[PathBuf], reason: Option<&str>) -> Result<()> {
        self.queue.mark_dirty(&self.project_dir, paths, reason)
    }

    pub fn claim_dirty(&self, max_items: Option<usize>) -> Result<Vec<DirtyEntry>> {
        self.queue.claim_dirty(max_items)
    }

    pub fn ack_dirty(&self, claim_id: &str, path: &str, outcome: AckOutcome, error: Option<&str>) -> Result<()> {
        self.queue.ack_dirty(claim_id, path, outcome, error)
    }

    pub fn reap_dirty(&self, ttl_s: f64) -> Result<usize> {
        self.queue.reap_dirty(ttl_s)
    }

    pub fn project_dir(&self) -> &Path {
        &self.project_dir
    }

    pub fn canvas_dir(&self) -> &Path {
        &self.canvas_dir
    }

    /// Number of warm LSP sessions, or 0 if the last `init` ran without LSP.
    pub fn session_count(&self) -> usize {
        self.sessions.read().as_ref().map(|s| s.session_count()).unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_without_lsp_builds_a_graph_and_no_call_graph_summary() {
        let dir = tempfile::TempDir::new().unwrap();
        std::fs::write(dir.path().join("a.py"), "def a():\n    return 1\n").unwrap();
        std::fs::create_dir_all(dir.path().join(".git")).unwrap();

        let engine = Engine::new(dir.path());
        let result = engine.init(false).unwrap();

        assert_eq!(result.stats.modules, 1);
        assert!(result.call_graph_summary.is_none());
    }

    #[test]
    fn find_target_resolves_after_init() {
        let dir = tempfile::TempDir::new().unwrap();
        std::fs::write(dir.path().join("a.py"), "def hello():\n    return 1\n").unwrap();
        std::fs::create_dir_all(dir.path().join(".git")).unwrap();

        let engine = Engine::new(dir.path());
        engine.init(false).unwrap();

        let found = engine.find_target("hello");
        assert!(found.is_some());
    }

    #[test]
    fn mark_claim_ack_round_trips_through_the_engine() {
        let dir = tempfile::TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join(".git")).unwrap();
        let file_path = dir.path().join("a.py");
        std::fs::write(&file_path, "x = 1").unwrap();

        let engine = Engine::new(dir.path());
        engine.mark_dirty(&[file_path.clone()], Some("file_changed")).unwrap();
        let claimed = engine.claim_dirty(None).unwrap();
        assert_eq!(claimed.len(), 1);
        let claim_id = claimed[0].claim_id.clone().unwrap();
        engine.ack_dirty(&claim_id, &file_path.to_string_lossy(), AckOutcome::Ok, None).unwrap();
        assert!(engine.claim_dirty(None).unwrap().is_empty());
    }
}
