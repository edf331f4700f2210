//! Ambient configuration: env-overridable knobs plus tunables that are
//! constants in the reference implementation but are exposed here so
//! embedders (and tests) can override them without recompiling.

use std::time::Duration;

fn env_flag(key: &str) -> bool {
    std::env::var(key).map(|v| v == "1").unwrap_or(false)
}

fn env_f64(key: &str) -> Option<f64> {
    std::env::var(key).ok().and_then(|v| v.parse().ok())
}

/// LSP session and request tuning, mirroring the defaults in §4.C.
#[derive(Debug, Clone)]
pub struct LspConfig {
    pub request_timeout: Duration,
    pub request_retries: u32,
    pub retry_backoff: Duration,
    pub session_concurrency: usize,
    pub session_cap: usize,
    pub session_idle_ttl: Duration,
    pub disable_warmup: bool,
    pub warmup_timeout: Duration,
    pub warmup_total_timeout: Duration,
}

impl Default for LspConfig {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(30),
            request_retries: 3,
            retry_backoff: Duration::from_millis(100),
            session_concurrency: 4,
            session_cap: 8,
            session_idle_ttl: Duration::from_secs(300),
            disable_warmup: false,
            warmup_timeout: Duration::from_secs(5),
            warmup_total_timeout: Duration::from_secs(15),
        }
    }
}

impl LspConfig {
    pub fn from_env() -> Self {
        let mut cfg = Self::default();
        cfg.disable_warmup = env_flag("CODECANVAS_DISABLE_LSP_WARMUP");
        if let Some(s) = env_f64("CODECANVAS_LSP_WARMUP_TIMEOUT_S") {
            cfg.warmup_timeout = Duration::from_secs_f64(s);
        }
        if let Some(s) = env_f64("CODECANVAS_LSP_WARMUP_TOTAL_TIMEOUT_S") {
            cfg.warmup_total_timeout = Duration::from_secs_f64(s);
        }
        cfg
    }
}

/// Call-graph builder caps, mirroring `build_call_graph_edges` defaults (§4.F).
#[derive(Debug, Clone)]
pub struct CallGraphConfig {
    pub max_callsites_per_file: usize,
    pub max_callsites_total: usize,
    pub foreground_budget: Duration,
    pub background_budget: Duration,
}

impl Default for CallGraphConfig {
    fn default() -> Self {
        Self {
            max_callsites_per_file: 100,
            max_callsites_total: 500,
            foreground_budget: Duration::from_millis(300),
            background_budget: Duration::from_secs(30),
        }
    }
}

/// Top-level, process-wide configuration.
#[derive(Debug, Clone)]
pub struct BlastradiusConfig {
    /// Overrides workspace-root inference (`CANVAS_PROJECT_DIR`).
    pub project_dir_override: Option<String>,
    /// Overrides the `.codecanvas`-equivalent artifact directory
    /// (`CANVAS_ARTIFACT_DIR`).
    pub artifact_dir_override: Option<String>,
    /// Disables Merkle leaf stat-reuse (`CODECANVAS_MERKLE_ALWAYS_REHASH=1`).
    pub merkle_always_rehash: bool,
    pub lsp: LspConfig,
    pub call_graph: CallGraphConfig,
    /// Artifact/refresh-queue cross-process lock timeout.
    pub artifact_lock_timeout: Duration,
}

impl Default for BlastradiusConfig {
    fn default() -> Self {
        Self {
            project_dir_override: None,
            artifact_dir_override: None,
            merkle_always_rehash: false,
            lsp: LspConfig::default(),
            call_graph: CallGraphConfig::default(),
            artifact_lock_timeout: Duration::from_secs(2),
        }
    }
}

impl BlastradiusConfig {
    pub fn from_env() -> Self {
        Self {
            project_dir_override: std::env::var("CANVAS_PROJECT_DIR").ok().filter(|s| !s.is_empty()),
            artifact_dir_override: std::env::var("CANVAS_ARTIFACT_DIR").ok().filter(|s| !s.is_empty()),
            merkle_always_rehash: env_flag("CODECANVAS_MERKLE_ALWAYS_REHASH"),
            lsp: LspConfig::from_env(),
            call_graph: CallGraphConfig::default(),
            artifact_lock_timeout: Duration::from_secs(2),
        }
    }
}
