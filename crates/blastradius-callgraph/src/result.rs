//! The structured result summary a call-graph build emits instead of
//! raising (§4.F, §7: failures are aggregated as data).

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CallGraphBuildResult {
    pub considered_files: usize,
    pub processed_callsites: usize,
    pub resolved_callsites: usize,
    pub skipped_no_caller: usize,
    pub skipped_no_definition: usize,
    pub skipped_no_callee: usize,
    pub skipped_no_callee_reasons: HashMap<String, usize>,
    pub edges: usize,
    pub lsp_failures: HashMap<String, usize>,
    pub duration_s: f64,
    /// `true` if the build finished all considered files within budget,
    /// `false` if it stopped early on the time budget, the total call-site
    /// cap, or a `should_continue` cancellation.
    pub complete: bool,
}

impl CallGraphBuildResult {
    pub fn record_no_callee(&mut self, reason: &str) {
        self.skipped_no_callee += 1;
        *self.skipped_no_callee_reasons.entry(reason.to_string()).or_insert(0) += 1;
    }

    pub fn record_lsp_failure(&mut self, reason: &str) {
        *self.lsp_failures.entry(reason.to_string()).or_insert(0) += 1;
    }
}
