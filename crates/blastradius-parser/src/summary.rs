//! Parse summary (§4.D): counts of parsed/skipped files, backend choice,
//! and sampled failures, aggregated as data rather than propagated (§7).

use std::collections::HashMap;

use blastradius_core::Language;
use blastradius_lsp::LspFailureReason;
use serde::{Deserialize, Serialize};

const SAMPLE_CAP: usize = 5;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkipSample {
    pub path: String,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FallbackSample {
    pub path: String,
    pub reason: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ParseSummary {
    pub files_seen: usize,
    pub files_parsed: usize,
    pub files_skipped: usize,
    pub lsp_files: usize,
    pub tree_sitter_files: usize,
    pub languages: HashMap<String, usize>,
    pub failure_counts: HashMap<String, usize>,
    pub skip_samples: Vec<SkipSample>,
    pub fallback_samples: Vec<FallbackSample>,
}

impl ParseSummary {
    pub fn record_language(&mut self, language: Language) {
        *self.languages.entry(language.key().to_string()).or_insert(0) += 1;
    }

    pub fn record_skip(&mut self, path: &str, reason: &str) {
        self.files_skipped += 1;
        if self.skip_samples.len() < SAMPLE_CAP {
            self.skip_samples.push(SkipSample {
                path: path.to_string(),
                reason: reason.to_string(),
            });
        }
    }

    pub fn record_lsp_failure(&mut self, path: &str, reason: LspFailureReason) {
        *self.failure_counts.entry(reason.to_string()).or_insert(0) += 1;
        if self.fallback_samples.len() < SAMPLE_CAP {
            self.fallback_samples.push(FallbackSample {
                path: path.to_string(),
                reason: reason.to_string(),
            });
        }
    }
}
