//! Tree-sitter backend and parser orchestrator (§4.B, §4.D).
//!
//! [`orchestrator::ParserOrchestrator`] is the entry point: it walks a scan
//! root, chooses a backend (LSP `documentSymbol`, tree-sitter, or regex)
//! per file, and emits a `blastradius_graph::Graph` plus a
//! [`summary::ParseSummary`].

pub mod extractor;
pub mod file_collect;
pub mod import_resolve;
pub mod labels;
pub mod language_registry;
pub mod languages;
pub mod lsp_symbols;
pub mod orchestrator;
pub mod regex_imports;
pub mod summary;

pub use extractor::{CallSite, Definition, ExtractionResult, ImportSpec, LanguageExtractor, ParsedFile};
pub use labels::module_label;
pub use orchestrator::{OrchestratorOptions, ParserOrchestrator};
pub use summary::ParseSummary;
