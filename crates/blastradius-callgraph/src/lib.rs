//! Call-graph builder (§4.F): joins tree-sitter call sites with LSP
//! `definition` lookups under a time budget and bounded concurrency,
//! without mutating the live graph.

pub mod builder;
pub mod result;

pub use builder::CallGraphBuilder;
pub use result::CallGraphBuildResult;
