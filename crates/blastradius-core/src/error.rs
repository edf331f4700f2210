use thiserror::Error;

/// Crate-wide error type.
///
/// Per the error-handling design, only catastrophic, top-level failures
/// (missing project root, unwritable artifact directory, a caller-requested
/// load of a corrupt `graph_meta.json`) are ever propagated through this
/// type. Per-file and per-LSP failures are aggregated as data (see
/// `ParseSummary` in `blastradius-parser` and `CallGraphBuildResult` in
/// `blastradius-callgraph`) rather than raised.
#[derive(Error, Debug)]
pub enum BlastradiusError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("parse error: {0}")]
    Parse(String),

    #[error("graph error: {0}")]
    Graph(String),

    #[error("node not found: {0}")]
    NodeNotFound(String),

    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("LSP error: {0}")]
    Lsp(String),

    #[error("operation timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("not found: {0}")]
    NotFound(String),
}

pub type Result<T> = std::result::Result<T, BlastradiusError>;
