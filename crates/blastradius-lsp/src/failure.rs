//! Failure taxonomy surfaced to the parser orchestrator and call-graph
//! builder (§4.C): each LSP failure is classified, counted, and sampled
//! rather than propagated.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LspFailureReason {
    /// The language server binary is not installed.
    MissingServer,
    /// A request exceeded its timeout (all retries included).
    Timeout,
    /// The server returned a malformed or unexpected response.
    ProtocolError,
    Unknown,
}

impl fmt::Display for LspFailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LspFailureReason::MissingServer => "missing_server",
            LspFailureReason::Timeout => "timeout",
            LspFailureReason::ProtocolError => "protocol_error",
            LspFailureReason::Unknown => "unknown",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Clone)]
pub struct LspFailure {
    pub reason: LspFailureReason,
    pub detail: String,
}
