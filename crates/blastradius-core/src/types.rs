use serde::{Deserialize, Serialize};
use std::fmt;

/// The three kinds of node the code graph distinguishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    Module,
    Class,
    Func,
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            NodeKind::Module => "module",
            NodeKind::Class => "class",
            NodeKind::Func => "func",
        };
        write!(f, "{s}")
    }
}

/// The three kinds of edge the code graph distinguishes.
///
/// `Import` runs module -> module, `Call` runs func -> func, `Contains` runs
/// container (module|class) -> member (class|func).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EdgeKind {
    Import,
    Call,
    Contains,
}

impl fmt::Display for EdgeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            EdgeKind::Import => "import",
            EdgeKind::Call => "call",
            EdgeKind::Contains => "contains",
        };
        write!(f, "{s}")
    }
}

/// An immutable node in the code graph.
///
/// IDs are deterministic and stable across runs for a given
/// label+name+start-line (see `ids.rs`); `label` is the human-facing display
/// name used to disambiguate in the rare case of an FNV-1a collision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: String,
    pub kind: NodeKind,
    pub label: String,
    pub fs_path: String,
    pub snippet: Option<String>,
    pub start_line: Option<u32>,
    pub start_char: Option<u32>,
    pub end_line: Option<u32>,
    pub end_char: Option<u32>,
}

impl Node {
    pub fn module(id: impl Into<String>, label: impl Into<String>, fs_path: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind: NodeKind::Module,
            label: label.into(),
            fs_path: fs_path.into(),
            snippet: None,
            start_line: None,
            start_char: None,
            end_line: None,
            end_char: None,
        }
    }

    /// `true` if `(line, char)` falls within `[start, end)`, inclusive of the
    /// start/end character bounds on the boundary lines. Nodes without a
    /// range never contain anything (used by the call-graph builder to skip
    /// LSP-only or range-less nodes when resolving enclosing functions).
    pub fn contains_pos(&self, line: u32, char: u32) -> bool {
        let (Some(start_line), Some(end_line)) = (self.start_line, self.end_line) else {
            return false;
        };
        if line < start_line || line > end_line {
            return false;
        }
        if line == start_line {
            if let Some(start_char) = self.start_char {
                if char < start_char {
                    return false;
                }
            }
        }
        if line == end_line {
            if let Some(end_char) = self.end_char {
                if char > end_char {
                    return false;
                }
            }
        }
        true
    }
}

/// An edge in the code graph. Deduplicated by `key()`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Edge {
    pub from_id: String,
    pub to_id: String,
    pub kind: EdgeKind,
}

impl Edge {
    pub fn new(from_id: impl Into<String>, to_id: impl Into<String>, kind: EdgeKind) -> Self {
        Self {
            from_id: from_id.into(),
            to_id: to_id.into(),
            kind,
        }
    }

    /// Unique key for dedup: `"{from}->{to}:{kind}"`.
    pub fn key(&self) -> String {
        format!("{}->{}:{}", self.from_id, self.to_id, self.kind)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GraphStats {
    pub modules: usize,
    pub classes: usize,
    pub funcs: usize,
    pub import_edges: usize,
    pub call_edges: usize,
    pub contains_edges: usize,
}
