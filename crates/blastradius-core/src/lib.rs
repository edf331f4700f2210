//! Shared types, error handling, configuration, and workspace detection for
//! the blastradius impact-analysis engine.

pub mod config;
pub mod error;
pub mod ids;
pub mod language;
pub mod types;
pub mod workspace;

pub use config::{BlastradiusConfig, CallGraphConfig, LspConfig};
pub use error::{BlastradiusError, Result};
pub use ids::{make_class_id, make_func_id, make_module_id};
pub use language::Language;
pub use types::{Edge, EdgeKind, GraphStats, Node, NodeKind};
