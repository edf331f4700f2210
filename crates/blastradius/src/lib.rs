//! blastradius: a static impact-analysis engine (§5, §9).
//!
//! [`Engine`] is the facade an embedder drives: `init` walks a repository
//! and builds the code graph (§4.B-F), then `find_target`/`analyze`/
//! `neighborhood`/`impact_call_counts` answer impact questions over it
//! (§4.G), and `mark_dirty`/`claim_dirty`/`ack_dirty`/`reap_dirty` coordinate
//! incremental refresh across processes (§4.I).

pub mod engine;
pub mod state;

pub use engine::{Engine, InitResult};
