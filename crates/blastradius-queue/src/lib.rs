//! Persistent refresh queue (§4.I): coordinates incremental rebuilds across
//! processes via `<canvas_dir>/dirty.json` and a claim/ack/reap lifecycle.

pub mod entry;
pub mod store;

pub use entry::{AckOutcome, DirtyEntry, EntryStatus};
pub use store::{DirtyQueue, QueueFile};
