//! Impact analysis over a built [`blastradius_graph::Graph`]: symbol
//! resolution, reachability slices, bounded neighborhoods, call-count
//! aggregation, and fuzzy symbol search (§4.G).

pub mod calls;
pub mod similar;
pub mod slice;
pub mod target;

pub use calls::{impact_call_counts, CallCounts};
pub use similar::{find_similar_symbols, SimilarSymbol};
pub use slice::{compute_slice, neighborhood, Direction, ImpactSlice, Neighborhood};
pub use target::find_target;
