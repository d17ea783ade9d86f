//! Nearest-neighbour search over a loaded [`Index`](crate::index::Index).

mod engine;
mod types;

pub use engine::{ClusteredSearchEngine, exact_search, search};
pub use types::{SearchParams, SearchResult};
