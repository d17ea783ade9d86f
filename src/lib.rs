//! Clustered semantic retrieval index.
//!
//! Loads an IVF-partitioned embedding snapshot (manifest, centroids and
//! per-cluster metadata/embedding files) from disk or HTTP, certifies it,
//! and answers top-N similarity queries with a coarse-to-fine search.

pub mod config;
pub mod display;
pub mod error;
pub mod index;
pub mod io;
pub mod logging;
pub mod retrieve;
pub mod search;
pub mod vector;

// Explicit exports for better API clarity
pub use config::Settings;
pub use error::{ClusterLoadError, ErrorCategory, LoadError, SearchError};
pub use index::{
    ClusterFailure, DocumentMetadata, DocumentRecord, FsSource, HttpSource, Index, IndexLoader,
    IndexSource, IndexValidator, LoadOutcome, Manifest, ValidationReport, open_source,
};
pub use retrieve::{QueryEmbedder, RetrieveError, Retriever};
pub use search::{ClusteredSearchEngine, SearchParams, SearchResult, exact_search, search};
pub use vector::{ClusterId, EmbeddingVector, Score, VectorDimension, VectorError};
