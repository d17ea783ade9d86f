//! Retrieval entry point: text query -> embedding -> ranked documents.
//!
//! The embedding model and answer generation live outside this crate. This
//! module only fixes the contract between them and the search engine: the
//! embedder returns a unit-length vector of the index's dimension, and the
//! caller receives the ranked [`SearchResult`] list unchanged.

use thiserror::Error;
use tracing::debug;

use crate::error::SearchError;
use crate::search::{ClusteredSearchEngine, SearchParams, SearchResult};
use crate::vector::{VectorDimension, VectorError};

/// Produces query embeddings.
///
/// Implementations must return L2-normalized vectors of `dimension()`
/// components; the search engine does not re-normalize.
pub trait QueryEmbedder: Send + Sync {
    fn embed(&self, text: &str) -> Result<Vec<f32>, VectorError>;

    fn dimension(&self) -> VectorDimension;
}

#[derive(Error, Debug)]
pub enum RetrieveError {
    #[error("Query text is empty")]
    EmptyQuery,

    #[error(
        "Embedder produces {embedder}-dimensional vectors but the index uses {index}\nSuggestion: Use the embedding model named in the index manifest"
    )]
    ModelMismatch { embedder: usize, index: usize },

    #[error("{0}")]
    Embedding(#[from] VectorError),

    #[error("{0}")]
    Search(#[from] SearchError),
}

/// Couples an embedder with a search engine and fixed search parameters.
#[derive(Debug, Clone)]
pub struct Retriever<E> {
    embedder: E,
    engine: ClusteredSearchEngine,
    params: SearchParams,
}

impl<E: QueryEmbedder> Retriever<E> {
    /// Creates a retriever, checking that embedder and index agree on dimension.
    pub fn new(
        embedder: E,
        engine: ClusteredSearchEngine,
        params: SearchParams,
    ) -> Result<Self, RetrieveError> {
        let index_dim = engine.index().dimension();
        if embedder.dimension() != index_dim {
            return Err(RetrieveError::ModelMismatch {
                embedder: embedder.dimension().get(),
                index: index_dim.get(),
            });
        }
        Ok(Self {
            embedder,
            engine,
            params,
        })
    }

    #[must_use]
    pub fn params(&self) -> &SearchParams {
        &self.params
    }

    /// Embeds `text` and returns the ranked documents for it.
    pub fn retrieve(&self, text: &str) -> Result<Vec<SearchResult>, RetrieveError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(RetrieveError::EmptyQuery);
        }

        let query = self.embedder.embed(text)?;
        let results = self.engine.search(&query, &self.params)?;
        debug!("Retrieved {} results for query", results.len());
        Ok(results)
    }
}
