//! Search parameters and result types.

use serde::Serialize;

use crate::config::SearchConfig;
use crate::error::SearchError;
use crate::index::DocumentMetadata;
use crate::vector::{ClusterId, Score};

/// Tuning knobs for the coarse-to-fine search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchParams {
    top_m_clusters: usize,
    top_k_per_cluster: usize,
    final_top_n: usize,
}

impl SearchParams {
    /// Creates parameters, rejecting any value below 1.
    pub fn new(
        top_m_clusters: usize,
        top_k_per_cluster: usize,
        final_top_n: usize,
    ) -> Result<Self, SearchError> {
        for (name, value) in [
            ("top_m_clusters", top_m_clusters),
            ("top_k_per_cluster", top_k_per_cluster),
            ("final_top_n", final_top_n),
        ] {
            if value < 1 {
                return Err(SearchError::InvalidParameter { name, value });
            }
        }
        Ok(Self {
            top_m_clusters,
            top_k_per_cluster,
            final_top_n,
        })
    }

    pub fn from_config(config: &SearchConfig) -> Result<Self, SearchError> {
        Self::new(
            config.top_m_clusters,
            config.top_k_per_cluster,
            config.final_top_n,
        )
    }

    /// Number of clusters scanned in the fine stage.
    #[must_use]
    pub fn top_m_clusters(&self) -> usize {
        self.top_m_clusters
    }

    #[must_use]
    pub fn top_k_per_cluster(&self) -> usize {
        self.top_k_per_cluster
    }

    #[must_use]
    pub fn final_top_n(&self) -> usize {
        self.final_top_n
    }
}

impl Default for SearchParams {
    fn default() -> Self {
        let config = SearchConfig::default();
        Self {
            top_m_clusters: config.top_m_clusters,
            top_k_per_cluster: config.top_k_per_cluster,
            final_top_n: config.final_top_n,
        }
    }
}

/// One ranked hit.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResult {
    pub id: String,
    pub text: String,
    pub metadata: DocumentMetadata,
    /// Cosine similarity in [-1.0, 1.0]
    pub score: Score,
    pub cluster_id: ClusterId,
}
