//! In-memory index model.
//!
//! An [`Index`] is assembled once by the loader and is read-only afterwards.
//! It holds no interior mutability, so an `Arc<Index>` can be shared across
//! any number of concurrent searches without locking.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::index::document::DocumentRecord;
use crate::vector::{ClusterId, EmbeddingVector, VectorDimension};

/// One entry of the centroids file as it appears on disk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CentroidRecord {
    pub cluster_id: ClusterId,
    pub centroid: Vec<f32>,
}

/// A cluster's representative vector.
#[derive(Debug, Clone, PartialEq)]
pub struct Centroid {
    pub cluster_id: ClusterId,
    pub vector: EmbeddingVector,
}

/// A document paired with its embedding.
#[derive(Debug, Clone, PartialEq)]
pub struct Member {
    pub record: DocumentRecord,
    pub vector: EmbeddingVector,
}

/// A loaded cluster.
///
/// `members[i]` came from position `i` of both the metadata file and the
/// embeddings file; that order is preserved and used as the tie-break
/// during search.
#[derive(Debug, Clone, PartialEq)]
pub struct Cluster {
    id: ClusterId,
    centroid: EmbeddingVector,
    members: Vec<Member>,
}

impl Cluster {
    #[must_use]
    pub fn new(id: ClusterId, centroid: EmbeddingVector, members: Vec<Member>) -> Self {
        Self {
            id,
            centroid,
            members,
        }
    }

    /// An empty cluster (count 0, owns no files).
    #[must_use]
    pub fn empty(id: ClusterId, centroid: EmbeddingVector) -> Self {
        Self::new(id, centroid, Vec::new())
    }

    #[must_use]
    pub fn id(&self) -> ClusterId {
        self.id
    }

    #[must_use]
    pub fn centroid(&self) -> &EmbeddingVector {
        &self.centroid
    }

    #[must_use]
    pub fn members(&self) -> &[Member] {
        &self.members
    }

    #[must_use]
    pub fn count(&self) -> usize {
        self.members.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

/// Fully materialized, read-only index.
#[derive(Debug, Clone)]
pub struct Index {
    model_id: String,
    dimension: VectorDimension,
    centroids: Vec<Centroid>,
    clusters: BTreeMap<ClusterId, Cluster>,
}

impl Index {
    /// Assembles an index from already-loaded parts.
    ///
    /// `centroids` keeps the order of the centroids file; `clusters` may be a
    /// subset of the centroids when some clusters failed to load.
    #[must_use]
    pub fn new(
        model_id: impl Into<String>,
        dimension: VectorDimension,
        centroids: Vec<Centroid>,
        clusters: impl IntoIterator<Item = Cluster>,
    ) -> Self {
        Self {
            model_id: model_id.into(),
            dimension,
            centroids,
            clusters: clusters.into_iter().map(|c| (c.id(), c)).collect(),
        }
    }

    #[must_use]
    pub fn model_id(&self) -> &str {
        &self.model_id
    }

    #[must_use]
    pub fn dimension(&self) -> VectorDimension {
        self.dimension
    }

    /// Centroids in file order, one per declared cluster.
    #[must_use]
    pub fn centroids(&self) -> &[Centroid] {
        &self.centroids
    }

    /// Loaded clusters keyed by id.
    #[must_use]
    pub fn clusters(&self) -> &BTreeMap<ClusterId, Cluster> {
        &self.clusters
    }

    #[must_use]
    pub fn cluster(&self, id: ClusterId) -> Option<&Cluster> {
        self.clusters.get(&id)
    }

    /// Number of documents across all loaded clusters.
    #[must_use]
    pub fn document_count(&self) -> usize {
        self.clusters.values().map(Cluster::count).sum()
    }

    /// Every loaded member with its cluster id, in cluster then insertion order.
    pub fn members(&self) -> impl Iterator<Item = (ClusterId, &Member)> + '_ {
        self.clusters
            .values()
            .flat_map(|c| c.members().iter().map(move |m| (c.id(), m)))
    }

    /// True when no cluster holds any member.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.clusters.values().all(Cluster::is_empty)
    }
}
