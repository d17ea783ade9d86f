//! Manifest model describing one index build.
//!
//! The manifest is the authoritative description of the files that make up
//! an index: model, dimensionality, cluster count and one entry per cluster.
//! Structural validation never coerces a bad value; every violation maps to
//! a named [`ManifestError`] variant pointing at the offending field.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::vector::{ClusterId, VectorDimension};

/// Structural description of one index build (`manifest.json`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    /// Identifier of the embedding model that produced every vector
    pub model_id: String,

    pub dimensions: usize,

    /// Declared cluster count
    pub k: usize,

    pub cluster_algorithm_tag: String,

    /// Reference to the centroids JSON file, relative to the manifest
    pub centroids_file_ref: String,

    pub clusters: Vec<ClusterManifestEntry>,
}

/// One cluster's entry in the manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterManifestEntry {
    pub cluster_id: ClusterId,
    pub count: usize,
    pub embeddings_file_ref: Option<String>,
    pub metadata_file_ref: Option<String>,
}

impl ClusterManifestEntry {
    /// True when the entry owns no members (and therefore no files).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Both file references, when present and non-blank.
    #[must_use]
    pub fn file_refs(&self) -> Option<(&str, &str)> {
        match (
            non_blank(self.embeddings_file_ref.as_deref()),
            non_blank(self.metadata_file_ref.as_deref()),
        ) {
            (Some(embeddings), Some(metadata)) => Some((embeddings, metadata)),
            _ => None,
        }
    }

    fn has_any_file_ref(&self) -> bool {
        self.embeddings_file_ref.is_some() || self.metadata_file_ref.is_some()
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.filter(|s| !s.trim().is_empty())
}

/// Structural manifest violations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ManifestError {
    #[error("manifest.dimensions must be greater than 0")]
    ZeroDimensions,

    #[error("manifest.dimensions = {dimensions} is too large to address")]
    DimensionTooLarge { dimensions: usize },

    #[error("manifest.k must be greater than 0")]
    ZeroClusterCount,

    #[error("manifest.clusters has {actual} entries but k = {expected}")]
    ClusterCountMismatch { expected: usize, actual: usize },

    #[error("manifest.centroidsFileRef must not be empty")]
    EmptyCentroidsRef,

    #[error("manifest.clusters[{position}] (cluster {cluster_id}) has count 0 but references files")]
    EmptyClusterHasFiles {
        position: usize,
        cluster_id: ClusterId,
    },

    #[error(
        "manifest.clusters[{position}] (cluster {cluster_id}) has count {count} but is missing embeddingsFileRef or metadataFileRef"
    )]
    NonEmptyClusterMissingFiles {
        position: usize,
        cluster_id: ClusterId,
        count: usize,
    },

    #[error("manifest.clusters[{position}] repeats cluster id {cluster_id}")]
    DuplicateClusterId {
        position: usize,
        cluster_id: ClusterId,
    },
}

impl Manifest {
    /// Parses a manifest from raw JSON bytes.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(bytes)
    }

    /// Validated vector dimension.
    pub fn dimension(&self) -> Result<VectorDimension, ManifestError> {
        VectorDimension::new(self.dimensions).map_err(|_| match self.dimensions {
            0 => ManifestError::ZeroDimensions,
            dimensions => ManifestError::DimensionTooLarge { dimensions },
        })
    }

    /// Total number of documents declared across all clusters.
    #[must_use]
    pub fn document_count(&self) -> usize {
        self.clusters
            .iter()
            .fold(0usize, |total, c| total.saturating_add(c.count))
    }

    /// Checks the structural invariants, failing on the first violation.
    pub fn validate(&self) -> Result<(), ManifestError> {
        match self.violations().into_iter().next() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// Collects every structural violation, in field order.
    #[must_use]
    pub fn violations(&self) -> Vec<ManifestError> {
        let mut errors = Vec::new();

        if let Err(e) = self.dimension() {
            errors.push(e);
        }
        if self.k == 0 {
            errors.push(ManifestError::ZeroClusterCount);
        }
        if self.clusters.len() != self.k {
            errors.push(ManifestError::ClusterCountMismatch {
                expected: self.k,
                actual: self.clusters.len(),
            });
        }
        if self.centroids_file_ref.trim().is_empty() {
            errors.push(ManifestError::EmptyCentroidsRef);
        }

        let mut seen = HashSet::with_capacity(self.clusters.len());
        for (position, entry) in self.clusters.iter().enumerate() {
            if !seen.insert(entry.cluster_id) {
                errors.push(ManifestError::DuplicateClusterId {
                    position,
                    cluster_id: entry.cluster_id,
                });
            }
            if entry.is_empty() {
                if entry.has_any_file_ref() {
                    errors.push(ManifestError::EmptyClusterHasFiles {
                        position,
                        cluster_id: entry.cluster_id,
                    });
                }
            } else if entry.file_refs().is_none() {
                errors.push(ManifestError::NonEmptyClusterMissingFiles {
                    position,
                    cluster_id: entry.cluster_id,
                    count: entry.count,
                });
            }
        }

        errors
    }
}

/// Checks a manifest's structural invariants.
pub fn validate_manifest(manifest: &Manifest) -> Result<(), ManifestError> {
    manifest.validate()
}
