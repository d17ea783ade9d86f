//! Error types for loading and searching a clustered index
//!
//! Errors fall into three families: structural (files disagree with the
//! data model), numeric (a vector breaks the finite/unit-norm invariant)
//! and input (the caller passed bad arguments). I/O and cancellation are
//! reported separately since they say nothing about the index itself.

use thiserror::Error;

use crate::index::ManifestError;
use crate::index::source::SourceError;
use crate::vector::{ClusterId, CodecError, VectorError};

/// Coarse classification used for logging and exit codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Structural,
    Numeric,
    Input,
    Io,
    Cancelled,
}

/// Fatal errors while loading an index.
///
/// Anything here means no trustworthy index can be built: the manifest or
/// centroid set is unusable, or the load was abandoned.
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("{0}")]
    Source(#[from] SourceError),

    #[error("Failed to parse manifest '{location}': {source}")]
    ManifestParse {
        location: String,
        source: serde_json::Error,
    },

    #[error("Manifest is invalid: {0}\nSuggestion: Rebuild the index; the manifest does not describe a coherent build")]
    ManifestInvalid(#[from] ManifestError),

    #[error("Failed to parse centroids file '{location}': {source}")]
    CentroidParse {
        location: String,
        source: serde_json::Error,
    },

    #[error("Centroids file has {actual} entries but manifest declares k = {expected}")]
    CentroidCountMismatch { expected: usize, actual: usize },

    #[error(
        "Centroid for cluster {cluster_id} has {actual} components, expected {expected}"
    )]
    CentroidDimensionMismatch {
        cluster_id: ClusterId,
        expected: usize,
        actual: usize,
    },

    #[error("Centroids file lists cluster {cluster_id} more than once")]
    DuplicateCentroid { cluster_id: ClusterId },

    #[error("Centroids file has cluster {cluster_id}, which the manifest does not declare")]
    UndeclaredCentroid { cluster_id: ClusterId },

    #[error("Centroid for cluster {cluster_id} is unusable: {source}")]
    CentroidNumeric {
        cluster_id: ClusterId,
        source: VectorError,
    },

    #[error("Index load was cancelled")]
    Cancelled,
}

impl LoadError {
    /// Stable identifier for programmatic handling.
    pub fn status_code(&self) -> &'static str {
        match self {
            Self::Source(_) => "SOURCE_ERROR",
            Self::ManifestParse { .. } => "MANIFEST_PARSE_ERROR",
            Self::ManifestInvalid(_) => "MANIFEST_INVALID",
            Self::CentroidParse { .. } => "CENTROID_PARSE_ERROR",
            Self::CentroidCountMismatch { .. } => "CENTROID_COUNT_MISMATCH",
            Self::CentroidDimensionMismatch { .. } => "CENTROID_DIMENSION_MISMATCH",
            Self::DuplicateCentroid { .. } => "DUPLICATE_CENTROID",
            Self::UndeclaredCentroid { .. } => "UNDECLARED_CENTROID",
            Self::CentroidNumeric { .. } => "CENTROID_NUMERIC_ERROR",
            Self::Cancelled => "CANCELLED",
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Source(_) => ErrorCategory::Io,
            Self::Cancelled => ErrorCategory::Cancelled,
            Self::CentroidNumeric { source, .. } => source.category(),
            _ => ErrorCategory::Structural,
        }
    }
}

/// Errors confined to a single cluster during loading.
///
/// The loader drops the affected cluster and keeps going.
#[derive(Error, Debug)]
pub enum ClusterLoadError {
    #[error("{0}")]
    Source(#[from] SourceError),

    #[error("Failed to parse metadata file: {0}")]
    MetadataParse(#[source] serde_json::Error),

    #[error("Metadata file has {actual} records but manifest count is {expected}")]
    MetadataCountMismatch { expected: usize, actual: usize },

    #[error("{0}")]
    EmbeddingsSizeMismatch(#[from] CodecError),

    #[error("Cluster load task failed: {0}")]
    Task(String),
}

impl ClusterLoadError {
    pub fn status_code(&self) -> &'static str {
        match self {
            Self::Source(_) => "SOURCE_ERROR",
            Self::MetadataParse(_) => "METADATA_PARSE_ERROR",
            Self::MetadataCountMismatch { .. } => "METADATA_COUNT_MISMATCH",
            Self::EmbeddingsSizeMismatch(_) => "EMBEDDINGS_SIZE_MISMATCH",
            Self::Task(_) => "TASK_FAILED",
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Source(_) | Self::Task(_) => ErrorCategory::Io,
            _ => ErrorCategory::Structural,
        }
    }
}

/// Errors rejecting a single search call.
///
/// A failed search never touches the index.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SearchError {
    #[error(
        "Query dimension mismatch: expected {expected}, got {actual}\nSuggestion: Embed the query with the model the index was built with"
    )]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Invalid search parameter {name} = {value}: must be at least 1")]
    InvalidParameter { name: &'static str, value: usize },

    #[error("Query component {index} is not finite")]
    InvalidQuery { index: usize },
}

impl SearchError {
    pub fn category(&self) -> ErrorCategory {
        ErrorCategory::Input
    }
}
