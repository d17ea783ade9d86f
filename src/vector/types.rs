//! Type-safe wrappers and core types for the vector layer.
//!
//! Newtypes here keep cluster ids, dimensions and similarity scores from
//! being mixed up with plain integers and floats across the loader,
//! validator and search engine.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::ErrorCategory;
use crate::vector::math::l2_norm;

/// Standard vector dimension for the MiniLM family of sentence embedders.
pub const VECTOR_DIMENSION_384: usize = 384;

/// Maximum allowed deviation of a vector's L2 norm from 1.0.
pub const NORM_TOLERANCE: f32 = 1e-5;

/// Largest dimension whose per-vector byte length fits in `usize`.
pub const MAX_VECTOR_DIMENSION: usize = usize::MAX / std::mem::size_of::<f32>();

/// Identifier of a cluster inside one index build.
///
/// Cluster ids start at zero, so unlike symbol ids this is a plain `u32`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct ClusterId(u32);

impl ClusterId {
    /// Creates a new `ClusterId`.
    #[must_use]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// Returns the underlying u32 value.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

impl std::fmt::Display for ClusterId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Type-safe wrapper for vector dimensions.
///
/// Guarantees a non-zero dimension so every length check downstream can
/// rely on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VectorDimension(usize);

impl VectorDimension {
    /// Creates a new `VectorDimension` with validation.
    ///
    /// Returns an error if the dimension is zero or too large to address.
    pub fn new(dim: usize) -> Result<Self, VectorError> {
        if dim == 0 {
            return Err(VectorError::InvalidDimension {
                dimension: 0,
                reason: "Vector dimension cannot be zero",
            });
        }
        if dim > MAX_VECTOR_DIMENSION {
            return Err(VectorError::InvalidDimension {
                dimension: dim,
                reason: "Vector byte length overflows usize",
            });
        }
        Ok(Self(dim))
    }

    /// Creates a standard 384-dimensional vector dimension.
    #[must_use]
    pub const fn dimension_384() -> Self {
        Self(VECTOR_DIMENSION_384)
    }

    /// Returns the underlying dimension value.
    #[must_use]
    pub const fn get(&self) -> usize {
        self.0
    }

    /// Number of bytes one vector of this dimension occupies on disk.
    ///
    /// Cannot overflow: `new` caps the dimension at [`MAX_VECTOR_DIMENSION`].
    #[must_use]
    pub const fn byte_len(&self) -> usize {
        self.0 * std::mem::size_of::<f32>()
    }

    /// Validates that a vector has the expected dimension.
    pub fn validate_vector(&self, vector: &[f32]) -> Result<(), VectorError> {
        if vector.len() != self.0 {
            return Err(VectorError::DimensionMismatch {
                expected: self.0,
                actual: vector.len(),
            });
        }
        Ok(())
    }
}

impl std::fmt::Display for VectorDimension {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A fixed-length embedding vector.
///
/// The components are immutable once constructed. [`EmbeddingVector::try_new`]
/// enforces the full numeric invariant (finite, unit length); the loader
/// uses [`EmbeddingVector::from_components`] because numeric certification
/// is the validator's job, not the loader's.
#[derive(Debug, Clone, PartialEq)]
pub struct EmbeddingVector(Box<[f32]>);

impl EmbeddingVector {
    /// Creates a vector after checking dimension, finiteness and unit norm.
    pub fn try_new(
        components: Vec<f32>,
        dimension: VectorDimension,
    ) -> Result<Self, VectorError> {
        dimension.validate_vector(&components)?;
        let vector = Self(components.into_boxed_slice());
        vector.check_numeric()?;
        Ok(vector)
    }

    /// Wraps components without numeric checks.
    #[must_use]
    pub fn from_components(components: Vec<f32>) -> Self {
        Self(components.into_boxed_slice())
    }

    /// Returns the components as a slice.
    #[must_use]
    pub fn as_slice(&self) -> &[f32] {
        &self.0
    }

    /// Number of components.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Euclidean length of the vector.
    #[must_use]
    pub fn norm(&self) -> f32 {
        l2_norm(&self.0)
    }

    /// Checks that every component is finite and that the vector is unit length.
    pub fn check_numeric(&self) -> Result<(), VectorError> {
        check_numeric(&self.0)
    }
}

impl AsRef<[f32]> for EmbeddingVector {
    fn as_ref(&self) -> &[f32] {
        &self.0
    }
}

/// Checks a raw component slice against the numeric invariant.
///
/// NaN/Inf is reported before the norm check, since a non-finite component
/// makes the norm meaningless.
pub fn check_numeric(components: &[f32]) -> Result<(), VectorError> {
    if let Some(index) = components.iter().position(|v| !v.is_finite()) {
        return Err(VectorError::NonFinite {
            index,
            value: components[index],
        });
    }
    let norm = l2_norm(components);
    if (norm - 1.0).abs() > NORM_TOLERANCE {
        return Err(VectorError::NotNormalized { norm });
    }
    Ok(())
}

/// Cosine similarity score.
///
/// Scores live in [-1.0, 1.0] where 1.0 means identical direction.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Score(f32);

impl Score {
    /// Creates a new `Score` with validation.
    ///
    /// Returns an error if the score is NaN or outside [-1.0, 1.0].
    pub fn new(value: f32) -> Result<Self, VectorError> {
        if value.is_nan() {
            return Err(VectorError::InvalidScore {
                value,
                reason: "Score cannot be NaN",
            });
        }
        if !(-1.0..=1.0).contains(&value) {
            return Err(VectorError::InvalidScore {
                value,
                reason: "Score must be in range [-1.0, 1.0]",
            });
        }
        Ok(Self(value))
    }

    /// Converts a raw dot product into a score.
    ///
    /// Rounding on unit vectors can push a dot product marginally past
    /// +/-1.0, so finite values are clamped. Returns `None` for NaN/Inf.
    #[must_use]
    pub fn from_similarity(value: f32) -> Option<Self> {
        value.is_finite().then(|| Self(value.clamp(-1.0, 1.0)))
    }

    /// Returns the underlying f32 value.
    #[must_use]
    pub const fn get(&self) -> f32 {
        self.0
    }
}

impl Eq for Score {}

impl PartialOrd for Score {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Score {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.0.total_cmp(&other.0)
    }
}

/// Errors that can occur during vector operations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum VectorError {
    #[error(
        "Vector dimension mismatch: expected {expected}, got {actual}\nSuggestion: Ensure all vectors use the same embedding model"
    )]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Invalid vector dimension: {dimension}\nReason: {reason}")]
    InvalidDimension {
        dimension: usize,
        reason: &'static str,
    },

    #[error(
        "Non-finite component {value} at position {index}\nSuggestion: Regenerate the embedding; the model output is corrupted"
    )]
    NonFinite { index: usize, value: f32 },

    #[error(
        "Vector is not unit length (norm {norm})\nSuggestion: L2-normalize embeddings before writing the index"
    )]
    NotNormalized { norm: f32 },

    #[error("Invalid score value: {value}\nReason: {reason}")]
    InvalidScore { value: f32, reason: &'static str },

    #[error(
        "Embedding generation failed: {0}\nSuggestion: Verify the embedding model is properly initialized"
    )]
    EmbeddingFailed(String),
}

impl VectorError {
    /// NaN/Inf and norm failures are numeric; shape problems are structural.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::NonFinite { .. } | Self::NotNormalized { .. } | Self::InvalidScore { .. } => {
                ErrorCategory::Numeric
            }
            Self::DimensionMismatch { .. } | Self::InvalidDimension { .. } => {
                ErrorCategory::Structural
            }
            Self::EmbeddingFailed(_) => ErrorCategory::Io,
        }
    }
}
