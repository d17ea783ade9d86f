//! Vector primitives for the clustered retrieval index.
//!
//! # Architecture
//! Embeddings are fixed-dimension, L2-normalized `f32` vectors. They are
//! persisted per cluster as flat little-endian buffers (see [`codec`]) and
//! compared with plain dot products, which equal cosine similarity for
//! unit-length inputs.

pub mod codec;
mod math;
mod types;

pub use codec::CodecError;
pub use math::{dot_product, l2_norm, normalized};
pub use types::{
    ClusterId, EmbeddingVector, MAX_VECTOR_DIMENSION, NORM_TOLERANCE, Score, VECTOR_DIMENSION_384, VectorDimension,
    VectorError, check_numeric,
};
