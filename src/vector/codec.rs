//! Flat binary codec for per-cluster embedding files.
//!
//! # Format
//!
//! Vectors are stored back to back, row-major, with no header:
//! - vector `i` starts at byte offset `i * dimension * 4`
//! - each component is an IEEE-754 `f32` in little-endian byte order
//!
//! The file therefore carries no self-description; the vector count and
//! dimension come from the manifest and the byte length must agree with
//! both.

use thiserror::Error;

use crate::vector::types::{EmbeddingVector, VectorDimension};

/// Number of bytes per f32 value.
const BYTES_PER_F32: usize = std::mem::size_of::<f32>();

/// Errors produced while decoding an embeddings buffer.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    #[error(
        "Embeddings buffer size mismatch: expected {expected} bytes ({count} vectors x {dimension} dims x 4), got {actual}\nSuggestion: The embeddings file is truncated or belongs to a different build"
    )]
    SizeMismatch {
        expected: usize,
        actual: usize,
        count: usize,
        dimension: usize,
    },

    #[error(
        "Embeddings buffer for {count} vectors x {dimension} dims overflows the address space\nSuggestion: The manifest declares an impossible vector count"
    )]
    SizeOverflow { count: usize, dimension: usize },
}

/// Expected byte length of a buffer holding `count` vectors, or `None` on overflow.
#[must_use]
pub fn expected_byte_len(count: usize, dimension: VectorDimension) -> Option<usize> {
    count.checked_mul(dimension.byte_len())
}

/// Checks a buffer's byte length against the expected vector count and dimension.
pub fn check_size(
    buffer: &[u8],
    count: usize,
    dimension: VectorDimension,
) -> Result<(), CodecError> {
    let expected =
        expected_byte_len(count, dimension).ok_or(CodecError::SizeOverflow {
            count,
            dimension: dimension.get(),
        })?;
    if buffer.len() != expected {
        return Err(CodecError::SizeMismatch {
            expected,
            actual: buffer.len(),
            count,
            dimension: dimension.get(),
        });
    }
    Ok(())
}

/// Serializes vectors into a flat little-endian buffer.
pub fn encode<V: AsRef<[f32]>>(vectors: &[V]) -> Vec<u8> {
    let total: usize = vectors.iter().map(|v| v.as_ref().len()).sum();
    let mut buffer = Vec::with_capacity(total * BYTES_PER_F32);
    for vector in vectors {
        for &value in vector.as_ref() {
            buffer.extend_from_slice(&value.to_le_bytes());
        }
    }
    buffer
}

/// Decodes a flat buffer into raw component rows.
///
/// Fails with [`CodecError::SizeMismatch`] unless the buffer holds exactly
/// `count` vectors of `dimension` components.
pub fn decode_rows(
    buffer: &[u8],
    count: usize,
    dimension: VectorDimension,
) -> Result<Vec<Vec<f32>>, CodecError> {
    check_size(buffer, count, dimension)?;

    let rows = buffer
        .chunks_exact(dimension.byte_len())
        .map(|row| {
            row.chunks_exact(BYTES_PER_F32)
                .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
                .collect()
        })
        .collect();

    Ok(rows)
}

/// Decodes a flat buffer into embedding vectors.
///
/// Only the structural size check is applied; numeric invariants are not.
pub fn decode(
    buffer: &[u8],
    count: usize,
    dimension: VectorDimension,
) -> Result<Vec<EmbeddingVector>, CodecError> {
    Ok(decode_rows(buffer, count, dimension)?
        .into_iter()
        .map(EmbeddingVector::from_components)
        .collect())
}
