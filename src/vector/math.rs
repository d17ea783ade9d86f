//! Small numeric helpers shared by the search engine and the validator.

/// Computes the dot product of two equal-length vectors.
///
/// For unit-length inputs this is the cosine similarity.
#[inline]
pub fn dot_product(a: &[f32], b: &[f32]) -> f32 {
    debug_assert_eq!(a.len(), b.len(), "Vectors must have same dimension");
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

/// Euclidean (L2) length of a vector.
#[inline]
pub fn l2_norm(vector: &[f32]) -> f32 {
    vector.iter().map(|x| x * x).sum::<f32>().sqrt()
}

/// Returns a unit-length copy of `vector`.
///
/// Zero vectors come back unchanged.
#[must_use]
pub fn normalized(vector: &[f32]) -> Vec<f32> {
    let norm = l2_norm(vector);
    if norm > 0.0 {
        vector.iter().map(|value| value / norm).collect()
    } else {
        vector.to_vec()
    }
}
