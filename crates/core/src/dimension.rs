use crate::error::VectorError;

/// Rejects vectors a store cannot hold: empty ones and ones carrying NaN or
/// infinite components.
pub fn validate_embedding(vector: &[f32]) -> Result<(), VectorError> {
    if vector.is_empty() {
        return Err(VectorError::Empty);
    }

    match vector.iter().position(|value| !value.is_finite()) {
        Some(index) => Err(VectorError::NonFinite(index)),
        None => Ok(()),
    }
}

/// Resizes `vector` to exactly `target_dim` values.
///
/// Shorter vectors are right-padded with zeros. Longer vectors are
/// stride-sampled: output `i` takes source index `floor(i * len / target_dim)`.
/// The result is not re-normalized.
pub fn adjust_dimension(vector: Vec<f32>, target_dim: usize) -> Result<Vec<f32>, VectorError> {
    if target_dim == 0 {
        return Err(VectorError::ZeroTarget);
    }
    if vector.is_empty() {
        return Err(VectorError::Empty);
    }

    let original = vector.len();
    if original == target_dim {
        return Ok(vector);
    }

    if original < target_dim {
        let mut padded = vector;
        padded.resize(target_dim, 0.0);
        return Ok(padded);
    }

    Ok((0..target_dim)
        .map(|index| vector[index * original / target_dim])
        .collect())
}
