//! Small pure vector helpers used by the retriever.

/// Element-wise mean of equally sized vectors. Empty input or ragged
/// dimensions yield an empty vector.
pub fn mean_pool(vectors: &[Vec<f32>]) -> Vec<f32> {
    let Some(first) = vectors.first() else {
        return Vec::new();
    };
    let dim = first.len();
    if vectors.iter().any(|v| v.len() != dim) {
        return Vec::new();
    }

    let mut acc = vec![0f32; dim];
    for v in vectors {
        for (slot, x) in acc.iter_mut().zip(v) {
            *slot += x;
        }
    }
    let n = vectors.len() as f32;
    for slot in &mut acc {
        *slot /= n;
    }
    acc
}

/// Scale to unit length. A zero vector stays zero.
pub fn normalize(vec: &mut [f32]) {
    let norm = vec.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > f32::EPSILON {
        for x in vec.iter_mut() {
            *x /= norm;
        }
    }
}

/// Cosine similarity; 0.0 for mismatched or zero-length inputs.
pub fn cosine(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let na: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let nb: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if na <= f32::EPSILON || nb <= f32::EPSILON {
        return 0.0;
    }
    dot / (na * nb)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mean_pool_then_normalize_is_unit_length() {
        let mut pooled = mean_pool(&[vec![1.0, 0.0], vec![0.0, 1.0]]);
        assert_eq!(pooled, vec![0.5, 0.5]);
        normalize(&mut pooled);
        let norm: f32 = pooled.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-6);
    }

    #[test]
    fn cosine_basics() {
        assert!((cosine(&[1.0, 0.0], &[1.0, 0.0]) - 1.0).abs() < 1e-6);
        assert!(cosine(&[1.0, 0.0], &[0.0, 1.0]).abs() < 1e-6);
        assert_eq!(cosine(&[1.0], &[1.0, 2.0]), 0.0);
        assert_eq!(cosine(&[0.0, 0.0], &[1.0, 1.0]), 0.0);
    }
}
