//! Vector similarity.

/// Computes cosine similarity between two vectors.
///
/// Returns values from -1.0 (opposite) to 1.0 (identical), with 0.0 indicating
/// orthogonal vectors. Returns 0.0 for mismatched lengths or zero magnitude.
/// Sums are accumulated in `f64` so very large or very small components
/// neither overflow nor underflow; the result is clamped to `[-1.0, 1.0]`.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }

    let dot_product: f64 = a.iter().zip(b.iter()).map(|(&x, &y)| x as f64 * y as f64).sum();
    let denominator = norm(a) * norm(b);
    if denominator == 0.0 || !denominator.is_finite() {
        return 0.0;
    }

    let similarity = dot_product / denominator;
    if similarity.is_nan() {
        return 0.0;
    }

    similarity.clamp(-1.0, 1.0) as f32
}

/// Euclidean norm of a vector.
pub fn magnitude(v: &[f32]) -> f32 {
    norm(v) as f32
}

fn norm(v: &[f32]) -> f64 {
    v.iter().map(|&x| x as f64 * x as f64).sum::<f64>().sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_cosine_identical_and_orthogonal() {
        let a = vec![1.0, 0.0, 0.0];
        assert_eq!(cosine_similarity(&a, &a), 1.0);

        let a = vec![1.0, 0.0];
        let b = vec![0.0, 1.0];
        assert_eq!(cosine_similarity(&a, &b), 0.0);
    }

    #[test]
    fn test_cosine_opposite() {
        let a = vec![1.0, 0.0];
        let b = vec![-1.0, 0.0];
        assert!((cosine_similarity(&a, &b) + 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_ignores_magnitude() {
        let a = vec![3.0, 4.0];
        let b = vec![6.0, 8.0];
        assert!((cosine_similarity(&a, &b) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_zero_magnitude_is_zero() {
        let zero = vec![0.0, 0.0, 0.0];
        let v = vec![1.0, 2.0, 3.0];
        assert_eq!(cosine_similarity(&zero, &v), 0.0);
        assert_eq!(cosine_similarity(&v, &zero), 0.0);
    }

    #[test]
    fn test_cosine_length_mismatch_is_zero() {
        assert_eq!(cosine_similarity(&[1.0, 0.0], &[1.0, 0.0, 0.0]), 0.0);
    }

    #[test]
    fn test_cosine_extreme_magnitudes_stay_bounded() {
        assert_eq!(cosine_similarity(&[1e20, 0.0], &[1e20, 0.0]), 1.0);
        assert_eq!(cosine_similarity(&[1e-25, 0.0], &[1e-25, 0.0]), 1.0);
        assert_eq!(cosine_similarity(&[-1e20, 0.0], &[1.0, 0.0]), -1.0);
        let s = cosine_similarity(&[f32::MAX, f32::MAX], &[f32::MAX, 0.0]);
        assert!((s - std::f32::consts::FRAC_1_SQRT_2).abs() < 1e-6);
    }

    #[test]
    fn test_magnitude() {
        assert!((magnitude(&[3.0, 4.0]) - 5.0).abs() < 1e-6);
    }

    /// Components spread over many orders of magnitude.
    fn component() -> impl Strategy<Value = f32> {
        (-1.0f32..1.0, -30i32..30).prop_map(|(m, e)| m * 10f32.powi(e))
    }

    fn vector_pair() -> impl Strategy<Value = (Vec<f32>, Vec<f32>)> {
        (1usize..64).prop_flat_map(|dim| {
            (
                prop::collection::vec(component(), dim),
                prop::collection::vec(component(), dim),
            )
        })
    }

    proptest! {
        #[test]
        fn cosine_is_symmetric_and_bounded((a, b) in vector_pair()) {
            prop_assume!(a.iter().any(|x| *x != 0.0) && b.iter().any(|x| *x != 0.0));

            let ab = cosine_similarity(&a, &b);
            let ba = cosine_similarity(&b, &a);

            prop_assert_eq!(ab, ba);
            prop_assert!((-1.0..=1.0).contains(&ab));
        }

        #[test]
        fn cosine_of_vector_with_itself_is_one(a in prop::collection::vec(-100.0f32..100.0, 1..64)) {
            prop_assume!(magnitude(&a) > 1e-3);
            prop_assert!((cosine_similarity(&a, &a) - 1.0).abs() < 1e-4);
        }
    }
}
