use wide::f64x4;

use crate::error::{KnnError, Result};
use crate::NormalizedFeature;

const LANES: usize = 4;

// Euclidean distance between two normalized feature vectors.
// Both vectors must be non-empty and of equal length.
pub fn euclidean_distance(a: &[NormalizedFeature], b: &[NormalizedFeature]) -> Result<f64> {
    check_dimensions(a.len(), b.len())?;
    Ok(squared_euclidean_distance(a, b).sqrt())
}

pub(crate) fn check_dimensions(expected: usize, actual: usize) -> Result<()> {
    if expected == 0 || actual == 0 {
        return Err(KnnError::EmptyFeatureVector);
    }
    if expected != actual {
        return Err(KnnError::DimensionMismatch { expected, actual });
    }
    Ok(())
}

// Sum of squared differences, four lanes at a time. Lengths are checked by the caller.
#[inline]
pub(crate) fn squared_euclidean_distance(a: &[NormalizedFeature], b: &[NormalizedFeature]) -> f64 {
    debug_assert_eq!(a.len(), b.len());
    let a_chunks = a.chunks_exact(LANES);
    let b_chunks = b.chunks_exact(LANES);
    let tail: f64 = a_chunks
        .remainder()
        .iter()
        .zip(b_chunks.remainder())
        .map(|(&x, &y)| {
            let diff = x as f64 - y as f64;
            diff * diff
        })
        .sum();

    let mut acc = f64x4::default();
    for (x, y) in a_chunks.zip(b_chunks) {
        let diff = widen(x) - widen(y);
        acc = acc + diff * diff;
    }
    sum_lanes(acc) + tail
}

#[inline]
fn widen(chunk: &[NormalizedFeature]) -> f64x4 {
    f64x4::from([
        chunk[0] as f64,
        chunk[1] as f64,
        chunk[2] as f64,
        chunk[3] as f64,
    ])
}

#[inline]
fn sum_lanes(x: f64x4) -> f64 {
    x.to_array().iter().sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_distance_matches_scalar_formula() {
        let a = [1.0, -2.0, 0.5, 3.0, 4.0, -1.5, 0.0];
        let b = [0.0, 2.0, 0.5, -1.0, 1.0, 1.5, 2.0];
        let expected: f64 = a
            .iter()
            .zip(&b)
            .map(|(&x, &y): (&f32, &f32)| ((x - y) as f64).powi(2))
            .sum::<f64>()
            .sqrt();
        assert_relative_eq!(euclidean_distance(&a, &b).unwrap(), expected, epsilon = 1e-12);
    }

    #[test]
    fn test_distance_symmetry_and_identity() {
        let vectors: [&[f32]; 3] = [
            &[0.25, -1.0, 3.5, 2.0, 0.0],
            &[1.0, 1.0, 1.0, 1.0, 1.0],
            &[-3.0, 0.5, 0.125, 8.0, -2.0],
        ];
        for a in vectors {
            assert_eq!(euclidean_distance(a, a).unwrap(), 0.0);
            for b in vectors {
                assert_eq!(
                    euclidean_distance(a, b).unwrap(),
                    euclidean_distance(b, a).unwrap()
                );
            }
        }
    }

    #[test]
    fn test_three_four_five() {
        assert_relative_eq!(euclidean_distance(&[0.0, 0.0], &[3.0, 4.0]).unwrap(), 5.0);
    }

    #[test]
    fn test_mismatched_lengths_rejected() {
        assert!(matches!(
            euclidean_distance(&[1.0, 2.0], &[1.0]),
            Err(KnnError::DimensionMismatch { expected: 2, actual: 1 })
        ));
        assert!(matches!(
            euclidean_distance(&[], &[]),
            Err(KnnError::EmptyFeatureVector)
        ));
    }
}
