use std::cmp::Ordering;

use rayon::prelude::*;

use crate::dataset::{DataSet, Partition};
use crate::distance::{check_dimensions, squared_euclidean_distance};
use crate::error::{KnnError, Result};
use crate::NormalizedFeature;

// A reference record and its distance from the query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor {
    // Index of the record in its DataSet
    pub index: usize,
    pub distance: f64,
}

// Brute-force search for the `k` records of `reference` closest to `query`.
// The result holds `min(k, reference.len())` neighbors in ascending order of
// distance. Records at equal distance keep their order within `reference`.
pub fn find_k_nearest(
    dataset: &DataSet,
    reference: &Partition,
    query: &[NormalizedFeature],
    k: usize,
) -> Result<Vec<Neighbor>> {
    if k == 0 || reference.is_empty() {
        return Ok(Vec::new());
    }
    check_dimensions(dataset.feature_vector_size(), query.len())?;

    // (squared distance, position in reference); the square root is monotonic
    // and is only taken for the survivors
    let mut ranked = reference
        .indices()
        .par_iter()
        .enumerate()
        .map(|(position, &index)| -> Result<(f64, usize)> {
            let features = dataset
                .record(index)
                .ok_or(KnnError::IndexOutOfRange {
                    index,
                    len: dataset.len(),
                })?
                .normalized_features()
                .ok_or(KnnError::NotNormalized(index))?;
            Ok((squared_euclidean_distance(query, features), position))
        })
        .collect::<Result<Vec<(f64, usize)>>>()?;

    let k = k.min(ranked.len());
    if k < ranked.len() {
        ranked.select_nth_unstable_by(k - 1, by_distance_then_position);
        ranked.truncate(k);
    }
    ranked.sort_unstable_by(by_distance_then_position);

    let indices = reference.indices();
    Ok(ranked
        .into_iter()
        .map(|(squared, position)| Neighbor {
            index: indices[position],
            distance: squared.sqrt(),
        })
        .collect())
}

// Positions are unique, so this is a total order and unstable algorithms
// produce the same result as a stable sort by distance alone
fn by_distance_then_position(a: &(f64, usize), b: &(f64, usize)) -> Ordering {
    a.0.total_cmp(&b.0).then(a.1.cmp(&b.1))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::PartitionKind;
    use crate::normalize::normalize;
    use std::collections::HashSet;

    // One-dimensional records at the given positions, normalized over themselves
    fn line(points: &[u8]) -> (DataSet, Partition) {
        let mut ds = DataSet::from_samples(points.iter().map(|&p| (vec![p], p % 2))).unwrap();
        let reference = ds.full_partition(PartitionKind::Training);
        normalize(&mut ds, &reference, &[]).unwrap();
        (ds, reference)
    }

    fn query_for(ds: &DataSet, index: usize) -> Vec<f32> {
        ds.record(index).unwrap().normalized_features().unwrap().to_vec()
    }

    #[test]
    fn test_returns_min_k_n_sorted_without_duplicates() {
        let (ds, reference) = line(&[50, 3, 200, 17, 99, 0, 180, 64]);
        let query = query_for(&ds, 3);
        for k in 0..12 {
            let neighbors = find_k_nearest(&ds, &reference, &query, k).unwrap();
            assert_eq!(neighbors.len(), k.min(8));
            assert!(neighbors.windows(2).all(|w| w[0].distance <= w[1].distance));
            let unique: HashSet<usize> = neighbors.iter().map(|n| n.index).collect();
            assert_eq!(unique.len(), neighbors.len());
        }
    }

    #[test]
    fn test_nearest_is_the_query_itself() {
        let (ds, reference) = line(&[50, 3, 200, 17, 99]);
        let neighbors = find_k_nearest(&ds, &reference, &query_for(&ds, 2), 2).unwrap();
        assert_eq!(neighbors[0].index, 2);
        assert_eq!(neighbors[0].distance, 0.0);
        assert_eq!(neighbors[1].index, 4);
    }

    #[test]
    fn test_ties_keep_reference_order() {
        // Records 1, 2 and 4 sit at the same point
        let (ds, _) = line(&[10, 40, 40, 70, 40]);
        let reference = ds.partition(PartitionKind::Training, vec![4, 0, 2, 3, 1]).unwrap();
        let query = query_for(&ds, 1);
        let neighbors = find_k_nearest(&ds, &reference, &query, 3).unwrap();
        let order: Vec<usize> = neighbors.iter().map(|n| n.index).collect();
        assert_eq!(order, vec![4, 2, 1]);
        // Repeated searches agree
        assert_eq!(neighbors, find_k_nearest(&ds, &reference, &query, 3).unwrap());
    }

    #[test]
    fn test_degenerate_inputs_give_empty_results() {
        let (ds, reference) = line(&[1, 2, 3]);
        let query = query_for(&ds, 0);
        assert!(find_k_nearest(&ds, &reference, &query, 0).unwrap().is_empty());
        let empty = ds.partition(PartitionKind::Training, Vec::new()).unwrap();
        assert!(find_k_nearest(&ds, &empty, &query, 3).unwrap().is_empty());
    }

    #[test]
    fn test_query_length_must_match() {
        let (ds, reference) = line(&[1, 2, 3]);
        assert!(matches!(
            find_k_nearest(&ds, &reference, &[0.0, 1.0], 1),
            Err(KnnError::DimensionMismatch { expected: 1, actual: 2 })
        ));
    }

    #[test]
    fn test_unnormalized_reference_rejected() {
        let ds = DataSet::from_samples(vec![(vec![1], 0), (vec![2], 1)]).unwrap();
        let reference = ds.full_partition(PartitionKind::Training);
        assert!(matches!(
            find_k_nearest(&ds, &reference, &[0.0], 1),
            Err(KnnError::NotNormalized(_))
        ));
    }

    #[test]
    fn test_partition_of_larger_data_set_rejected() {
        let (ds, _) = line(&[1, 2, 3]);
        let (big, _) = line(&[1, 2, 3, 4, 5, 6]);
        let foreign = big.partition(PartitionKind::Training, vec![0, 5]).unwrap();
        assert!(matches!(
            find_k_nearest(&ds, &foreign, &query_for(&ds, 0), 1),
            Err(KnnError::IndexOutOfRange { index: 5, len: 3 })
        ));
    }
}
