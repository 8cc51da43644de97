use crate::dataset::{DataSet, Partition};
use crate::error::{KnnError, Result};
use crate::evaluate::{evaluate, Evaluation};
use crate::majority::majority_vote;
use crate::neighbors::{find_k_nearest, Neighbor};
use crate::{NormalizedFeature, RawLabel, DEFAULT_K};

// k-nearest-neighbor classifier over a normalized training partition.
// There is no training step: the model is the borrowed training partition.
// Holding `&DataSet` means normalization (which needs `&mut DataSet`) has to
// finish before a classifier can exist.
#[derive(Debug, Clone, Copy)]
pub struct KnnClassifier<'a> {
    dataset: &'a DataSet,
    training: &'a Partition,
    k: usize,
}

impl<'a> KnnClassifier<'a> {
    pub fn new(dataset: &'a DataSet, training: &'a Partition, k: usize) -> Result<Self> {
        if let Some(index) = training
            .iter()
            .find(|&index| dataset.record(index).map_or(true, |r| !r.is_normalized()))
        {
            return match dataset.record(index) {
                None => Err(KnnError::IndexOutOfRange {
                    index,
                    len: dataset.len(),
                }),
                Some(_) => Err(KnnError::NotNormalized(index)),
            };
        }
        Ok(Self {
            dataset,
            training,
            k,
        })
    }

    pub fn with_default_k(dataset: &'a DataSet, training: &'a Partition) -> Result<Self> {
        Self::new(dataset, training, DEFAULT_K)
    }

    pub fn k(&self) -> usize {
        self.k
    }

    pub fn set_k(&mut self, k: usize) {
        self.k = k;
    }

    pub fn dataset(&self) -> &'a DataSet {
        self.dataset
    }

    pub fn training(&self) -> &'a Partition {
        self.training
    }

    pub fn find_k_nearest(&self, query: &[NormalizedFeature]) -> Result<Vec<Neighbor>> {
        find_k_nearest(self.dataset, self.training, query, self.k)
    }

    // Predicts the enumerated label of a normalized query vector.
    // Returns `Ok(None)` when there are no neighbors to vote, i.e. `k` is
    // zero or the training partition is empty.
    pub fn predict(&self, query: &[NormalizedFeature]) -> Result<Option<usize>> {
        let neighbors = self.find_k_nearest(query)?;
        let records = self.dataset.records();
        Ok(majority_vote(
            neighbors
                .iter()
                .map(|neighbor| records[neighbor.index].enumerated_label()),
        ))
    }

    // As predict, mapped back to the label used by the dataset files
    pub fn predict_raw(&self, query: &[NormalizedFeature]) -> Result<Option<RawLabel>> {
        Ok(self
            .predict(query)?
            .map(|label| self.dataset.classes()[label]))
    }

    // Predict for a record of the same data set, e.g. a test or validation example
    pub fn predict_record(&self, index: usize) -> Result<Option<usize>> {
        let record = self.dataset.record(index).ok_or(KnnError::IndexOutOfRange {
            index,
            len: self.dataset.len(),
        })?;
        let query = record
            .normalized_features()
            .ok_or(KnnError::NotNormalized(index))?;
        self.predict(query)
    }

    pub fn evaluate(&self, queries: &Partition) -> Evaluation {
        evaluate(self, queries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::PartitionKind;
    use crate::normalize::normalize;

    fn clusters() -> DataSet {
        DataSet::from_samples(vec![
            (vec![0, 0], b'A'),
            (vec![0, 1], b'A'),
            (vec![10, 10], b'B'),
            (vec![10, 11], b'B'),
        ])
        .unwrap()
    }

    #[test]
    fn test_each_reference_point_predicts_its_own_label() {
        let mut ds = clusters();
        let all = ds.full_partition(PartitionKind::Training);
        normalize(&mut ds, &all, &[]).unwrap();
        let knn = KnnClassifier::new(&ds, &all, 1).unwrap();
        for index in all.iter() {
            assert_eq!(
                knn.predict_record(index).unwrap(),
                Some(ds.record(index).unwrap().enumerated_label())
            );
        }
        let evaluation = knn.evaluate(&all);
        assert_eq!(evaluation.accuracy(), 1.0);
        assert_eq!(evaluation.total, 4);
    }

    #[test]
    fn test_point_between_b_examples_predicts_b() {
        let mut ds = clusters();
        let all = ds.full_partition(PartitionKind::Training);
        let stats = normalize(&mut ds, &all, &[]).unwrap();
        let knn = KnnClassifier::new(&ds, &all, 1).unwrap();
        let query = stats.transform(&[10.0_f32, 10.5]).unwrap();
        assert_eq!(knn.predict_raw(&query).unwrap(), Some(b'B'));
        assert_eq!(knn.predict(&query).unwrap(), ds.enumerated_label_of(b'B'));
    }

    #[test]
    fn test_k_larger_than_reference_saturates() {
        let mut ds = clusters();
        let all = ds.full_partition(PartitionKind::Training);
        normalize(&mut ds, &all, &[]).unwrap();
        let mut knn = KnnClassifier::with_default_k(&ds, &all).unwrap();
        assert_eq!(knn.k(), 3);
        knn.set_k(100);
        let query = ds.record(0).unwrap().normalized_features().unwrap();
        assert_eq!(knn.find_k_nearest(query).unwrap().len(), 4);
        // Two votes each; the closest neighbor is an A
        assert_eq!(knn.predict_raw(query).unwrap(), Some(b'A'));
    }

    #[test]
    fn test_no_neighbors_means_no_prediction() {
        let mut ds = clusters();
        let all = ds.full_partition(PartitionKind::Training);
        normalize(&mut ds, &all, &[]).unwrap();
        let mut knn = KnnClassifier::new(&ds, &all, 0).unwrap();
        assert_eq!(knn.predict_record(0).unwrap(), None);

        let empty = ds.partition(PartitionKind::Training, Vec::new()).unwrap();
        knn = KnnClassifier::new(&ds, &empty, 3).unwrap();
        assert_eq!(knn.predict_record(0).unwrap(), None);
    }

    #[test]
    fn test_training_must_be_normalized() {
        let ds = clusters();
        let all = ds.full_partition(PartitionKind::Training);
        assert!(matches!(
            KnnClassifier::new(&ds, &all, 1),
            Err(KnnError::NotNormalized(0))
        ));
    }

    #[test]
    fn test_predict_record_checks_index() {
        let mut ds = clusters();
        let all = ds.full_partition(PartitionKind::Training);
        normalize(&mut ds, &all, &[]).unwrap();
        let knn = KnnClassifier::new(&ds, &all, 1).unwrap();
        assert!(matches!(
            knn.predict_record(9),
            Err(KnnError::IndexOutOfRange { index: 9, len: 4 })
        ));
    }
}
