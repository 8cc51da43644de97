use crate::{Feature, NormalizedFeature, RawLabel};

// One labeled example.
// Records are created by DataSet, which assigns the
// enumerated label and one-hot class vector once the full label set is known.
// Only the normalized vector changes afterwards, and only once.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureRecord {
    raw_features: Vec<Feature>,
    normalized_features: Option<Vec<NormalizedFeature>>,
    raw_label: RawLabel,
    enumerated_label: usize,
    class_vector: Vec<u8>,
}

impl FeatureRecord {
    pub(crate) fn new(
        raw_features: Vec<Feature>,
        raw_label: RawLabel,
        enumerated_label: usize,
        class_count: usize,
    ) -> Self {
        debug_assert!(enumerated_label < class_count);
        let mut class_vector = vec![0; class_count];
        class_vector[enumerated_label] = 1;
        Self {
            raw_features,
            normalized_features: None,
            raw_label,
            enumerated_label,
            class_vector,
        }
    }

    pub fn raw_features(&self) -> &[Feature] {
        &self.raw_features
    }

    // None until the record has been normalized
    pub fn normalized_features(&self) -> Option<&[NormalizedFeature]> {
        self.normalized_features.as_deref()
    }

    pub fn is_normalized(&self) -> bool {
        self.normalized_features.is_some()
    }

    pub fn raw_label(&self) -> RawLabel {
        self.raw_label
    }

    pub fn enumerated_label(&self) -> usize {
        self.enumerated_label
    }

    pub fn class_vector(&self) -> &[u8] {
        &self.class_vector
    }

    pub fn feature_vector_size(&self) -> usize {
        self.raw_features.len()
    }

    // Callers check is_normalized first; the vector is write-once
    pub(crate) fn set_normalized_features(&mut self, values: Vec<NormalizedFeature>) {
        debug_assert!(self.normalized_features.is_none());
        self.normalized_features = Some(values);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_class_vector_is_one_hot() {
        let record = FeatureRecord::new(vec![1, 2, 3], 7, 2, 4);
        assert_eq!(record.class_vector(), &[0, 0, 1, 0]);
        assert_eq!(record.enumerated_label(), 2);
        assert_eq!(record.raw_label(), 7);
        assert_eq!(record.feature_vector_size(), 3);
    }

    #[test]
    fn test_normalized_features_absent_until_set() {
        let mut record = FeatureRecord::new(vec![1, 2], 0, 0, 1);
        assert!(record.normalized_features().is_none());
        record.set_normalized_features(vec![-1.0, 1.0]);
        assert_eq!(record.normalized_features(), Some(&[-1.0_f32, 1.0][..]));
    }
}
