use std::collections::HashMap;
use std::fmt;

use rand::{rngs::SmallRng, seq::SliceRandom, SeedableRng};
use tracing::{debug, info};

use crate::error::{KnnError, Result};
use crate::record::FeatureRecord;
use crate::{Feature, RawLabel};

// The arena that owns every record of one dataset.
// Classes are enumerated in two phases when the data set is built: all raw
// labels are discovered first, fixing `class_count`, and only then is each
// record's one-hot class vector built. Nothing is added or removed afterwards,
// so partitions can refer to records by index.
#[derive(Debug, Clone)]
pub struct DataSet {
    records: Vec<FeatureRecord>,
    feature_vector_size: usize,
    // Raw label of each enumerated class, in order of first appearance
    classes: Vec<RawLabel>,
}

impl DataSet {
    // Combine parallel arrays of feature vectors and labels
    pub fn from_parts(features: Vec<Vec<Feature>>, labels: Vec<RawLabel>) -> Result<Self> {
        if features.len() != labels.len() {
            return Err(KnnError::LabelCountMismatch {
                features: features.len(),
                labels: labels.len(),
            });
        }

        let feature_vector_size = features.first().map_or(0, Vec::len);
        if !features.is_empty() && feature_vector_size == 0 {
            return Err(KnnError::EmptyFeatureVector);
        }
        if let Some((index, actual)) = features
            .iter()
            .map(Vec::len)
            .enumerate()
            .find(|&(_, len)| len != feature_vector_size)
        {
            return Err(KnnError::InconsistentFeatureSize {
                index,
                expected: feature_vector_size,
                actual,
            });
        }

        // First pass: discover every class so the class count is final
        let mut class_ids: HashMap<RawLabel, usize> = HashMap::new();
        let mut classes = Vec::new();
        let enumerated: Vec<usize> = labels
            .iter()
            .map(|&label| {
                *class_ids.entry(label).or_insert_with(|| {
                    classes.push(label);
                    classes.len() - 1
                })
            })
            .collect();

        // Second pass: build the records with their class vectors
        let class_count = classes.len();
        let records = features
            .into_iter()
            .zip(labels)
            .zip(enumerated)
            .map(|((raw, label), id)| FeatureRecord::new(raw, label, id, class_count))
            .collect::<Vec<_>>();

        info!(
            records = records.len(),
            classes = class_count,
            feature_vector_size,
            "Extracted {} unique classes",
            class_count
        );

        Ok(Self {
            records,
            feature_vector_size,
            classes,
        })
    }

    pub fn from_samples(samples: impl IntoIterator<Item = (Vec<Feature>, RawLabel)>) -> Result<Self> {
        let (features, labels) = samples.into_iter().unzip();
        Self::from_parts(features, labels)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn feature_vector_size(&self) -> usize {
        self.feature_vector_size
    }

    pub fn class_count(&self) -> usize {
        self.classes.len()
    }

    // classes()[enumerated_label] is the raw label of that class
    pub fn classes(&self) -> &[RawLabel] {
        &self.classes
    }

    pub fn enumerated_label_of(&self, raw_label: RawLabel) -> Option<usize> {
        self.classes.iter().position(|&label| label == raw_label)
    }

    pub fn record(&self, index: usize) -> Option<&FeatureRecord> {
        self.records.get(index)
    }

    pub fn records(&self) -> &[FeatureRecord] {
        &self.records
    }

    // Records of a partition, in partition order
    pub fn records_in<'a>(
        &'a self,
        partition: &'a Partition,
    ) -> Result<impl Iterator<Item = &'a FeatureRecord> + 'a> {
        self.check_partition(partition)?;
        Ok(partition.iter().map(move |index| &self.records[index]))
    }

    // A partition holds bare indices, so one built from another data set
    // may point past the end of this one
    pub fn check_partition(&self, partition: &Partition) -> Result<()> {
        match partition.iter().find(|&index| index >= self.records.len()) {
            Some(index) => Err(KnnError::IndexOutOfRange {
                index,
                len: self.records.len(),
            }),
            None => Ok(()),
        }
    }

    pub(crate) fn record_mut(&mut self, index: usize) -> &mut FeatureRecord {
        &mut self.records[index]
    }

    // Builds a partition from explicit indices.
    // Fails if an index is out of range or repeated.
    pub fn partition(&self, kind: PartitionKind, indices: Vec<usize>) -> Result<Partition> {
        let mut seen = vec![false; self.records.len()];
        for &index in &indices {
            match seen.get_mut(index) {
                None => {
                    return Err(KnnError::IndexOutOfRange {
                        index,
                        len: self.records.len(),
                    })
                }
                Some(true) => return Err(KnnError::DuplicateIndex(index)),
                Some(flag) => *flag = true,
            }
        }
        Ok(Partition { kind, indices })
    }

    // A partition covering every record, in storage order
    pub fn full_partition(&self, kind: PartitionKind) -> Partition {
        Partition {
            kind,
            indices: (0..self.records.len()).collect(),
        }
    }

    // Shuffles the record indices with a `SmallRng` seeded from `seed` and
    // cuts them into training, test and validation partitions.
    // Training and test sizes are the floor of `len * fraction`; validation
    // takes whatever remains, so the three always cover the whole data set.
    pub fn split(&self, ratios: SplitRatios, seed: u64) -> Result<Split> {
        ratios.check()?;

        let total = self.records.len();
        let train_size = ((total as f64 * ratios.train).floor() as usize).min(total);
        let test_size = ((total as f64 * ratios.test).floor() as usize).min(total - train_size);

        let mut order: Vec<usize> = (0..total).collect();
        let mut rng = SmallRng::seed_from_u64(seed);
        order.shuffle(&mut rng);

        let validation = order.split_off(train_size + test_size);
        let test = order.split_off(train_size);
        let training = order;

        info!(
            training = training.len(),
            test = test.len(),
            validation = validation.len(),
            seed,
            "Split data set"
        );

        Ok(Split {
            training: Partition {
                kind: PartitionKind::Training,
                indices: training,
            },
            test: Partition {
                kind: PartitionKind::Test,
                indices: test,
            },
            validation: Partition {
                kind: PartitionKind::Validation,
                indices: validation,
            },
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PartitionKind {
    Training,
    Test,
    Validation,
}

impl fmt::Display for PartitionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PartitionKind::Training => "training",
            PartitionKind::Test => "test",
            PartitionKind::Validation => "validation",
        };
        f.write_str(name)
    }
}

// A named subset of a DataSet, held as indices into it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Partition {
    kind: PartitionKind,
    indices: Vec<usize>,
}

impl Partition {
    pub fn kind(&self) -> PartitionKind {
        self.kind
    }

    pub fn indices(&self) -> &[usize] {
        &self.indices
    }

    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        self.indices.iter().copied()
    }
}

#[derive(Debug, Clone)]
pub struct Split {
    pub training: Partition,
    pub test: Partition,
    pub validation: Partition,
}

// Fractions of the data set given to training and test.
// Validation receives the remainder.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SplitRatios {
    pub train: f64,
    pub test: f64,
}

impl SplitRatios {
    pub fn new(train: f64, test: f64) -> Result<Self> {
        let ratios = Self { train, test };
        ratios.check()?;
        Ok(ratios)
    }

    pub fn validation(&self) -> f64 {
        (1.0 - self.train - self.test).max(0.0)
    }

    fn check(&self) -> Result<()> {
        let in_range = |x: f64| x.is_finite() && (0.0..=1.0).contains(&x);
        if !in_range(self.train) || !in_range(self.test) || self.train + self.test > 1.0 + 1e-9 {
            debug!(train = self.train, test = self.test, "Rejected split fractions");
            return Err(KnnError::InvalidSplit {
                train: self.train,
                test: self.test,
            });
        }
        Ok(())
    }
}

impl Default for SplitRatios {
    fn default() -> Self {
        Self {
            train: 0.75,
            test: 0.20,
        }
    }
}
