use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::dataset::{DataSet, Partition};
use crate::distance::check_dimensions;
use crate::error::{KnnError, Result};
use crate::{Feature, NormalizedFeature};

// Records reduced serially per parallel work item. Fixed so that the merge
// order, and therefore every rounding step, does not depend on the thread count.
const REDUCTION_CHUNK: usize = 256;

// Running (count, mean, M2) per dimension for one chunk of records
#[derive(Debug, Clone)]
struct Moments {
    count: usize,
    mean: Vec<f64>,
    m2: Vec<f64>,
}

impl Moments {
    fn new(dimensions: usize) -> Self {
        Self {
            count: 0,
            mean: vec![0.0; dimensions],
            m2: vec![0.0; dimensions],
        }
    }

    // Welford's update with one more record
    fn push(&mut self, values: &[Feature]) {
        self.count += 1;
        let n = self.count as f64;
        for ((mean, m2), &x) in self.mean.iter_mut().zip(self.m2.iter_mut()).zip(values) {
            let x = x as f64;
            let delta = x - *mean;
            *mean += delta / n;
            *m2 += delta * (x - *mean);
        }
    }

    // Pairwise combination of two disjoint sets of records
    fn merge(mut self, other: Moments) -> Self {
        if other.count == 0 {
            return self;
        }
        if self.count == 0 {
            return other;
        }
        let na = self.count as f64;
        let nb = other.count as f64;
        let n = na + nb;
        for i in 0..self.mean.len() {
            let delta = other.mean[i] - self.mean[i];
            self.mean[i] += delta * nb / n;
            self.m2[i] += other.m2[i] + delta * delta * na * nb / n;
        }
        self.count += other.count;
        self
    }
}

// Per-dimension statistics of a reference partition.
// Computed once from the training partition and then applied unchanged to
// every other partition, so no information flows from test or validation
// data into the transform.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizationStats {
    count: usize,
    mean: Vec<f64>,
    // Sample standard deviation (divisor n - 1), zero for constant dimensions
    std_dev: Vec<f64>,
    divisor: Vec<f64>,
    constant_dimensions: Vec<usize>,
}

impl NormalizationStats {
    // Computes mean and sample standard deviation of every dimension over
    // `reference`. Dimensions with zero deviation are only mean-centered.
    pub fn fit(dataset: &DataSet, reference: &Partition) -> Result<Self> {
        if reference.is_empty() {
            return Err(KnnError::EmptyReference(reference.kind()));
        }
        dataset.check_partition(reference)?;
        let dimensions = dataset.feature_vector_size();
        let records = dataset.records();

        let moments = reference
            .indices()
            .par_chunks(REDUCTION_CHUNK)
            .map(|chunk| {
                let mut moments = Moments::new(dimensions);
                for &index in chunk {
                    moments.push(records[index].raw_features());
                }
                moments
            })
            .collect::<Vec<_>>()
            .into_iter()
            .reduce(Moments::merge)
            .unwrap_or_else(|| Moments::new(dimensions));

        let count = moments.count;
        let std_dev: Vec<f64> = moments
            .m2
            .iter()
            .map(|&m2| {
                if count < 2 {
                    0.0
                } else {
                    (m2.max(0.0) / (count - 1) as f64).sqrt()
                }
            })
            .collect();

        let mut constant_dimensions = Vec::new();
        let divisor = std_dev
            .iter()
            .enumerate()
            .map(|(i, &sd)| {
                if sd == 0.0 {
                    debug!(dimension = i, "Zero standard deviation, dividing by 1.0");
                    constant_dimensions.push(i);
                    1.0
                } else {
                    sd
                }
            })
            .collect();

        if !constant_dimensions.is_empty() {
            warn!(
                "{} of {} features have zero standard deviation in the {} partition; they are mean-centered only",
                constant_dimensions.len(),
                dimensions,
                reference.kind()
            );
        }

        Ok(Self {
            count,
            mean: moments.mean,
            std_dev,
            divisor,
            constant_dimensions,
        })
    }

    // Writes normalized vectors for every record of `partition`.
    // Normalized vectors are write-once: if any record of the partition
    // already has one, nothing is modified and `AlreadyNormalized` is returned.
    pub fn apply(&self, dataset: &mut DataSet, partition: &Partition) -> Result<()> {
        check_dimensions(self.dimensions(), dataset.feature_vector_size())?;
        dataset.check_partition(partition)?;
        check_unnormalized(dataset, partition)?;

        let values: Vec<Vec<NormalizedFeature>> = {
            let records = dataset.records();
            partition
                .indices()
                .par_iter()
                .map(|&index| self.transform_unchecked(records[index].raw_features()))
                .collect()
        };
        for (index, normalized) in partition.iter().zip(values) {
            dataset.record_mut(index).set_normalized_features(normalized);
        }

        debug!(records = partition.len(), "Normalized {} partition", partition.kind());
        Ok(())
    }

    // Normalize a vector that is not part of the data set, e.g. an external query
    pub fn transform<T: Copy + Into<f64>>(&self, raw: &[T]) -> Result<Vec<NormalizedFeature>> {
        check_dimensions(self.dimensions(), raw.len())?;
        Ok(self.transform_unchecked(raw))
    }

    fn transform_unchecked<T: Copy + Into<f64>>(&self, raw: &[T]) -> Vec<NormalizedFeature> {
        raw.iter()
            .zip(self.mean.iter().zip(&self.divisor))
            .map(|(&x, (&mean, &divisor))| ((Into::<f64>::into(x) - mean) / divisor) as NormalizedFeature)
            .collect()
    }

    pub fn dimensions(&self) -> usize {
        self.mean.len()
    }

    // Number of reference records the statistics were computed from
    pub fn count(&self) -> usize {
        self.count
    }

    pub fn mean(&self) -> &[f64] {
        &self.mean
    }

    pub fn std_dev(&self) -> &[f64] {
        &self.std_dev
    }

    pub fn divisors(&self) -> &[f64] {
        &self.divisor
    }

    pub fn constant_dimensions(&self) -> &[usize] {
        &self.constant_dimensions
    }
}

// Callers check the partition's indices against the data set first
fn check_unnormalized(dataset: &DataSet, partition: &Partition) -> Result<()> {
    match partition
        .iter()
        .find(|&index| dataset.record(index).map_or(false, |r| r.is_normalized()))
    {
        Some(index) => Err(KnnError::AlreadyNormalized(index)),
        None => Ok(()),
    }
}

// Every record may be written once, so no index may appear in two of the
// partitions (or twice in the same one) normalized together
fn check_disjoint(dataset: &DataSet, partitions: &[&Partition]) -> Result<()> {
    let mut seen = vec![false; dataset.len()];
    for partition in partitions {
        dataset.check_partition(partition)?;
        for index in partition.iter() {
            if std::mem::replace(&mut seen[index], true) {
                return Err(KnnError::DuplicateIndex(index));
            }
        }
    }
    Ok(())
}

// Fits statistics on `reference` and normalizes it together with `others`.
// All partitions are checked before any record is written, so an error
// leaves the data set untouched. The partitions must not share records.
pub fn normalize(
    dataset: &mut DataSet,
    reference: &Partition,
    others: &[&Partition],
) -> Result<NormalizationStats> {
    let stats = NormalizationStats::fit(dataset, reference)?;
    let partitions: Vec<&Partition> = std::iter::once(reference)
        .chain(others.iter().copied())
        .collect();
    check_disjoint(dataset, &partitions)?;
    for partition in &partitions {
        check_unnormalized(dataset, partition)?;
    }

    stats.apply(dataset, reference)?;
    for partition in others {
        stats.apply(dataset, partition)?;
    }

    info!(
        reference = reference.len(),
        dimensions = stats.dimensions(),
        constant = stats.constant_dimensions().len(),
        "Data normalization completed"
    );
    Ok(stats)
}
