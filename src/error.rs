use std::path::PathBuf;

use crate::dataset::PartitionKind;

#[derive(Debug, thiserror::Error)]
pub enum KnnError {
    #[error("feature vector {index} has {actual} features, expected {expected}")]
    InconsistentFeatureSize {
        index: usize,
        expected: usize,
        actual: usize,
    },

    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("feature vectors must have at least one dimension")]
    EmptyFeatureVector,

    #[error("cannot compute normalization statistics over an empty {0} partition")]
    EmptyReference(PartitionKind),

    #[error("record {0} has not been normalized")]
    NotNormalized(usize),

    #[error("record {0} has already been normalized")]
    AlreadyNormalized(usize),

    #[error("record index {index} is out of range for a data set of {len} records")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("record {0} appears more than once in a partition")]
    DuplicateIndex(usize),

    #[error("{features} feature vectors but {labels} labels")]
    LabelCountMismatch { features: usize, labels: usize },

    #[error("invalid split fractions: train {train}, test {test}")]
    InvalidSplit { train: f64, test: f64 },

    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("bad magic number in {}: expected {expected:#010x}, found {found:#010x}", .path.display())]
    BadMagic {
        path: PathBuf,
        expected: u32,
        found: u32,
    },

    #[error("{} is truncated: expected {expected} bytes, found {found}", .path.display())]
    Truncated {
        path: PathBuf,
        expected: usize,
        found: usize,
    },

    #[error("failed to parse {field} on line {line} of {}: {value:?}", .path.display())]
    Parse {
        path: PathBuf,
        line: u64,
        field: &'static str,
        value: String,
    },

    #[error(transparent)]
    Csv(#[from] csv::Error),
}

pub type Result<T> = std::result::Result<T, KnnError>;
