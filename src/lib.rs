pub mod classifier;
pub mod dataset;
pub mod distance;
pub mod error;
pub mod evaluate;
pub mod majority;
pub mod mnist;
pub mod neighbors;
pub mod normalize;
pub mod record;

pub use classifier::KnnClassifier;
pub use dataset::{DataSet, Partition, PartitionKind, Split, SplitRatios};
pub use error::{KnnError, Result};
pub use evaluate::Evaluation;
pub use neighbors::Neighbor;
pub use normalize::{normalize, NormalizationStats};
pub use record::FeatureRecord;

// Raw pixel intensity
pub type Feature = u8;
// Native class identifier as stored in the dataset files
pub type RawLabel = u8;
pub type NormalizedFeature = f32;

// Neighbor count used when none is configured
pub const DEFAULT_K: usize = 3;
