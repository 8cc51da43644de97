use std::path::Path;

use tracing::info;

use crate::dataset::DataSet;
use crate::error::{KnnError, Result};

// Load MNIST images from a csv file, keeping at most `max_examples` rows.
// The expected format is:
// - No headers
// - One image per row
// - Each row starts with the class label
// - The rest of the row consists of the pixel values, 0-255
pub fn load_csv(path: impl AsRef<Path>, max_examples: usize) -> Result<DataSet> {
    let path = path.as_ref();
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .from_path(path)?;

    let samples = reader
        .records()
        .take(max_examples)
        .map(|result| -> Result<(Vec<u8>, u8)> {
            let record = result?;
            let line = record.position().map_or(0, |position| position.line());
            let label = parse_byte(path, line, "label", record.get(0).unwrap_or(""))?;
            let image = record
                .iter()
                .skip(1) // Skip the label
                .map(|x| parse_byte(path, line, "pixel", x))
                .collect::<Result<Vec<_>>>()?;
            Ok((image, label))
        })
        .collect::<Result<Vec<_>>>()?;

    info!("Loaded {} examples from {}", samples.len(), path.display());
    DataSet::from_samples(samples)
}

fn parse_byte(path: &Path, line: u64, field: &'static str, value: &str) -> Result<u8> {
    value.trim().parse::<u8>().map_err(|_| KnnError::Parse {
        path: path.to_path_buf(),
        line,
        field,
        value: value.to_string(),
    })
}
