use std::fs;
use std::path::Path;

use tracing::info;

use crate::dataset::DataSet;
use crate::error::{KnnError, Result};
use crate::{Feature, RawLabel};

// Magic numbers at the start of IDX files: unsigned bytes, 3 and 1 dimensions
pub const IMAGE_MAGIC: u32 = 0x0000_0803;
pub const LABEL_MAGIC: u32 = 0x0000_0801;

const IMAGE_HEADER_LEN: usize = 16;
const LABEL_HEADER_LEN: usize = 8;

// Loads an IDX image file and its label file into a DataSet.
// Both files are read concurrently. At most `max_examples` records are kept.
pub fn load_idx(
    images: impl AsRef<Path>,
    labels: impl AsRef<Path>,
    max_examples: usize,
) -> Result<DataSet> {
    let (images, labels) = (images.as_ref(), labels.as_ref());
    let (features, labels) = rayon::join(|| read_images(images), || read_labels(labels));
    let (mut features, mut labels) = (features?, labels?);

    if features.len() != labels.len() {
        return Err(KnnError::LabelCountMismatch {
            features: features.len(),
            labels: labels.len(),
        });
    }
    features.truncate(max_examples);
    labels.truncate(max_examples);

    DataSet::from_parts(features, labels)
}

// Read every image of an IDX3 file as a flattened row-major vector
pub fn read_images(path: &Path) -> Result<Vec<Vec<Feature>>> {
    let bytes = read_file(path)?;
    check_magic(path, &bytes, IMAGE_MAGIC)?;
    let count = read_u32(path, &bytes, 4)? as usize;
    let rows = read_u32(path, &bytes, 8)? as usize;
    let cols = read_u32(path, &bytes, 12)? as usize;
    let image_size = rows.saturating_mul(cols);
    if image_size == 0 {
        if count > 0 {
            return Err(KnnError::EmptyFeatureVector);
        }
        info!(rows, cols, "No feature vectors in {}", path.display());
        return Ok(Vec::new());
    }

    let payload = payload(path, &bytes, IMAGE_HEADER_LEN, count.saturating_mul(image_size))?;
    let images: Vec<Vec<Feature>> = payload.chunks_exact(image_size).map(<[u8]>::to_vec).collect();

    info!(rows, cols, "Read {} feature vectors from {}", images.len(), path.display());
    Ok(images)
}

// Read the one-byte labels of an IDX1 file
pub fn read_labels(path: &Path) -> Result<Vec<RawLabel>> {
    let bytes = read_file(path)?;
    check_magic(path, &bytes, LABEL_MAGIC)?;
    let count = read_u32(path, &bytes, 4)? as usize;
    let labels = payload(path, &bytes, LABEL_HEADER_LEN, count)?.to_vec();

    info!("Read {} labels from {}", labels.len(), path.display());
    Ok(labels)
}

fn read_file(path: &Path) -> Result<Vec<u8>> {
    fs::read(path).map_err(|source| KnnError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn check_magic(path: &Path, bytes: &[u8], expected: u32) -> Result<()> {
    let found = read_u32(path, bytes, 0)?;
    if found != expected {
        return Err(KnnError::BadMagic {
            path: path.to_path_buf(),
            expected,
            found,
        });
    }
    Ok(())
}

// Big-endian u32 at `offset`
fn read_u32(path: &Path, bytes: &[u8], offset: usize) -> Result<u32> {
    bytes
        .get(offset..offset + 4)
        .and_then(|b| b.try_into().ok())
        .map(u32::from_be_bytes)
        .ok_or_else(|| KnnError::Truncated {
            path: path.to_path_buf(),
            expected: offset + 4,
            found: bytes.len(),
        })
}

fn payload<'a>(path: &Path, bytes: &'a [u8], header_len: usize, len: usize) -> Result<&'a [u8]> {
    let end = header_len.saturating_add(len);
    bytes.get(header_len..end).ok_or_else(|| KnnError::Truncated {
        path: path.to_path_buf(),
        expected: end,
        found: bytes.len(),
    })
}
