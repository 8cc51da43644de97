// Loading MNIST-style datasets into a DataSet

mod load_idx;
pub use load_idx::{load_idx, read_images, read_labels, IMAGE_MAGIC, LABEL_MAGIC};

mod load_csv;
pub use load_csv::load_csv;
