use std::path::PathBuf;
use std::time::Instant;

use anyhow::{bail, Context};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use knn_mnist::mnist::{load_csv, load_idx};
use knn_mnist::{normalize, DataSet, KnnClassifier, SplitRatios, DEFAULT_K};

/// Brute-force k-nearest-neighbor baseline for MNIST-style datasets
#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    /// IDX image file, e.g. train-images.idx3-ubyte
    #[arg(long, requires = "labels", conflicts_with = "csv")]
    images: Option<PathBuf>,

    /// IDX label file, e.g. train-labels.idx1-ubyte
    #[arg(long, requires = "images")]
    labels: Option<PathBuf>,

    /// CSV file with one image per row, label first
    #[arg(long)]
    csv: Option<PathBuf>,

    /// Number of neighbors that vote on each prediction
    #[arg(short, long, default_value_t = DEFAULT_K as u64, value_parser = clap::value_parser!(u64).range(1..))]
    k: u64,

    /// Seed for the train/test/validation shuffle
    #[arg(long, default_value_t = 0)]
    seed: u64,

    /// Fraction of examples used as the reference set
    #[arg(long, default_value_t = 0.75)]
    train_fraction: f64,

    /// Fraction of examples used for the test set; validation gets the rest
    #[arg(long, default_value_t = 0.20)]
    test_fraction: f64,

    /// Number of examples to load
    #[arg(long, default_value_t = usize::MAX)]
    max_examples: usize,

    /// Worker threads (defaults to one per core)
    #[arg(long)]
    threads: Option<usize>,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let default_level = match args.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_target(false)
        .init();

    if let Some(threads) = args.threads {
        rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build_global()
            .context("Failed to configure the thread pool")?;
    }
    let ratios = SplitRatios::new(args.train_fraction, args.test_fraction)?;
    let k = usize::try_from(args.k).context("k does not fit in usize")?;

    // Load the dataset - raw images and labels, classes enumerated
    println!("Loading data... ");
    let now = Instant::now();
    let mut dataset = load(&args)?;
    println!(
        "Loaded {} examples with {} classes [{}ms]",
        dataset.len(),
        dataset.class_count(),
        now.elapsed().as_millis()
    );

    let now = Instant::now();
    let split = dataset.split(ratios, args.seed)?;
    println!(
        "Split into {} training, {} test, {} validation examples [{}ms]",
        split.training.len(),
        split.test.len(),
        split.validation.len(),
        now.elapsed().as_millis()
    );

    // Statistics come from the training partition only
    println!("Normalizing features... ");
    let now = Instant::now();
    let stats = normalize(&mut dataset, &split.training, &[&split.test, &split.validation])
        .context("Failed to normalize the training partition")?;
    println!(
        "Done - {} constant features [{}ms]",
        stats.constant_dimensions().len(),
        now.elapsed().as_millis()
    );

    let knn = KnnClassifier::new(&dataset, &split.training, k)?;

    println!("Validating with k = {}... ", k);
    let now = Instant::now();
    let validation = knn.evaluate(&split.validation);
    println!("Done - Validation accuracy = {} [{}ms]", validation, now.elapsed().as_millis());

    println!("Testing with k = {}... ", k);
    let now = Instant::now();
    let test = knn.evaluate(&split.test);
    println!("Done - Test accuracy = {} [{}ms]", test, now.elapsed().as_millis());

    Ok(())
}

fn load(args: &Args) -> anyhow::Result<DataSet> {
    match (&args.images, &args.labels, &args.csv) {
        (Some(images), Some(labels), None) => load_idx(images, labels, args.max_examples)
            .with_context(|| format!("Failed to load {} / {}", images.display(), labels.display())),
        (None, None, Some(csv)) => load_csv(csv, args.max_examples)
            .with_context(|| format!("Failed to load {}", csv.display())),
        _ => bail!("Pass either --images and --labels, or --csv"),
    }
}
