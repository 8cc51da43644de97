use std::fmt;

use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::classifier::KnnClassifier;
use crate::dataset::Partition;

// Outcome of classifying every record of a partition.
// `total == 0` is the "no data" condition: `accuracy()` then reports 0.0,
// and `has_data()` tells it apart from 0% accuracy over real queries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Evaluation {
    pub correct: usize,
    pub total: usize,
    // Queries without a prediction; these also count as incorrect
    pub unpredicted: usize,
}

impl Evaluation {
    pub fn has_data(&self) -> bool {
        self.total > 0
    }

    pub fn accuracy(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.correct as f64 / self.total as f64
        }
    }
}

impl fmt::Display for Evaluation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.has_data() {
            return f.write_str("no data");
        }
        write!(
            f,
            "{:.2}% ({}/{})",
            self.accuracy() * 100.0,
            self.correct,
            self.total
        )
    }
}

// Classifies every record of `queries` against the classifier's training
// partition and counts how many match their own label.
// A query that cannot be classified is logged and scored as incorrect; the
// rest of the pass carries on.
pub fn evaluate(classifier: &KnnClassifier<'_>, queries: &Partition) -> Evaluation {
    if queries.is_empty() {
        warn!("{} partition is empty; no accuracy to report", queries.kind());
        return Evaluation::default();
    }

    let records = classifier.dataset().records();
    let (correct, unpredicted) = queries
        .indices()
        .par_iter()
        .map(|&index| match classifier.predict_record(index) {
            Ok(Some(label)) => (usize::from(label == records[index].enumerated_label()), 0),
            Ok(None) => (0, 1),
            Err(err) => {
                debug!(index, error = %err, "Prediction failed");
                (0, 1)
            }
        })
        .reduce(|| (0, 0), |a, b| (a.0 + b.0, a.1 + b.1));

    let evaluation = Evaluation {
        correct,
        total: queries.len(),
        unpredicted,
    };
    if unpredicted > 0 {
        warn!(
            "{} of {} {} queries had no prediction",
            unpredicted,
            evaluation.total,
            queries.kind()
        );
    }
    info!(
        k = classifier.k(),
        correct,
        total = evaluation.total,
        "{} accuracy: {}",
        queries.kind(),
        evaluation
    );
    evaluation
}
