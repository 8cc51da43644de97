// Majority vote over enumerated labels, given in ascending order of distance.
// Among labels tied for the most votes, the one that reached that count first
// wins, which is the tied label with the closest neighbor.
// Returns None when there are no votes.
pub fn majority_vote(labels: impl IntoIterator<Item = usize>) -> Option<usize> {
    // Enumerated labels are dense, so a Vec indexed by label holds the tally
    let mut counts: Vec<usize> = Vec::new();
    let mut best: Option<(usize, usize)> = None;

    for label in labels {
        if label >= counts.len() {
            counts.resize(label + 1, 0);
        }
        counts[label] += 1;
        let count = counts[label];
        // Strict comparison keeps the earlier label on ties
        if best.map_or(true, |(_, best_count)| count > best_count) {
            best = Some((label, count));
        }
    }

    best.map(|(label, _)| label)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tie_goes_to_first_label_to_reach_max() {
        assert_eq!(majority_vote([1, 1, 2, 2]), Some(1));
        assert_eq!(majority_vote([2, 1, 1, 2]), Some(1));
        assert_eq!(majority_vote([2, 1, 2, 1]), Some(2));
    }

    #[test]
    fn test_clear_majority() {
        assert_eq!(majority_vote([0, 3, 3, 5, 3]), Some(3));
        assert_eq!(majority_vote([7]), Some(7));
    }

    #[test]
    fn test_no_votes() {
        assert_eq!(majority_vote(Vec::new()), None);
    }
}
