//! Evaluation metrics.

use std::collections::HashMap;
use std::hash::Hash;

use failure::{ensure, Fallible};

/// Fraction of predictions that are equal to the gold label.
pub fn accuracy<T>(gold: &[T], predicted: &[T]) -> Fallible<f64>
where
    T: PartialEq,
{
    check_lengths(gold, predicted)?;

    let correct = gold
        .iter()
        .zip(predicted)
        .filter(|(gold, predicted)| gold == predicted)
        .count();

    Ok(correct as f64 / gold.len() as f64)
}

/// Mean of the per-class recall.
///
/// Only classes that occur in the gold labels are taken into account.
pub fn balanced_accuracy<T>(gold: &[T], predicted: &[T]) -> Fallible<f64>
where
    T: Eq + Hash,
{
    check_lengths(gold, predicted)?;

    // Class -> (correct, total)
    let mut counts: HashMap<&T, (usize, usize)> = HashMap::new();
    for (gold, predicted) in gold.iter().zip(predicted) {
        let class_counts = counts.entry(gold).or_default();
        if gold == predicted {
            class_counts.0 += 1;
        }
        class_counts.1 += 1;
    }

    let recall_sum = counts
        .values()
        .map(|&(correct, total)| correct as f64 / total as f64)
        .sum::<f64>();

    Ok(recall_sum / counts.len() as f64)
}

fn check_lengths<T>(gold: &[T], predicted: &[T]) -> Fallible<()> {
    ensure!(
        gold.len() == predicted.len(),
        "Number of gold labels ({}) and predictions ({}) differ",
        gold.len(),
        predicted.len()
    );
    ensure!(!gold.is_empty(), "Cannot evaluate without labels");

    Ok(())
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::{accuracy, balanced_accuracy};

    #[test]
    fn accuracy_counts_matches() {
        let gold = ["A", "A", "B", "C"];
        let predicted = ["A", "B", "B", "A"];
        assert_relative_eq!(accuracy(&gold, &predicted).unwrap(), 0.5);
    }

    #[test]
    fn balanced_accuracy_averages_recall() {
        // Recall A: 2/3, B: 1/1.
        let gold = ["A", "A", "A", "B"];
        let predicted = ["A", "A", "B", "B"];
        assert_relative_eq!(balanced_accuracy(&gold, &predicted).unwrap(), 5. / 6.);
    }

    #[test]
    fn constant_prediction_on_balanced_classes() {
        let gold = ["NOUN", "VERB", "NOUN", "VERB", "VERB", "NOUN"];
        let predicted = ["NOUN"; 6];
        assert_eq!(balanced_accuracy(&gold, &predicted).unwrap(), 0.5);
        assert_eq!(accuracy(&gold, &predicted).unwrap(), 0.5);
    }

    #[test]
    fn predicted_classes_outside_gold_are_ignored() {
        let gold = ["A", "A"];
        let predicted = ["A", "Z"];
        assert_relative_eq!(balanced_accuracy(&gold, &predicted).unwrap(), 0.5);
    }

    #[test]
    fn invalid_inputs() {
        assert!(accuracy::<&str>(&[], &[]).is_err());
        assert!(balanced_accuracy(&["A"], &["A", "B"]).is_err());
    }
}
