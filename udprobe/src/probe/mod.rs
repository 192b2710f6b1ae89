//! Probes for linguistic properties.
//!
//! A probe is trained on the training split and evaluated on the test
//! split. Evaluating a probe before training it is an error.

use std::collections::BTreeSet;

use failure::Fallible;
use serde_derive::Serialize;

use crate::corpus::Sentence;
use crate::metrics::{accuracy, balanced_accuracy};
use crate::repr::Representations;

mod classifier;
pub use self::classifier::{ClassifierProbe, ControlTaskProbe, ContextualProbe, RandomBaseline};

mod error;
pub use self::error::ProbeError;

mod majority;
pub use self::majority::MajorityBaseline;

/// Trainable probe.
pub trait Probe {
    /// Train the probe on the training split.
    ///
    /// Training again replaces the fitted state.
    fn train(&mut self) -> Fallible<()>;

    /// Predict labels for the test split.
    fn test(&mut self) -> Fallible<Predictions>;

    /// Evaluate the probe on the test split.
    fn evaluate(&mut self) -> Fallible<ProbeScores> {
        self.test()?.scores()
    }

    /// Labels that were observed in the most recent extraction.
    fn classes(&self) -> &BTreeSet<String>;
}

/// Sentences and representations that a probe is trained and tested on.
#[derive(Clone, Copy, Debug)]
pub struct ProbeData<'a> {
    pub train: &'a [Sentence],
    pub test: &'a [Sentence],
    pub train_repr: &'a Representations,
    pub test_repr: &'a Representations,
}

/// Predicted and gold labels of the test split.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Predictions {
    pub predicted: Vec<String>,
    pub gold: Vec<String>,
}

impl Predictions {
    pub fn scores(&self) -> Fallible<ProbeScores> {
        Ok(ProbeScores {
            accuracy: accuracy(&self.gold, &self.predicted)?,
            balanced_accuracy: balanced_accuracy(&self.gold, &self.predicted)?,
        })
    }
}

/// Evaluation scores of a probe.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct ProbeScores {
    pub accuracy: f64,
    pub balanced_accuracy: f64,
}

/// Accuracy of a probe that cannot be explained by memorization.
///
/// This is the difference between the accuracy of the probe and the
/// accuracy of the same probe on the control task.
pub fn sensitivity(probe: &ProbeScores, control: &ProbeScores) -> f64 {
    probe.accuracy - control.accuracy
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::{sensitivity, Predictions, ProbeScores};

    #[test]
    fn prediction_scores() {
        let predictions = Predictions {
            predicted: vec!["A".into(), "A".into(), "A".into(), "A".into()],
            gold: vec!["A".into(), "A".into(), "B".into(), "B".into()],
        };
        let scores = predictions.scores().unwrap();

        assert_relative_eq!(scores.accuracy, 0.5);
        assert_relative_eq!(scores.balanced_accuracy, 0.5);
    }

    #[test]
    fn sensitivity_is_accuracy_difference() {
        let probe = ProbeScores {
            accuracy: 0.9,
            balanced_accuracy: 0.8,
        };
        let control = ProbeScores {
            accuracy: 0.65,
            balanced_accuracy: 0.3,
        };

        assert_relative_eq!(sensitivity(&probe, &control), 0.25, epsilon = 1e-12);
    }
}
