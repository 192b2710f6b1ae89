//! Classifiers that are trained on word representations.
//!
//! Classifiers operate on class indices. Mapping string labels to
//! indices is the responsibility of the caller.

use std::fmt;
use std::str::FromStr;

use failure::{ensure, Fallible};
use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis};
use ordered_float::OrderedFloat;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_xorshift::XorShiftRng;
use serde_derive::{Deserialize, Serialize};
use tracing::debug;

use crate::probe::ProbeError;

mod linear;
pub use self::linear::SgdClassifier;

mod lr;
pub use self::lr::{
    ConstantLearningRate, ExponentialDecay, LearningRateSchedule, LrScheduleConfig,
    PlateauLearningRate,
};

mod mlp;
pub use self::mlp::MlpClassifier;

/// A trainable multi-class classifier.
pub trait Classifier {
    /// Fit the classifier.
    ///
    /// `labels` contains a class index in `0..n_classes` for every row
    /// of `features`.
    fn fit(
        &mut self,
        features: ArrayView2<f32>,
        labels: &[usize],
        n_classes: usize,
    ) -> Fallible<()>;

    /// Predict a class index for every row of `features`.
    fn predict(&self, features: ArrayView2<f32>) -> Fallible<Vec<usize>>;
}

/// Supported classifier architectures.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ClassifierType {
    /// Multinomial logistic regression trained with SGD.
    Sgd,

    /// Multi-layer perceptron with one hidden layer.
    Mlp,
}

impl ClassifierType {
    pub fn as_str(self) -> &'static str {
        match self {
            ClassifierType::Sgd => "SGD",
            ClassifierType::Mlp => "MLP",
        }
    }

    /// Construct an untrained classifier of this type.
    pub fn classifier(self, config: &TrainConfig) -> Box<dyn Classifier> {
        match self {
            ClassifierType::Sgd => Box::new(SgdClassifier::new(config.clone())),
            ClassifierType::Mlp => Box::new(MlpClassifier::new(config.clone())),
        }
    }
}

impl fmt::Display for ClassifierType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ClassifierType {
    type Err = ProbeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "SGD" => Ok(ClassifierType::Sgd),
            "MLP" => Ok(ClassifierType::Mlp),
            _ => Err(ProbeError::InvalidClassifier {
                classifier: s.to_owned(),
            }),
        }
    }
}

/// Hyperparameters shared by the classifiers.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct TrainConfig {
    /// Maximum number of epochs.
    pub max_epochs: usize,

    /// Stop after this number of epochs without loss improvement.
    pub patience: usize,

    /// Minimum loss improvement that resets the patience.
    pub tolerance: f32,

    pub batch_size: usize,

    /// L2 regularization strength.
    pub l2: f32,

    /// Hidden layer size of the MLP classifier.
    pub hidden_units: usize,

    pub seed: u64,

    pub lr: LrScheduleConfig,
}

impl Default for TrainConfig {
    fn default() -> Self {
        TrainConfig {
            max_epochs: 50,
            patience: 5,
            tolerance: 1e-4,
            batch_size: 32,
            l2: 1e-4,
            hidden_units: 2,
            seed: 42,
            lr: LrScheduleConfig::default(),
        }
    }
}

/// Models that can be optimized with mini-batch gradient descent.
trait BatchModel {
    /// Class scores (logits) for every input row.
    fn logits(&self, inputs: ArrayView2<f32>) -> Array2<f32>;

    /// Perform one gradient step, returning the summed loss of the batch.
    fn step(&mut self, inputs: ArrayView2<f32>, targets: &[usize], lr: f32, l2: f32) -> f32;
}

fn check_training_data(
    features: ArrayView2<f32>,
    labels: &[usize],
    n_classes: usize,
) -> Fallible<()> {
    ensure!(
        features.nrows() == labels.len(),
        "Number of feature rows ({}) does not match number of labels ({})",
        features.nrows(),
        labels.len()
    );
    ensure!(!labels.is_empty(), "Cannot train on an empty data set");
    ensure!(
        labels.iter().all(|&label| label < n_classes),
        "Label index out of range for {} classes",
        n_classes
    );

    Ok(())
}

/// Run mini-batch gradient descent until the loss stops improving.
fn train<M>(
    model: &mut M,
    features: ArrayView2<f32>,
    labels: &[usize],
    config: &TrainConfig,
    rng: &mut XorShiftRng,
) -> Fallible<()>
where
    M: BatchModel,
{
    let mut schedule = config.lr.to_schedule()?;
    let batch_size = config.batch_size.max(1);
    let mut indices: Vec<usize> = (0..labels.len()).collect();

    let mut best_loss = f32::INFINITY;
    let mut last_loss = f32::INFINITY;
    let mut stale_epochs = 0;
    let mut global_step = 0;

    for epoch in 0..config.max_epochs {
        // There is no loss to compare against before the first epoch.
        if epoch > 0 {
            schedule.compute_epoch_learning_rate(epoch, -last_loss);
        }
        indices.shuffle(rng);

        let mut loss = 0f32;
        let mut lr = 0f32;
        for batch in indices.chunks(batch_size) {
            let inputs = features.select(Axis(0), batch);
            let targets: Vec<_> = batch.iter().map(|&idx| labels[idx]).collect();

            lr = schedule.compute_step_learning_rate(global_step);
            loss += model.step(inputs.view(), &targets, lr, config.l2);
            global_step += 1;
        }

        last_loss = loss / labels.len() as f32;
        debug!(epoch, loss = last_loss, lr, "finished epoch");

        if last_loss < best_loss - config.tolerance {
            best_loss = last_loss;
            stale_epochs = 0;
        } else {
            stale_epochs += 1;
            if stale_epochs >= config.patience {
                debug!(epoch, "loss did not improve, stopping");
                break;
            }
        }
    }

    Ok(())
}

fn predict_with<M>(model: &M, features: ArrayView2<f32>) -> Vec<usize>
where
    M: BatchModel,
{
    model
        .logits(features)
        .outer_iter()
        .map(|row| argmax(row))
        .collect()
}

fn seeded_rng(config: &TrainConfig) -> XorShiftRng {
    XorShiftRng::seed_from_u64(config.seed)
}

fn argmax(scores: ArrayView1<f32>) -> usize {
    scores
        .iter()
        .enumerate()
        .rev()
        .max_by_key(|&(_, &score)| OrderedFloat(score))
        .map(|(idx, _)| idx)
        .unwrap_or(0)
}

/// Apply the softmax function to every row, in place.
fn softmax_rows(logits: &mut Array2<f32>) {
    for mut row in logits.outer_iter_mut() {
        let max = row.fold(f32::NEG_INFINITY, |acc, &v| acc.max(v));
        row.mapv_inplace(|v| (v - max).exp());
        let sum = row.sum();
        row /= sum;
    }
}

/// Convert class probabilities into the gradient of the cross-entropy
/// loss with respect to the logits, returning the summed loss.
fn cross_entropy_gradient(probs: &mut Array2<f32>, targets: &[usize]) -> f32 {
    let mut loss = 0f32;
    for (mut row, &target) in probs.outer_iter_mut().zip(targets) {
        loss -= row[target].max(1e-12).ln();
        row[target] -= 1.0;
    }

    loss
}

fn column_sums(matrix: &Array2<f32>) -> Array1<f32> {
    matrix.sum_axis(Axis(0))
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use ndarray::{array, Array2, ArrayView2};

    use super::{
        argmax, seeded_rng, softmax_rows, train, BatchModel, ClassifierType, LrScheduleConfig,
        TrainConfig,
    };
    use crate::probe::ProbeError;

    /// Model with a fixed loss that records its learning rates.
    struct FixedLossModel {
        lrs: Vec<f32>,
    }

    impl BatchModel for FixedLossModel {
        fn logits(&self, inputs: ArrayView2<f32>) -> Array2<f32> {
            Array2::zeros((inputs.nrows(), 2))
        }

        fn step(&mut self, inputs: ArrayView2<f32>, _targets: &[usize], lr: f32, _l2: f32) -> f32 {
            self.lrs.push(lr);
            inputs.nrows() as f32
        }
    }

    fn plateau_config(patience: usize) -> TrainConfig {
        TrainConfig {
            max_epochs: 4,
            patience: 10,
            batch_size: 12,
            lr: LrScheduleConfig::Plateau {
                initial_lr: 0.1,
                scale: 0.5,
                patience,
                warmup_steps: 0,
            },
            ..TrainConfig::default()
        }
    }

    pub(crate) fn separable_data() -> (Array2<f32>, Vec<usize>) {
        let features = array![
            [2.0, 0.1],
            [1.8, -0.2],
            [2.2, 0.3],
            [1.9, 0.0],
            [-2.0, 0.2],
            [-1.7, -0.1],
            [-2.1, 0.1],
            [-1.9, -0.3],
            [0.1, 2.0],
            [-0.2, 1.9],
            [0.2, 2.2],
            [0.0, 1.8],
        ];
        let labels = vec![0, 0, 0, 0, 1, 1, 1, 1, 2, 2, 2, 2];
        (features, labels)
    }

    #[test]
    fn first_epoch_uses_initial_learning_rate() {
        let (features, labels) = separable_data();
        let config = plateau_config(1);
        let mut model = FixedLossModel { lrs: Vec::new() };
        train(
            &mut model,
            features.view(),
            &labels,
            &config,
            &mut seeded_rng(&config),
        )
        .unwrap();

        // One batch per epoch; the loss never improves after epoch 0.
        assert_eq!(model.lrs.len(), 4);
        assert_relative_eq!(model.lrs[0], 0.1);
        assert_relative_eq!(model.lrs[1], 0.1);
        assert_relative_eq!(model.lrs[2], 0.05);
        assert_relative_eq!(model.lrs[3], 0.025);
    }

    #[test]
    fn invalid_schedule_fails_training() {
        let (features, labels) = separable_data();
        let config = TrainConfig {
            lr: LrScheduleConfig::Constant { lr: 0.0 },
            ..TrainConfig::default()
        };
        let mut model = FixedLossModel { lrs: Vec::new() };
        assert!(train(
            &mut model,
            features.view(),
            &labels,
            &config,
            &mut seeded_rng(&config),
        )
        .is_err());
        assert!(model.lrs.is_empty());
    }

    #[test]
    fn argmax_prefers_first_maximum() {
        assert_eq!(argmax(array![0.1, 0.7, 0.7].view()), 1);
        assert_eq!(argmax(array![3.0, -1.0].view()), 0);
    }

    #[test]
    fn softmax_rows_sum_to_one() {
        let mut logits = array![[1.0, 2.0, 3.0], [1000.0, 1000.0, 0.0]];
        softmax_rows(&mut logits);
        for row in logits.outer_iter() {
            assert!((row.sum() - 1.0).abs() < 1e-6);
        }
        assert!((logits[[1, 0]] - 0.5).abs() < 1e-6);
    }

    #[test]
    fn classifier_type_names() {
        assert_eq!("SGD".parse::<ClassifierType>().unwrap(), ClassifierType::Sgd);
        assert_eq!("MLP".parse::<ClassifierType>().unwrap(), ClassifierType::Mlp);
        assert_eq!(ClassifierType::Mlp.to_string(), "MLP");
        assert_eq!(
            "SVM".parse::<ClassifierType>(),
            Err(ProbeError::InvalidClassifier {
                classifier: "SVM".to_string()
            })
        );
    }
}
