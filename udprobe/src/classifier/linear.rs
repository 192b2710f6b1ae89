use failure::{ensure, Fallible};
use ndarray::{Array1, Array2, ArrayView2};

use super::{
    check_training_data, column_sums, cross_entropy_gradient, predict_with, seeded_rng,
    softmax_rows, train, BatchModel, Classifier, TrainConfig,
};
use crate::probe::ProbeError;

struct LinearModel {
    weights: Array2<f32>,
    bias: Array1<f32>,
}

impl LinearModel {
    fn zeros(n_features: usize, n_classes: usize) -> Self {
        LinearModel {
            weights: Array2::zeros((n_features, n_classes)),
            bias: Array1::zeros(n_classes),
        }
    }
}

impl BatchModel for LinearModel {
    fn logits(&self, inputs: ArrayView2<f32>) -> Array2<f32> {
        inputs.dot(&self.weights) + &self.bias
    }

    fn step(&mut self, inputs: ArrayView2<f32>, targets: &[usize], lr: f32, l2: f32) -> f32 {
        let mut grad = self.logits(inputs);
        softmax_rows(&mut grad);
        let loss = cross_entropy_gradient(&mut grad, targets);

        let n = targets.len() as f32;
        let grad_weights = inputs.t().dot(&grad) / n;
        let grad_bias = column_sums(&grad) / n;

        self.weights *= 1.0 - lr * l2;
        self.weights.scaled_add(-lr, &grad_weights);
        self.bias.scaled_add(-lr, &grad_bias);

        loss
    }
}

/// Multinomial logistic regression, trained with stochastic gradient
/// descent and L2 regularization.
pub struct SgdClassifier {
    config: TrainConfig,
    model: Option<LinearModel>,
}

impl SgdClassifier {
    pub fn new(config: TrainConfig) -> Self {
        SgdClassifier {
            config,
            model: None,
        }
    }
}

impl Classifier for SgdClassifier {
    fn fit(
        &mut self,
        features: ArrayView2<f32>,
        labels: &[usize],
        n_classes: usize,
    ) -> Fallible<()> {
        check_training_data(features, labels, n_classes)?;

        let mut rng = seeded_rng(&self.config);
        let mut model = LinearModel::zeros(features.ncols(), n_classes);
        train(&mut model, features, labels, &self.config, &mut rng)?;
        self.model = Some(model);

        Ok(())
    }

    fn predict(&self, features: ArrayView2<f32>) -> Fallible<Vec<usize>> {
        let model = self.model.as_ref().ok_or(ProbeError::NotTrained)?;
        ensure!(
            features.ncols() == model.weights.nrows(),
            "Expected {} feature dimensions, got {}",
            model.weights.nrows(),
            features.ncols()
        );

        Ok(predict_with(model, features))
    }
}
