use failure::{ensure, Fallible};
use ndarray::{Array1, Array2, ArrayView2};
use rand::distributions::Uniform;
use rand::Rng;

use super::{
    check_training_data, column_sums, cross_entropy_gradient, predict_with, seeded_rng,
    softmax_rows, train, BatchModel, Classifier, TrainConfig,
};
use crate::probe::ProbeError;

struct MlpModel {
    hidden_weights: Array2<f32>,
    hidden_bias: Array1<f32>,
    output_weights: Array2<f32>,
    output_bias: Array1<f32>,
}

impl MlpModel {
    fn random<R>(n_features: usize, n_hidden: usize, n_classes: usize, rng: &mut R) -> Self
    where
        R: Rng,
    {
        MlpModel {
            hidden_weights: glorot_uniform(n_features, n_hidden, rng),
            hidden_bias: Array1::zeros(n_hidden),
            output_weights: glorot_uniform(n_hidden, n_classes, rng),
            output_bias: Array1::zeros(n_classes),
        }
    }

    fn hidden(&self, inputs: ArrayView2<f32>) -> Array2<f32> {
        inputs.dot(&self.hidden_weights) + &self.hidden_bias
    }
}

impl BatchModel for MlpModel {
    fn logits(&self, inputs: ArrayView2<f32>) -> Array2<f32> {
        let activations = self.hidden(inputs).mapv(relu);
        activations.dot(&self.output_weights) + &self.output_bias
    }

    fn step(&mut self, inputs: ArrayView2<f32>, targets: &[usize], lr: f32, l2: f32) -> f32 {
        let pre_activations = self.hidden(inputs);
        let activations = pre_activations.mapv(relu);

        let mut grad_output = activations.dot(&self.output_weights) + &self.output_bias;
        softmax_rows(&mut grad_output);
        let loss = cross_entropy_gradient(&mut grad_output, targets);

        let n = targets.len() as f32;
        let grad_output_weights = activations.t().dot(&grad_output) / n;
        let grad_output_bias = column_sums(&grad_output) / n;

        let mut grad_hidden = grad_output.dot(&self.output_weights.t());
        grad_hidden.zip_mut_with(&pre_activations, |grad, &pre| {
            if pre <= 0.0 {
                *grad = 0.0;
            }
        });
        let grad_hidden_weights = inputs.t().dot(&grad_hidden) / n;
        let grad_hidden_bias = column_sums(&grad_hidden) / n;

        let decay = 1.0 - lr * l2;
        self.output_weights *= decay;
        self.output_weights.scaled_add(-lr, &grad_output_weights);
        self.output_bias.scaled_add(-lr, &grad_output_bias);
        self.hidden_weights *= decay;
        self.hidden_weights.scaled_add(-lr, &grad_hidden_weights);
        self.hidden_bias.scaled_add(-lr, &grad_hidden_bias);

        loss
    }
}

fn relu(v: f32) -> f32 {
    v.max(0.0)
}

fn glorot_uniform<R>(fan_in: usize, fan_out: usize, rng: &mut R) -> Array2<f32>
where
    R: Rng,
{
    let limit = (6.0 / (fan_in + fan_out) as f32).sqrt();
    let dist = Uniform::new_inclusive(-limit, limit);
    Array2::from_shape_fn((fan_in, fan_out), |_| rng.sample(dist))
}

/// Multi-layer perceptron with a single ReLU hidden layer and a
/// softmax output layer.
pub struct MlpClassifier {
    config: TrainConfig,
    model: Option<MlpModel>,
}

impl MlpClassifier {
    pub fn new(config: TrainConfig) -> Self {
        MlpClassifier {
            config,
            model: None,
        }
    }
}

impl Classifier for MlpClassifier {
    fn fit(
        &mut self,
        features: ArrayView2<f32>,
        labels: &[usize],
        n_classes: usize,
    ) -> Fallible<()> {
        check_training_data(features, labels, n_classes)?;
        ensure!(
            self.config.hidden_units > 0,
            "The hidden layer must have at least one unit"
        );

        let mut rng = seeded_rng(&self.config);
        let mut model = MlpModel::random(
            features.ncols(),
            self.config.hidden_units,
            n_classes,
            &mut rng,
        );
        train(&mut model, features, labels, &self.config, &mut rng)?;
        self.model = Some(model);

        Ok(())
    }

    fn predict(&self, features: ArrayView2<f32>) -> Fallible<Vec<usize>> {
        let model = self.model.as_ref().ok_or(ProbeError::NotTrained)?;
        ensure!(
            features.ncols() == model.hidden_weights.nrows(),
            "Expected {} feature dimensions, got {}",
            model.hidden_weights.nrows(),
            features.ncols()
        );

        Ok(predict_with(model, features))
    }
}
