//! Learning rate schedules.

use std::f32;

use failure::{ensure, Fallible};
use serde_derive::{Deserialize, Serialize};

/// Trait for learning rate schedules.
///
/// A learning rate schedule determines the learning rate at a given
/// epoch and at a given optimizer step.
pub trait LearningRateSchedule {
    /// Compute the learning rate for an epoch.
    fn compute_epoch_learning_rate(&mut self, epoch: usize, last_score: f32) -> f32;

    /// Compute the learning rate for the current step.
    fn compute_step_learning_rate(&mut self, global_step: usize) -> f32;
}

/// Constant learning rate schedule.
pub struct ConstantLearningRate(f32);

impl ConstantLearningRate {
    pub fn new(lr: f32) -> Fallible<Self> {
        ensure!(lr > 0.0, "Learning rate must be a positive value, was: {}", lr);

        Ok(ConstantLearningRate(lr))
    }
}

impl LearningRateSchedule for ConstantLearningRate {
    fn compute_epoch_learning_rate(&mut self, _epoch: usize, _last_score: f32) -> f32 {
        self.0
    }

    fn compute_step_learning_rate(&mut self, _global_step: usize) -> f32 {
        self.0
    }
}

/// Exponential decay learning rate schedule.
///
/// *lr = initial_lr * decay_rate ^ (epoch / decay_epochs)*
///
/// With `staircase`, the exponent uses integer division, so that the
/// learning rate only changes every `decay_epochs` epochs. During the
/// first `warmup_steps` steps the learning rate increases linearly
/// from 0 to `initial_lr`.
pub struct ExponentialDecay {
    initial_lr: f32,
    lr: f32,
    decay_rate: f32,
    decay_epochs: usize,
    warmup_steps: usize,
    staircase: bool,
}

impl ExponentialDecay {
    pub fn new(
        initial_lr: f32,
        decay_rate: f32,
        decay_epochs: usize,
        staircase: bool,
        warmup_steps: usize,
    ) -> Fallible<Self> {
        ensure!(
            initial_lr > 0.0,
            "The initial learning rate must be a positive value, was: {}",
            initial_lr
        );
        ensure!(
            decay_rate > 0.0 && decay_rate < 1.0,
            "The decay rate must be in (0, 1), was: {}",
            decay_rate
        );
        ensure!(decay_epochs > 0, "The number of decay epochs should be non-zero");

        Ok(ExponentialDecay {
            lr: initial_lr,
            initial_lr,
            decay_rate,
            decay_epochs,
            staircase,
            warmup_steps,
        })
    }
}

impl LearningRateSchedule for ExponentialDecay {
    fn compute_epoch_learning_rate(&mut self, epoch: usize, _last_score: f32) -> f32 {
        let exponent = if self.staircase {
            (epoch / self.decay_epochs) as f32
        } else {
            epoch as f32 / self.decay_epochs as f32
        };

        self.lr = self.initial_lr * self.decay_rate.powf(exponent);
        self.lr
    }

    fn compute_step_learning_rate(&mut self, global_step: usize) -> f32 {
        warmup(self.lr, self.warmup_steps, global_step)
    }
}

/// Plateau learning rate schedule.
///
/// The learning rate is multiplied by `scale` when the score did not
/// improve for `max_patience` epochs. With a `max_patience` of zero,
/// every epoch without improvement scales the learning rate.
pub struct PlateauLearningRate {
    lr: f32,
    scale: f32,
    best_score: f32,
    patience: usize,
    max_patience: usize,
    warmup_steps: usize,
}

impl PlateauLearningRate {
    pub fn new(
        initial_lr: f32,
        scale: f32,
        max_patience: usize,
        warmup_steps: usize,
    ) -> Fallible<Self> {
        ensure!(
            initial_lr > 0.0,
            "The initial learning rate must be a positive value, was: {}",
            initial_lr
        );
        ensure!(
            scale > 0.0 && scale <= 1.0,
            "The learning rate scale must be in (0, 1], was: {}",
            scale
        );

        Ok(PlateauLearningRate {
            lr: initial_lr,
            scale,
            best_score: -f32::INFINITY,
            patience: 0,
            max_patience,
            warmup_steps,
        })
    }
}

impl LearningRateSchedule for PlateauLearningRate {
    fn compute_epoch_learning_rate(&mut self, _epoch: usize, last_score: f32) -> f32 {
        if last_score > self.best_score {
            self.best_score = last_score;
            self.patience = 0;
        } else {
            self.patience += 1;

            if self.patience >= self.max_patience {
                self.lr *= self.scale;
                self.patience = 0;
            }
        }

        self.lr
    }

    fn compute_step_learning_rate(&mut self, global_step: usize) -> f32 {
        warmup(self.lr, self.warmup_steps, global_step)
    }
}

fn warmup(lr: f32, warmup_steps: usize, global_step: usize) -> f32 {
    if global_step < warmup_steps {
        (lr / (warmup_steps as f32)) * global_step as f32
    } else {
        lr
    }
}

/// Learning rate schedule configuration.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(rename_all = "lowercase", tag = "schedule", deny_unknown_fields)]
pub enum LrScheduleConfig {
    Constant {
        lr: f32,
    },
    Exponential {
        initial_lr: f32,
        decay_rate: f32,
        decay_epochs: usize,
        #[serde(default)]
        staircase: bool,
        #[serde(default)]
        warmup_steps: usize,
    },
    Plateau {
        initial_lr: f32,
        scale: f32,
        patience: usize,
        #[serde(default)]
        warmup_steps: usize,
    },
}

impl Default for LrScheduleConfig {
    fn default() -> Self {
        LrScheduleConfig::Plateau {
            initial_lr: 0.05,
            scale: 0.5,
            patience: 2,
            warmup_steps: 0,
        }
    }
}

impl LrScheduleConfig {
    /// Construct the configured schedule.
    ///
    /// Fails when the schedule settings are out of range.
    pub fn to_schedule(&self) -> Fallible<Box<dyn LearningRateSchedule>> {
        let schedule: Box<dyn LearningRateSchedule> = match *self {
            LrScheduleConfig::Constant { lr } => Box::new(ConstantLearningRate::new(lr)?),
            LrScheduleConfig::Exponential {
                initial_lr,
                decay_rate,
                decay_epochs,
                staircase,
                warmup_steps,
            } => Box::new(ExponentialDecay::new(
                initial_lr,
                decay_rate,
                decay_epochs,
                staircase,
                warmup_steps,
            )?),
            LrScheduleConfig::Plateau {
                initial_lr,
                scale,
                patience,
                warmup_steps,
            } => Box::new(PlateauLearningRate::new(
                initial_lr,
                scale,
                patience,
                warmup_steps,
            )?),
        };

        Ok(schedule)
    }
}
