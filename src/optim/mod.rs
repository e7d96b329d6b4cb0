pub mod adam;
pub mod sgd;

pub use adam::Adam;
pub use sgd::Sgd;

use serde::{Deserialize, Serialize};

use crate::layers::dense::{DenseLayer, LayerGradients};

/// Applies one parameter update given batch-averaged gradients.
///
/// `layers` and `grads` are parallel slices.
pub trait Optimizer {
    fn step(&mut self, layers: &mut [&mut DenseLayer], grads: &[LayerGradients]);
}

/// Optimizer selection as written in the experiment config.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum OptimizerKind {
    #[default]
    Adam,
    Sgd,
}

impl OptimizerKind {
    pub fn build(self, learning_rate: f64, weight_decay: f64) -> Box<dyn Optimizer> {
        match self {
            OptimizerKind::Adam => Box::new(Adam::new(learning_rate).with_weight_decay(weight_decay)),
            OptimizerKind::Sgd => Box::new(Sgd::new(learning_rate).with_weight_decay(weight_decay)),
        }
    }
}
