use crate::layers::dense::{DenseLayer, LayerGradients};
use crate::optim::Optimizer;

/// Plain SGD with optional L2 weight decay on the weights (not the biases).
pub struct Sgd {
    pub learning_rate: f64,
    pub weight_decay: f64,
}

impl Sgd {
    pub fn new(learning_rate: f64) -> Sgd {
        Sgd { learning_rate, weight_decay: 0.0 }
    }

    pub fn with_weight_decay(mut self, weight_decay: f64) -> Sgd {
        self.weight_decay = weight_decay;
        self
    }
}

impl Optimizer for Sgd {
    fn step(&mut self, layers: &mut [&mut DenseLayer], grads: &[LayerGradients]) {
        let lr = self.learning_rate;
        let wd = self.weight_decay;
        for (layer, grad) in layers.iter_mut().zip(grads) {
            layer.weights = layer.weights.zip_map(&grad.weights, |w, g| w - lr * (g + wd * w));
            layer.biases = layer.biases.zip_map(&grad.biases, |b, g| b - lr * g);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::activation::ActivationFunction;
    use crate::math::Matrix;

    #[test]
    fn step_moves_against_gradient() {
        let mut layer = DenseLayer {
            size: 1,
            weights: Matrix::from_data(vec![vec![1.0]]),
            biases: Matrix::row(vec![0.0]),
            activator: ActivationFunction::Identity,
        };
        let grads = LayerGradients {
            weights: Matrix::from_data(vec![vec![2.0]]),
            biases: Matrix::row(vec![-1.0]),
        };
        Sgd::new(0.1).step(&mut [&mut layer], &[grads]);
        assert!((layer.weights.data[0][0] - 0.8).abs() < 1e-12);
        assert!((layer.biases.data[0][0] - 0.1).abs() < 1e-12);
    }
}
