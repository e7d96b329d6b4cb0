use rand::Rng;
use serde::{Serialize, Deserialize};

use crate::{math::matrix::Matrix, activation::activation::ActivationFunction};

/// Fully-connected layer computing `σ(x · W + b)`.
///
/// Unlike a layer that stashes its last activations, the forward pass here
/// is `&self` and hands back a [`LayerCache`]. Both branches of the siamese
/// twin run through the same weights, so each branch keeps its own cache.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DenseLayer {
    pub size: usize,
    /// Shape `input_size × size`.
    pub weights: Matrix,
    /// Shape `1 × size`.
    pub biases: Matrix,
    pub activator: ActivationFunction,
}

/// Values recorded by one forward pass, consumed by `backward`.
#[derive(Debug, Clone)]
pub struct LayerCache {
    pub input: Matrix,
    /// Pre-activation z = xW + b, needed for the activation derivative.
    pub pre_activation: Matrix,
    pub output: Matrix,
}

/// Weight and bias gradients for one layer.
#[derive(Debug, Clone, PartialEq)]
pub struct LayerGradients {
    pub weights: Matrix,
    pub biases: Matrix,
}

impl LayerGradients {
    pub fn zeros_like(layer: &DenseLayer) -> LayerGradients {
        LayerGradients {
            weights: Matrix::zeros(layer.weights.rows, layer.weights.cols),
            biases: Matrix::zeros(layer.biases.rows, layer.biases.cols),
        }
    }

    pub fn accumulate(&mut self, other: &LayerGradients) {
        self.weights.add_assign(&other.weights);
        self.biases.add_assign(&other.biases);
    }

    pub fn scaled(&self, factor: f64) -> LayerGradients {
        LayerGradients {
            weights: self.weights.map(|x| x * factor),
            biases: self.biases.map(|x| x * factor),
        }
    }
}

impl DenseLayer {
    /// He init for ReLU-family activations, Xavier otherwise; zero biases.
    pub fn new<R: Rng + ?Sized>(size: usize, input_size: usize, activation: ActivationFunction, rng: &mut R) -> DenseLayer {
        let weights = if activation.prefers_he_init() {
            Matrix::he(input_size, size, rng)
        } else {
            Matrix::xavier(input_size, size, rng)
        };

        DenseLayer {
            size,
            weights,
            biases: Matrix::zeros(1, size),
            activator: activation,
        }
    }

    pub fn input_size(&self) -> usize {
        self.weights.rows
    }

    pub fn forward(&self, input: Matrix) -> LayerCache {
        let z = &input * &self.weights + self.biases.clone();
        let a = z.map(|x| self.activator.function(x));
        LayerCache {
            input,
            pre_activation: z,
            output: a,
        }
    }

    /// Back-propagates `delta` (∂L/∂a for this layer's output).
    ///
    /// Returns this layer's gradients and ∂L/∂x for the layer below.
    pub fn backward(&self, cache: &LayerCache, delta: &Matrix) -> (LayerGradients, Matrix) {
        // δ = error ⊙ σ'(z)
        let act_derivative = cache.pre_activation.map(|x| self.activator.derivative(x));
        let layer_delta = delta.zip_map(&act_derivative, |e, d| e * d);
        self.backward_linear(cache, layer_delta)
    }

    /// Like `backward`, but `layer_delta` is already ∂L/∂z (e.g. a sigmoid
    /// output trained with BCE, where σ' cancels).
    pub fn backward_linear(&self, cache: &LayerCache, layer_delta: Matrix) -> (LayerGradients, Matrix) {
        let weights_grad = &cache.input.transpose() * &layer_delta;
        let upstream = &layer_delta * &self.weights.transpose();

        (
            LayerGradients { weights: weights_grad, biases: layer_delta },
            upstream,
        )
    }
}
