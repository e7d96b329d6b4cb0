use rand::Rng;
use serde::{Serialize, Deserialize};

use crate::layers::dense::{DenseLayer, LayerCache, LayerGradients};
use crate::math::matrix::Matrix;
use crate::network::spec::LayerSpec;

/// The shared twin branch: a stack of dense layers mapping a flattened image
/// to an embedding.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Encoder {
    pub layers: Vec<DenseLayer>,
}

impl Encoder {
    pub fn new<R: Rng + ?Sized>(specs: &[LayerSpec], rng: &mut R) -> Encoder {
        let layers = specs.iter()
            .map(|spec| DenseLayer::new(spec.size, spec.input_size, spec.activation, rng))
            .collect();
        Encoder { layers }
    }

    pub fn input_size(&self) -> usize {
        self.layers.first().map_or(0, DenseLayer::input_size)
    }

    /// Forward pass returning the embedding and per-layer caches for backprop.
    pub fn forward(&self, input: Vec<f64>) -> (Matrix, Vec<LayerCache>) {
        let mut caches: Vec<LayerCache> = Vec::with_capacity(self.layers.len());
        let mut current = Matrix::row(input);
        for layer in &self.layers {
            let cache = layer.forward(current);
            current = cache.output.clone();
            caches.push(cache);
        }
        (current, caches)
    }

    /// Inference-only forward pass.
    pub fn embed(&self, input: Vec<f64>) -> Vec<f64> {
        self.layers.iter()
            .fold(Matrix::row(input), |x, layer| layer.forward(x).output)
            .into_row()
    }

    /// Adds this sample's gradients into `acc` (one entry per layer).
    pub fn backward(&self, caches: &[LayerCache], delta: Matrix, acc: &mut [LayerGradients]) {
        let mut delta = delta;
        for i in (0..self.layers.len()).rev() {
            let (grads, upstream) = self.layers[i].backward(&caches[i], &delta);
            acc[i].accumulate(&grads);
            delta = upstream;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::activation::ActivationFunction;
    use rand::{rngs::StdRng, SeedableRng};

    #[test]
    fn embed_matches_forward() {
        let specs = vec![
            LayerSpec { size: 3, input_size: 4, activation: ActivationFunction::ReLU },
            LayerSpec { size: 2, input_size: 3, activation: ActivationFunction::Sigmoid },
        ];
        let encoder = Encoder::new(&specs, &mut StdRng::seed_from_u64(4));
        let input = vec![0.1, 0.5, 0.9, 0.3];
        let (embedding, caches) = encoder.forward(input.clone());
        assert_eq!(caches.len(), 2);
        assert_eq!(embedding.into_row(), encoder.embed(input));
        assert_eq!(encoder.input_size(), 4);
    }
}
