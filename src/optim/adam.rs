use crate::layers::dense::{DenseLayer, LayerGradients};
use crate::math::matrix::Matrix;
use crate::optim::Optimizer;

/// First and second moment estimates for one layer.
struct Moments {
    m_w: Matrix,
    v_w: Matrix,
    m_b: Matrix,
    v_b: Matrix,
}

/// Adam (adaptive moment estimation) with optional L2 weight decay folded
/// into the weight gradient.
///
/// Moments are allocated lazily on the first step and indexed by the
/// position of each layer in the slice passed to `step`, so callers must
/// pass layers in a stable order.
pub struct Adam {
    pub learning_rate: f64,
    pub beta1: f64,
    pub beta2: f64,
    pub epsilon: f64,
    pub weight_decay: f64,
    t: i32,
    moments: Vec<Moments>,
}

impl Adam {
    pub fn new(learning_rate: f64) -> Adam {
        Adam {
            learning_rate,
            beta1: 0.9,
            beta2: 0.999,
            epsilon: 1e-8,
            weight_decay: 0.0,
            t: 0,
            moments: Vec::new(),
        }
    }

    pub fn with_weight_decay(mut self, weight_decay: f64) -> Adam {
        self.weight_decay = weight_decay;
        self
    }

    fn update(&self, param: &Matrix, grad: &Matrix, m: &mut Matrix, v: &mut Matrix) -> Matrix {
        let (b1, b2) = (self.beta1, self.beta2);
        *m = m.zip_map(grad, |m, g| b1 * m + (1.0 - b1) * g);
        *v = v.zip_map(grad, |v, g| b2 * v + (1.0 - b2) * g * g);

        let m_correction = 1.0 - b1.powi(self.t);
        let v_correction = 1.0 - b2.powi(self.t);
        let step = m.zip_map(v, |m, v| {
            let m_hat = m / m_correction;
            let v_hat = v / v_correction;
            self.learning_rate * m_hat / (v_hat.sqrt() + self.epsilon)
        });
        param.zip_map(&step, |p, s| p - s)
    }
}

impl Optimizer for Adam {
    fn step(&mut self, layers: &mut [&mut DenseLayer], grads: &[LayerGradients]) {
        if self.moments.len() != layers.len() {
            self.moments = layers.iter()
                .map(|layer| Moments {
                    m_w: Matrix::zeros(layer.weights.rows, layer.weights.cols),
                    v_w: Matrix::zeros(layer.weights.rows, layer.weights.cols),
                    m_b: Matrix::zeros(layer.biases.rows, layer.biases.cols),
                    v_b: Matrix::zeros(layer.biases.rows, layer.biases.cols),
                })
                .collect();
            self.t = 0;
        }
        self.t += 1;

        let mut moments = std::mem::take(&mut self.moments);
        for ((layer, grad), state) in layers.iter_mut().zip(grads).zip(moments.iter_mut()) {
            let wd = self.weight_decay;
            let w_grad = grad.weights.zip_map(&layer.weights, |g, w| g + wd * w);
            layer.weights = self.update(&layer.weights, &w_grad, &mut state.m_w, &mut state.v_w);
            layer.biases = self.update(&layer.biases, &grad.biases, &mut state.m_b, &mut state.v_b);
        }
        self.moments = moments;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::activation::ActivationFunction;

    #[test]
    fn first_step_is_learning_rate_sized() {
        let mut layer = DenseLayer {
            size: 1,
            weights: Matrix::from_data(vec![vec![1.0]]),
            biases: Matrix::row(vec![0.0]),
            activator: ActivationFunction::Identity,
        };
        let grads = LayerGradients {
            weights: Matrix::from_data(vec![vec![5.0]]),
            biases: Matrix::row(vec![-3.0]),
        };
        Adam::new(0.01).step(&mut [&mut layer], &[grads]);
        // Bias-corrected first step is ±lr regardless of gradient magnitude.
        assert!((layer.weights.data[0][0] - 0.99).abs() < 1e-6);
        assert!((layer.biases.data[0][0] - 0.01).abs() < 1e-6);
    }
}
