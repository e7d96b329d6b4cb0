pub struct BceLoss;

const EPS: f64 = 1e-12;

impl BceLoss {
    /// Mean BCE over a batch of similarity scores: -mean(y·log(p+ε) + (1-y)·log(1-p+ε))
    pub fn loss(predicted: &[f64], expected: &[f64]) -> f64 {
        if predicted.is_empty() {
            return 0.0;
        }
        let n = predicted.len() as f64;
        predicted.iter().zip(expected.iter())
            .map(|(p, y)| -(y * (p + EPS).ln() + (1.0 - y) * (1.0 - p + EPS).ln()))
            .sum::<f64>() / n
    }

    /// Gradient of the per-sample BCE with respect to the logit feeding a
    /// sigmoid output. The sigmoid Jacobian cancels, leaving `p - y`.
    pub fn logit_gradient(predicted: f64, expected: f64) -> f64 {
        predicted - expected
    }
}
