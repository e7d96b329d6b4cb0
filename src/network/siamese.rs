use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use rand::Rng;
use serde::{Serialize, Deserialize};

use crate::data::image::Image;
use crate::data::pairs::PairBatch;
use crate::error::ModelError;
use crate::layers::dense::{DenseLayer, LayerCache, LayerGradients};
use crate::loss::bce::BceLoss;
use crate::math::matrix::Matrix;
use crate::network::encoder::Encoder;
use crate::network::model::{SimilarityModel, TrainableModel};
use crate::network::spec::{ArchitectureSpec, LayerSpec};
use crate::optim::Optimizer;

/// Trainable parameters, the content of a weights checkpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiameseWeights {
    pub encoder: Encoder,
    pub head: DenseLayer,
}

/// Architecture and weights in one file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SavedModel {
    pub architecture: ArchitectureSpec,
    pub weights: SiameseWeights,
}

/// Twin dense encoder with an L1-distance similarity head.
///
/// `score(a, b) = σ(w · |enc(a) − enc(b)| + b)`, trained with binary
/// cross-entropy against same-class (1) / different-class (0) labels.
pub struct SiameseNetwork {
    architecture: ArchitectureSpec,
    weights: SiameseWeights,
    optimizer: Box<dyn Optimizer>,
}

/// Forward-pass record for one pair.
struct PairTrace {
    left: Vec<LayerCache>,
    right: Vec<LayerCache>,
    /// `enc(left) − enc(right)`, whose sign routes the distance gradient.
    diff: Vec<f64>,
    head: LayerCache,
    score: f64,
}

impl SiameseNetwork {
    pub fn new<R: Rng + ?Sized>(
        architecture: ArchitectureSpec,
        optimizer: Box<dyn Optimizer>,
        rng: &mut R,
    ) -> Result<SiameseNetwork, ModelError> {
        architecture.validate().map_err(ModelError::InvalidArchitecture)?;
        let encoder = Encoder::new(&architecture.encoder, rng);
        let head = DenseLayer::new(architecture.head.size, architecture.head.input_size, architecture.head.activation, rng);
        Ok(SiameseNetwork {
            architecture,
            weights: SiameseWeights { encoder, head },
            optimizer,
        })
    }

    /// Untrained network for an architecture file written by `save_architecture`.
    /// Pair with `load_weights` to restore a run.
    pub fn from_architecture<R: Rng + ?Sized>(
        path: &Path,
        optimizer: Box<dyn Optimizer>,
        rng: &mut R,
    ) -> Result<SiameseNetwork, ModelError> {
        SiameseNetwork::new(ArchitectureSpec::load_json(path)?, optimizer, rng)
    }

    /// Restores a network from a file written by `save_model`.
    pub fn from_saved(path: &Path, optimizer: Box<dyn Optimizer>) -> Result<SiameseNetwork, ModelError> {
        let saved: SavedModel = serde_json::from_reader(BufReader::new(File::open(path)?))?;
        check_compatible(&saved.architecture, &saved.weights)?;
        Ok(SiameseNetwork {
            architecture: saved.architecture,
            weights: saved.weights,
            optimizer,
        })
    }

    pub fn architecture(&self) -> &ArchitectureSpec {
        &self.architecture
    }

    fn checked_input(&self, image: &Image) -> Result<Vec<f64>, ModelError> {
        let expected = self.architecture.input.flat_len();
        if image.len() != expected {
            return Err(ModelError::ShapeMismatch { expected, actual: image.len() });
        }
        Ok(image.to_input())
    }

    fn score(&self, left: &Image, right: &Image) -> Result<f64, ModelError> {
        let encoder = &self.weights.encoder;
        let a = encoder.embed(self.checked_input(left)?);
        let b = encoder.embed(self.checked_input(right)?);
        let distance: Vec<f64> = a.iter().zip(&b).map(|(x, y)| (x - y).abs()).collect();
        Ok(self.weights.head.forward(Matrix::row(distance)).output.data[0][0])
    }

    fn trace(&self, left: &Image, right: &Image) -> Result<PairTrace, ModelError> {
        let encoder = &self.weights.encoder;
        let (a, left_caches) = encoder.forward(self.checked_input(left)?);
        let (b, right_caches) = encoder.forward(self.checked_input(right)?);
        let diff: Vec<f64> = a.data[0].iter().zip(&b.data[0]).map(|(x, y)| x - y).collect();
        let head = self.weights.head.forward(Matrix::row(diff.iter().map(|d| d.abs()).collect()));
        let score = head.output.data[0][0];
        Ok(PairTrace { left: left_caches, right: right_caches, diff, head, score })
    }
}

fn check_pairs(left: &[Image], right: &[Image]) -> Result<(), ModelError> {
    if left.len() != right.len() {
        return Err(ModelError::BatchMismatch { left: left.len(), right: right.len() });
    }
    Ok(())
}

fn layer_spec(layer: &DenseLayer) -> LayerSpec {
    LayerSpec { size: layer.size, input_size: layer.input_size(), activation: layer.activator }
}

fn check_compatible(architecture: &ArchitectureSpec, weights: &SiameseWeights) -> Result<(), ModelError> {
    let encoder: Vec<LayerSpec> = weights.encoder.layers.iter().map(layer_spec).collect();
    if encoder != architecture.encoder || layer_spec(&weights.head) != architecture.head {
        return Err(ModelError::IncompatibleWeights(format!(
            "weights describe encoder {:?} / head {:?}, architecture '{}' expects {:?} / {:?}",
            encoder, layer_spec(&weights.head), architecture.name, architecture.encoder, architecture.head
        )));
    }
    Ok(())
}

impl SimilarityModel for SiameseNetwork {
    fn predict(&self, left: &[Image], right: &[Image]) -> Result<Vec<f64>, ModelError> {
        check_pairs(left, right)?;
        left.iter().zip(right).map(|(a, b)| self.score(a, b)).collect()
    }
}

impl TrainableModel for SiameseNetwork {
    fn train_step(&mut self, batch: &PairBatch) -> Result<f64, ModelError> {
        check_pairs(&batch.left, &batch.right)?;
        if batch.labels.len() != batch.left.len() {
            return Err(ModelError::BatchMismatch { left: batch.left.len(), right: batch.labels.len() });
        }

        let encoder = &self.weights.encoder;
        let head = &self.weights.head;
        let mut encoder_grads: Vec<LayerGradients> = encoder.layers.iter().map(LayerGradients::zeros_like).collect();
        let mut head_grads = LayerGradients::zeros_like(head);
        let mut scores = Vec::with_capacity(batch.len());

        for ((left, right), &label) in batch.left.iter().zip(&batch.right).zip(&batch.labels) {
            let trace = self.trace(left, right)?;
            scores.push(trace.score);

            // σ'(z) cancels against the BCE derivative.
            let logit_delta = Matrix::row(vec![BceLoss::logit_gradient(trace.score, label)]);
            let (grads, distance_delta) = head.backward_linear(&trace.head, logit_delta);
            head_grads.accumulate(&grads);

            // d|a−b|/da = sign(a−b), d|a−b|/db = −sign(a−b)
            let signs: Vec<f64> = trace.diff.iter()
                .map(|&d| if d > 0.0 { 1.0 } else if d < 0.0 { -1.0 } else { 0.0 })
                .collect();
            let left_delta = distance_delta.zip_map(&Matrix::row(signs), |g, s| g * s);
            let right_delta = left_delta.map(|g| -g);

            encoder.backward(&trace.left, left_delta, &mut encoder_grads);
            encoder.backward(&trace.right, right_delta, &mut encoder_grads);
        }

        let inv_batch = 1.0 / batch.len().max(1) as f64;
        let mut grads: Vec<LayerGradients> = encoder_grads.iter().map(|g| g.scaled(inv_batch)).collect();
        grads.push(head_grads.scaled(inv_batch));

        let mut layers: Vec<&mut DenseLayer> = self.weights.encoder.layers.iter_mut()
            .chain(std::iter::once(&mut self.weights.head))
            .collect();
        self.optimizer.step(&mut layers, &grads);

        Ok(BceLoss::loss(&scores, &batch.labels))
    }

    fn save_weights(&self, path: &Path) -> Result<(), ModelError> {
        serde_json::to_writer(BufWriter::new(File::create(path)?), &self.weights)?;
        Ok(())
    }

    fn load_weights(&mut self, path: &Path) -> Result<(), ModelError> {
        let weights: SiameseWeights = serde_json::from_reader(BufReader::new(File::open(path)?))?;
        check_compatible(&self.architecture, &weights)?;
        self.weights = weights;
        Ok(())
    }

    fn save_architecture(&self, path: &Path) -> Result<(), ModelError> {
        self.architecture.save_json(path)
    }

    fn save_model(&self, path: &Path) -> Result<(), ModelError> {
        let saved = SavedModel {
            architecture: self.architecture.clone(),
            weights: self.weights.clone(),
        };
        serde_json::to_writer(BufWriter::new(File::create(path)?), &saved)?;
        Ok(())
    }
}
