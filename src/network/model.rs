use std::path::Path;

use crate::data::image::Image;
use crate::data::pairs::PairBatch;
use crate::error::ModelError;

/// Inference side of a pairwise similarity model.
pub trait SimilarityModel {
    /// Scores each `(left[i], right[i])` pair; higher means more similar.
    fn predict(&self, left: &[Image], right: &[Image]) -> Result<Vec<f64>, ModelError>;
}

/// Training and persistence side of the model collaborator.
pub trait TrainableModel: SimilarityModel {
    /// One gradient update on `batch`; returns the batch loss.
    fn train_step(&mut self, batch: &PairBatch) -> Result<f64, ModelError>;

    fn save_weights(&self, path: &Path) -> Result<(), ModelError>;

    fn load_weights(&mut self, path: &Path) -> Result<(), ModelError>;

    /// Writes the architecture description (no weights).
    fn save_architecture(&self, path: &Path) -> Result<(), ModelError>;

    /// Writes a self-contained model file: architecture plus weights.
    fn save_model(&self, path: &Path) -> Result<(), ModelError>;
}
