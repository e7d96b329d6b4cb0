use std::path::PathBuf;

use serde::{Serialize, Deserialize};

/// Statistics recorded at every evaluation point of `train_loop`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationStats {
    /// 1-based iteration at which the evaluation ran.
    pub iteration: usize,
    /// Total iterations requested for this run.
    pub total_iterations: usize,
    /// Loss of the training batch at this iteration.
    pub train_loss: f64,
    /// N-way one-shot validation accuracy in percent.
    pub val_accuracy: f64,
    /// Best validation accuracy so far, this evaluation included.
    pub best_accuracy: f64,
    /// Weights checkpoint written for this iteration.
    pub checkpoint: PathBuf,
    /// Wall-clock time since training started, in milliseconds.
    pub elapsed_ms: u64,
}

/// Paths of the artifacts written after the last iteration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinalArtifacts {
    pub architecture: PathBuf,
    pub weights: PathBuf,
    /// Architecture and weights in one file, for the export step.
    pub model: PathBuf,
}

/// Outcome of a completed `train_loop` run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingSummary {
    pub iterations: usize,
    pub evaluations: Vec<EvaluationStats>,
    /// Every checkpoint written, in iteration order. None are pruned.
    pub checkpoints: Vec<PathBuf>,
    /// `None` when no evaluation ran.
    pub best_accuracy: Option<f64>,
    pub best_iteration: Option<usize>,
    pub final_artifacts: FinalArtifacts,
}
