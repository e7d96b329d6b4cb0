//! Error types for siamese-oneshot.
//!
//! Precondition violations (class/category/batch checks) are raised before
//! any random draw and are never retried. Training-step and checkpoint
//! failures abort the run.

use std::path::PathBuf;

use thiserror::Error;

use crate::config::ConfigError;

/// Top-level error type.
#[derive(Debug, Error)]
pub enum Error {
    // ── Sampling preconditions ─────────────────────────────────────────
    #[error("Batch needs {requested} distinct classes but the split only has {available}")]
    InsufficientClasses { requested: usize, available: usize },

    #[error("Cannot form a different-class pair: the split has only {available} class(es)")]
    InsufficientDistinctClasses { available: usize },

    #[error("Category '{category}' has only {available} classes, fewer than the {requested} requested")]
    CategoryTooSmall {
        category: String,
        requested: usize,
        available: usize,
    },

    #[error("Unknown category: '{0}'")]
    UnknownCategory(String),

    #[error("Batch size must be a positive even number, got {0}")]
    InvalidBatchSize(usize),

    #[error("One-shot tasks need at least one way, got {0}")]
    InvalidWayCount(usize),

    #[error("Evaluation needs at least one task, got {0}")]
    InvalidTaskCount(usize),

    #[error("Need at least {required} examples per class, the split has {available}")]
    InsufficientExamples { required: usize, available: usize },

    #[error("Invalid training schedule: {0}")]
    InvalidSchedule(String),

    #[error("Invalid dataset: {0}")]
    InvalidDataset(String),

    // ── Model collaborator ─────────────────────────────────────────────
    #[error("Cannot build model: {0}")]
    InvalidModel(#[source] ModelError),

    #[error("Inference failed: {0}")]
    Inference(#[source] ModelError),

    #[error("Training step failed at iteration {iteration}: {source}")]
    TrainingStep {
        iteration: usize,
        #[source]
        source: ModelError,
    },

    #[error("Checkpoint I/O failed for {path}: {source}")]
    CheckpointIo {
        path: PathBuf,
        #[source]
        source: ModelError,
    },

    #[error("No checkpoint found in {0}")]
    NoCheckpoint(PathBuf),

    // ── Dataset loading ────────────────────────────────────────────────
    #[error("Failed to read dataset at {path}: {source}")]
    DatasetIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to decode image {path}: {source}")]
    ImageDecode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("Malformed dataset file {path}: {source}")]
    DatasetFormat {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

/// Failures raised by the model collaborator (training, inference, persistence).
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("Shape mismatch: expected {expected} inputs, got {actual}")]
    ShapeMismatch { expected: usize, actual: usize },

    #[error("Left and right batches differ in length ({left} vs {right})")]
    BatchMismatch { left: usize, right: usize },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid architecture: {0}")]
    InvalidArchitecture(String),

    #[error("Weights do not fit the architecture: {0}")]
    IncompatibleWeights(String),
}

/// Result type alias for siamese-oneshot.
pub type Result<T> = std::result::Result<T, Error>;
