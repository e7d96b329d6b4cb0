//! Experiment configuration, read from TOML.
//!
//! Every field has a default, so an empty file (or no file) reproduces the
//! reference Omniglot run: 20 000 iterations of 32-pair batches, 20-way
//! validation over 250 tasks every 2 000 iterations.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::activation::ActivationFunction;
use crate::data::loader::DatasetFormat;
use crate::network::spec::{ArchitectureSpec, InputShape};
use crate::optim::OptimizerKind;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExperimentConfig {
    #[serde(default)]
    pub data: DataConfig,
    #[serde(default)]
    pub training: TrainingConfig,
    #[serde(default)]
    pub model: ModelConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataConfig {
    #[serde(default = "default_train_dir")]
    pub train_dir: PathBuf,
    #[serde(default = "default_val_dir")]
    pub val_dir: PathBuf,
    #[serde(default)]
    pub format: DatasetFormat,
}

fn default_train_dir() -> PathBuf {
    PathBuf::from("images_background")
}

fn default_val_dir() -> PathBuf {
    PathBuf::from("images_evaluation")
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            train_dir: default_train_dir(),
            val_dir: default_val_dir(),
            format: DatasetFormat::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingConfig {
    #[serde(default = "default_n_iter")]
    pub n_iter: usize,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_evaluate_every")]
    pub evaluate_every: usize,
    /// N in N-way validation tasks.
    #[serde(default = "default_n_way")]
    pub n_way: usize,
    /// Number of one-shot tasks per validation run.
    #[serde(default = "default_n_val")]
    pub n_val: usize,
    #[serde(default = "default_learning_rate")]
    pub learning_rate: f64,
    #[serde(default)]
    pub optimizer: OptimizerKind,
    #[serde(default = "default_weight_decay")]
    pub weight_decay: f64,
    /// Seeds model init and all samplers; entropy when absent.
    #[serde(default)]
    pub seed: Option<u64>,
}

fn default_n_iter() -> usize {
    20_000
}

fn default_batch_size() -> usize {
    32
}

fn default_evaluate_every() -> usize {
    2_000
}

fn default_n_way() -> usize {
    20
}

fn default_n_val() -> usize {
    250
}

fn default_learning_rate() -> f64 {
    6e-5
}

fn default_weight_decay() -> f64 {
    2e-4
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            n_iter: default_n_iter(),
            batch_size: default_batch_size(),
            evaluate_every: default_evaluate_every(),
            n_way: default_n_way(),
            n_val: default_n_val(),
            learning_rate: default_learning_rate(),
            optimizer: OptimizerKind::default(),
            weight_decay: default_weight_decay(),
            seed: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    #[serde(default = "default_model_name")]
    pub name: String,
    #[serde(default = "default_side")]
    pub height: usize,
    #[serde(default = "default_side")]
    pub width: usize,
    #[serde(default = "default_hidden")]
    pub hidden: Vec<usize>,
    #[serde(default = "default_embedding")]
    pub embedding: usize,
    #[serde(default = "default_activation")]
    pub activation: ActivationFunction,
}

fn default_model_name() -> String {
    "oneshot".to_string()
}

fn default_side() -> usize {
    105
}

fn default_hidden() -> Vec<usize> {
    vec![512, 256]
}

fn default_embedding() -> usize {
    128
}

fn default_activation() -> ActivationFunction {
    ActivationFunction::ReLU
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            name: default_model_name(),
            height: default_side(),
            width: default_side(),
            hidden: default_hidden(),
            embedding: default_embedding(),
            activation: default_activation(),
        }
    }
}

impl ModelConfig {
    pub fn architecture(&self) -> ArchitectureSpec {
        let input = InputShape { height: self.height, width: self.width, channels: 1 };
        ArchitectureSpec::siamese(&self.name, input, &self.hidden, self.embedding, self.activation)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Per-iteration weight checkpoints.
    #[serde(default = "default_checkpoint_dir")]
    pub checkpoint_dir: PathBuf,
    /// Final architecture, weights and full model.
    #[serde(default = "default_final_dir")]
    pub final_dir: PathBuf,
}

fn default_checkpoint_dir() -> PathBuf {
    PathBuf::from("checkpoints")
}

fn default_final_dir() -> PathBuf {
    PathBuf::from("finalModel")
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            checkpoint_dir: default_checkpoint_dir(),
            final_dir: default_final_dir(),
        }
    }
}

impl ExperimentConfig {
    /// Load configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::FileRead {
            path: path.to_owned(),
            source: e,
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.to_owned(),
            source: e,
        })
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    FileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}
