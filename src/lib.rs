pub mod activation;
pub mod config;
pub mod data;
pub mod error;
pub mod eval;
pub mod layers;
pub mod loss;
pub mod math;
pub mod network;
pub mod optim;
pub mod train;

// Convenience re-exports
pub use config::ExperimentConfig;
pub use data::{ClassImageSet, CategoryRange, Dataset, Image, OneShotTask, OneShotTaskGenerator, PairBatch, PairSampler, Split, SplitKind};
pub use error::{Error, ModelError, Result};
pub use eval::Evaluator;
pub use network::{ArchitectureSpec, SiameseNetwork, SimilarityModel, TrainableModel};
pub use train::{train_loop, Checkpointer, TrainConfig, TrainingSummary};
