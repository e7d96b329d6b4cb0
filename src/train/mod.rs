pub mod checkpoint;
pub mod evaluation_stats;
pub mod experiment;
pub mod loop_fn;
pub mod train_config;

pub use checkpoint::Checkpointer;
pub use evaluation_stats::{EvaluationStats, FinalArtifacts, TrainingSummary};
pub use experiment::{build_model, evaluate_checkpoint, latest_checkpoint, run_experiment, run_on_dataset};
pub use loop_fn::train_loop;
pub use train_config::TrainConfig;
