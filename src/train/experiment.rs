use std::path::{Path, PathBuf};

use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::info;

use crate::config::ExperimentConfig;
use crate::data::dataset::{Dataset, SplitKind};
use crate::data::loader::load_dataset;
use crate::error::{Error, Result};
use crate::eval::evaluator::Evaluator;
use crate::network::model::TrainableModel;
use crate::network::siamese::SiameseNetwork;
use crate::optim::Optimizer;
use crate::train::checkpoint::Checkpointer;
use crate::train::evaluation_stats::TrainingSummary;
use crate::train::loop_fn::train_loop;
use crate::train::train_config::TrainConfig;

fn init_rng(config: &ExperimentConfig) -> StdRng {
    match config.training.seed {
        Some(seed) => StdRng::seed_from_u64(seed.wrapping_add(2)),
        None => StdRng::from_entropy(),
    }
}

fn optimizer(config: &ExperimentConfig) -> Box<dyn Optimizer> {
    let training = &config.training;
    training.optimizer.build(training.learning_rate, training.weight_decay)
}

/// Builds the siamese network described by `config`, seeded when a seed is set.
pub fn build_model(config: &ExperimentConfig) -> Result<SiameseNetwork> {
    SiameseNetwork::new(config.model.architecture(), optimizer(config), &mut init_rng(config))
        .map_err(Error::InvalidModel)
}

/// Loads the dataset, builds the model and runs the training loop.
pub fn run_experiment(config: &ExperimentConfig) -> Result<TrainingSummary> {
    let dataset = load_dataset(&config.data, config.model.height, config.model.width)?;
    let mut model = build_model(config)?;
    run_on_dataset(config, &dataset, &mut model)
}

/// Training for an already-loaded dataset and model.
pub fn run_on_dataset<M: TrainableModel + ?Sized>(
    config: &ExperimentConfig,
    dataset: &Dataset,
    model: &mut M,
) -> Result<TrainingSummary> {
    let checkpointer = Checkpointer::new(&config.output.checkpoint_dir, &config.output.final_dir, &config.model.name)?;
    let summary = train_loop(model, dataset, &TrainConfig::from(&config.training), &checkpointer)?;
    if let (Some(best), Some(iteration)) = (summary.best_accuracy, summary.best_iteration) {
        info!(best_accuracy = best, iteration, "Best validation accuracy {}% at iteration {}", best, iteration);
    }
    Ok(summary)
}

/// Newest `weights.<iteration>.json` in the configured checkpoint directory.
pub fn latest_checkpoint(config: &ExperimentConfig) -> Result<PathBuf> {
    let checkpointer = Checkpointer::new(&config.output.checkpoint_dir, &config.output.final_dir, &config.model.name)?;
    match checkpointer.latest()? {
        Some((iteration, path)) => {
            info!(iteration, path = %path.display(), "Using latest checkpoint");
            Ok(path)
        }
        None => Err(Error::NoCheckpoint(config.output.checkpoint_dir.clone())),
    }
}

/// Loads `weights` into a freshly built model and reports N-way accuracy.
///
/// The model comes from `architecture` (a file written at the end of
/// training) when given, otherwise from `config.model`.
pub fn evaluate_checkpoint(
    config: &ExperimentConfig,
    architecture: Option<&Path>,
    weights: &Path,
    split: SplitKind,
    category: Option<&str>,
) -> Result<f64> {
    let mut model = match architecture {
        Some(path) => SiameseNetwork::from_architecture(path, optimizer(config), &mut init_rng(config))
            .map_err(|source| Error::CheckpointIo { path: path.to_owned(), source })?,
        None => build_model(config)?,
    };
    let input = model.architecture().input;
    let dataset = load_dataset(&config.data, input.height, input.width)?;
    model.load_weights(weights).map_err(|source| Error::CheckpointIo {
        path: weights.to_owned(),
        source,
    })?;

    let training = &config.training;
    let mut evaluator = match training.seed {
        Some(seed) => Evaluator::with_seed(&dataset, seed.wrapping_add(1)),
        None => Evaluator::new(&dataset),
    };
    let accuracy = match category {
        Some(name) => evaluator.evaluate_in_category(&model, training.n_way, training.n_val, split, name)?,
        None => evaluator.evaluate(&model, training.n_way, training.n_val, split)?,
    };
    info!(
        accuracy,
        n_way = training.n_way,
        tasks = training.n_val,
        %split,
        "Got an average of {}% {} way one-shot learning accuracy", accuracy, training.n_way
    );
    Ok(accuracy)
}
