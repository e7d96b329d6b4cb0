use std::time::Instant;

use tracing::info;

use crate::data::dataset::{Dataset, SplitKind};
use crate::data::pairs::PairSampler;
use crate::error::{Error, Result};
use crate::eval::evaluator::Evaluator;
use crate::network::model::TrainableModel;
use crate::train::checkpoint::Checkpointer;
use crate::train::evaluation_stats::{EvaluationStats, TrainingSummary};
use crate::train::train_config::TrainConfig;

// ---------------------------------------------------------------------------
// Public entry point
// ---------------------------------------------------------------------------

/// Trains `model` for `config.n_iter` batches and writes the final artifacts.
///
/// Every iteration draws one pair batch from the train split and hands it to
/// `model.train_step`. On iterations divisible by `config.evaluate_every` the
/// model is evaluated on `n_val` random `n_way` one-shot tasks from the
/// validation split and a weights checkpoint tagged with the iteration is
/// written. The best-accuracy tracker moves on `>=`, so the most recent of
/// equally good evaluations is reported as best.
///
/// # Errors
/// `n_way` and `n_val` are checked against the validation split before the
/// first iteration. Any later failure (batch sampling, the train step,
/// evaluation, checkpoint I/O) aborts the run. Checkpoints already written
/// stay on disk.
pub fn train_loop<M: TrainableModel + ?Sized>(
    model: &mut M,
    dataset: &Dataset,
    config: &TrainConfig,
    checkpointer: &Checkpointer,
) -> Result<TrainingSummary> {
    if config.evaluate_every == 0 {
        return Err(Error::InvalidSchedule("evaluate_every must be at least 1".into()));
    }

    let (mut sampler, mut evaluator) = match config.seed {
        Some(seed) => (
            PairSampler::with_seed(dataset, seed),
            Evaluator::with_seed(dataset, seed.wrapping_add(1)),
        ),
        None => (PairSampler::new(dataset), Evaluator::new(dataset)),
    };
    evaluator.validate(config.n_way, config.n_val, SplitKind::Validation, None)?;

    // Below any reachable accuracy.
    let mut best = -1.0_f64;
    let mut best_iteration = None;
    let mut evaluations = Vec::new();
    let mut checkpoints = Vec::new();

    info!(
        iterations = config.n_iter,
        batch_size = config.batch_size,
        evaluate_every = config.evaluate_every,
        n_way = config.n_way,
        "Starting training process"
    );
    let t_start = Instant::now();

    for iteration in 1..=config.n_iter {
        let batch = sampler.sample_batch(config.batch_size, SplitKind::Train)?;
        let loss = model
            .train_step(&batch)
            .map_err(|source| Error::TrainingStep { iteration, source })?;

        if iteration % config.evaluate_every != 0 {
            continue;
        }

        let elapsed = t_start.elapsed();
        info!(
            iteration,
            minutes = elapsed.as_secs_f64() / 60.0,
            train_loss = loss,
            "Time for {} iterations: {:.2} mins", iteration, elapsed.as_secs_f64() / 60.0
        );

        let val_accuracy = evaluator.evaluate(&*model, config.n_way, config.n_val, SplitKind::Validation)?;
        info!(
            iteration,
            accuracy = val_accuracy,
            "Got an average of {}% {} way one-shot learning accuracy", val_accuracy, config.n_way
        );

        let checkpoint = checkpointer.save(&*model, iteration)?;

        if val_accuracy >= best {
            info!(current = val_accuracy, previous = best, "Current best: {}, previous best: {}", val_accuracy, best);
            best = val_accuracy;
            best_iteration = Some(iteration);
        }

        let stats = EvaluationStats {
            iteration,
            total_iterations: config.n_iter,
            train_loss: loss,
            val_accuracy,
            best_accuracy: best,
            checkpoint: checkpoint.clone(),
            elapsed_ms: elapsed.as_millis() as u64,
        };
        checkpoints.push(checkpoint);
        evaluations.push(stats);
    }

    let final_artifacts = checkpointer.save_final(&*model)?;
    info!(
        architecture = %final_artifacts.architecture.display(),
        weights = %final_artifacts.weights.display(),
        model = %final_artifacts.model.display(),
        "Model saved"
    );

    Ok(TrainingSummary {
        iterations: config.n_iter,
        evaluations,
        checkpoints,
        best_accuracy: best_iteration.map(|_| best),
        best_iteration,
        final_artifacts,
    })
}
