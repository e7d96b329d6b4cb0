use crate::config::TrainingConfig;

/// Configuration for a `train_loop` run.
///
/// # Fields
/// - `n_iter`:         number of training batches
/// - `batch_size`:     pairs per batch; even, at most the train class count
/// - `evaluate_every`: evaluate and checkpoint on iterations divisible by this
/// - `n_way`, `n_val`: N-way tasks and how many of them per evaluation
/// - `seed`:           seeds the pair sampler and the task generator
pub struct TrainConfig {
    pub n_iter: usize,
    pub batch_size: usize,
    pub evaluate_every: usize,
    pub n_way: usize,
    pub n_val: usize,
    pub seed: Option<u64>,
}

impl TrainConfig {
    /// Creates an unseeded `TrainConfig`.
    pub fn new(n_iter: usize, batch_size: usize, evaluate_every: usize, n_way: usize, n_val: usize) -> Self {
        TrainConfig {
            n_iter,
            batch_size,
            evaluate_every,
            n_way,
            n_val,
            seed: None,
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }
}

impl From<&TrainingConfig> for TrainConfig {
    fn from(config: &TrainingConfig) -> Self {
        TrainConfig {
            n_iter: config.n_iter,
            batch_size: config.batch_size,
            evaluate_every: config.evaluate_every,
            n_way: config.n_way,
            n_val: config.n_val,
            seed: config.seed,
        }
    }
}
