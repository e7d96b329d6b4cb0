use rand::rngs::StdRng;
use rand::seq::index;
use rand::{Rng, SeedableRng};

use crate::data::dataset::{Dataset, SplitKind};
use crate::data::image::Image;
use crate::error::{Error, Result};

/// One training batch of image pairs.
///
/// The first half of the batch holds different-class pairs (label 0), the
/// second half same-class pairs (label 1). The order is fixed, never shuffled.
#[derive(Debug, Clone)]
pub struct PairBatch {
    pub left: Vec<Image>,
    pub right: Vec<Image>,
    pub labels: Vec<f64>,
    /// Class of each left image.
    pub left_classes: Vec<usize>,
    /// Class of each right image.
    pub right_classes: Vec<usize>,
}

impl PairBatch {
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

/// Draws balanced same/different-class pairs for siamese training.
pub struct PairSampler<'a> {
    dataset: &'a Dataset,
    rng: StdRng,
}

impl<'a> PairSampler<'a> {
    pub fn new(dataset: &'a Dataset) -> Self {
        Self { dataset, rng: StdRng::from_entropy() }
    }

    /// Fixed seed for reproducible batches.
    pub fn with_seed(dataset: &'a Dataset, seed: u64) -> Self {
        Self { dataset, rng: StdRng::seed_from_u64(seed) }
    }

    /// Samples `batch_size` pairs from `split`.
    ///
    /// `batch_size` distinct anchor classes are drawn without replacement.
    /// Anchors in the first half are paired with another class, chosen by a
    /// random non-zero offset modulo the class count; anchors in the second
    /// half are paired with themselves. Example indices are drawn
    /// independently for every image.
    pub fn sample_batch(&mut self, batch_size: usize, split: SplitKind) -> Result<PairBatch> {
        let dataset = self.dataset;
        let images = &dataset.split(split).images;
        let n_classes = images.n_classes();
        let n_examples = images.examples_per_class();

        if batch_size == 0 || batch_size % 2 != 0 {
            return Err(Error::InvalidBatchSize(batch_size));
        }
        if n_classes < 2 {
            return Err(Error::InsufficientDistinctClasses { available: n_classes });
        }
        if batch_size > n_classes {
            return Err(Error::InsufficientClasses { requested: batch_size, available: n_classes });
        }

        let anchors = index::sample(&mut self.rng, n_classes, batch_size).into_vec();
        let half = batch_size / 2;

        let mut batch = PairBatch {
            left: Vec::with_capacity(batch_size),
            right: Vec::with_capacity(batch_size),
            labels: Vec::with_capacity(batch_size),
            left_classes: Vec::with_capacity(batch_size),
            right_classes: Vec::with_capacity(batch_size),
        };

        for (i, &class) in anchors.iter().enumerate() {
            let idx_1 = self.rng.gen_range(0..n_examples);
            let idx_2 = self.rng.gen_range(0..n_examples);

            let (other, label) = if i < half {
                ((class + self.rng.gen_range(1..n_classes)) % n_classes, 0.0)
            } else {
                (class, 1.0)
            };

            batch.left.push(images.image(class, idx_1).clone());
            batch.right.push(images.image(other, idx_2).clone());
            batch.labels.push(label);
            batch.left_classes.push(class);
            batch.right_classes.push(other);
        }

        Ok(batch)
    }

    /// Endless stream of batches; each item is an independent `sample_batch` call.
    pub fn batches(&mut self, batch_size: usize, split: SplitKind) -> PairBatches<'_, 'a> {
        PairBatches { sampler: self, batch_size, split }
    }
}

pub struct PairBatches<'s, 'a> {
    sampler: &'s mut PairSampler<'a>,
    batch_size: usize,
    split: SplitKind,
}

impl Iterator for PairBatches<'_, '_> {
    type Item = Result<PairBatch>;

    fn next(&mut self) -> Option<Self::Item> {
        Some(self.sampler.sample_batch(self.batch_size, self.split))
    }
}
