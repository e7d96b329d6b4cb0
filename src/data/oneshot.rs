//! N-way one-shot task generation.

use rand::rngs::StdRng;
use rand::seq::{index, SliceRandom};
use rand::{Rng, SeedableRng};

use crate::data::dataset::{CategoryRange, Dataset, SplitKind};
use crate::data::image::Image;
use crate::error::{Error, Result};

/// One N-way trial: a query compared against N support images, exactly one
/// of which shares the query's class.
#[derive(Debug, Clone)]
pub struct OneShotTask {
    /// The query image replicated N times, positionally paired with `support`.
    pub queries: Vec<Image>,
    pub support: Vec<Image>,
    /// One-hot; the 1 marks the support image matching the query.
    pub targets: Vec<f64>,
    pub query_class: usize,
    pub support_classes: Vec<usize>,
}

impl OneShotTask {
    pub fn n_way(&self) -> usize {
        self.targets.len()
    }

    /// Position of the matching support image (first maximum of `targets`).
    pub fn target_index(&self) -> usize {
        argmax(&self.targets)
    }
}

/// Index of the first maximum. Ties resolve to the earliest position.
pub fn argmax(values: &[f64]) -> usize {
    let mut best = 0;
    for (i, &v) in values.iter().enumerate().skip(1) {
        if v > values[best] {
            best = i;
        }
    }
    best
}

pub struct OneShotTaskGenerator<'a> {
    dataset: &'a Dataset,
    rng: StdRng,
}

impl<'a> OneShotTaskGenerator<'a> {
    pub fn new(dataset: &'a Dataset) -> Self {
        Self { dataset, rng: StdRng::from_entropy() }
    }

    pub fn with_seed(dataset: &'a Dataset, seed: u64) -> Self {
        Self { dataset, rng: StdRng::seed_from_u64(seed) }
    }

    /// Checks that `split` can supply `n_way` tasks and returns the class
    /// range they are drawn from. No randomness is consumed.
    pub fn validate(&self, n_way: usize, split: SplitKind, category: Option<&str>) -> Result<CategoryRange> {
        let split = self.dataset.split(split);
        let images = &split.images;
        let n_examples = images.examples_per_class();

        if n_way == 0 {
            return Err(Error::InvalidWayCount(n_way));
        }
        if n_examples < 2 {
            return Err(Error::InsufficientExamples { required: 2, available: n_examples });
        }

        let range = match category {
            Some(name) => {
                let range = split.category(name)?;
                if n_way > range.len() {
                    return Err(Error::CategoryTooSmall {
                        category: name.to_string(),
                        requested: n_way,
                        available: range.len(),
                    });
                }
                range
            }
            None => {
                if n_way > images.n_classes() {
                    return Err(Error::InsufficientClasses {
                        requested: n_way,
                        available: images.n_classes(),
                    });
                }
                CategoryRange { low: 0, high: images.n_classes() }
            }
        };
        Ok(range)
    }

    /// Builds one N-way task from `split`, optionally restricted to the
    /// classes of `category`.
    ///
    /// The first of the N drawn classes is the true class; its query and its
    /// support entry are two different examples. Targets, queries and support
    /// are then permuted together so the matching slot is uniform over `0..N`.
    pub fn make_task(&mut self, n_way: usize, split: SplitKind, category: Option<&str>) -> Result<OneShotTask> {
        let range = self.validate(n_way, split, category)?;
        let dataset = self.dataset;
        let images = &dataset.split(split).images;
        let n_examples = images.examples_per_class();

        let classes: Vec<usize> = index::sample(&mut self.rng, range.len(), n_way)
            .into_iter()
            .map(|offset| range.low + offset)
            .collect();
        let true_class = classes[0];

        let drawn = index::sample(&mut self.rng, n_examples, 2);
        let (query_example, match_example) = (drawn.index(0), drawn.index(1));
        let query = images.image(true_class, query_example);

        let mut support = Vec::with_capacity(n_way);
        let mut targets = vec![0.0; n_way];
        targets[0] = 1.0;
        support.push(images.image(true_class, match_example).clone());
        for &class in &classes[1..] {
            let example = self.rng.gen_range(0..n_examples);
            support.push(images.image(class, example).clone());
        }

        let mut order: Vec<usize> = (0..n_way).collect();
        order.shuffle(&mut self.rng);

        Ok(OneShotTask {
            queries: vec![query.clone(); n_way],
            support: order.iter().map(|&i| support[i].clone()).collect(),
            targets: order.iter().map(|&i| targets[i]).collect(),
            query_class: true_class,
            support_classes: order.iter().map(|&i| classes[i]).collect(),
        })
    }
}
