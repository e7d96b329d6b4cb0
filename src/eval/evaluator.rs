use tracing::debug;

use crate::data::dataset::{Dataset, SplitKind};
use crate::data::oneshot::{argmax, OneShotTaskGenerator};
use crate::error::{Error, ModelError, Result};
use crate::network::model::SimilarityModel;

/// Measures N-way one-shot accuracy of a similarity model.
///
/// A task counts as correct when the highest-scoring support slot (first
/// maximum on ties) is the slot holding the query's class. The model is
/// only ever read.
pub struct Evaluator<'a> {
    generator: OneShotTaskGenerator<'a>,
}

impl<'a> Evaluator<'a> {
    pub fn new(dataset: &'a Dataset) -> Self {
        Self { generator: OneShotTaskGenerator::new(dataset) }
    }

    pub fn with_seed(dataset: &'a Dataset, seed: u64) -> Self {
        Self { generator: OneShotTaskGenerator::with_seed(dataset, seed) }
    }

    /// Fails with the error `evaluate` would raise for these arguments,
    /// without drawing a task.
    pub fn validate(&self, n_way: usize, num_tasks: usize, split: SplitKind, category: Option<&str>) -> Result<()> {
        if num_tasks == 0 {
            return Err(Error::InvalidTaskCount(num_tasks));
        }
        self.generator.validate(n_way, split, category).map(|_| ())
    }

    /// Percentage of `num_tasks` random N-way tasks answered correctly.
    pub fn evaluate<M: SimilarityModel + ?Sized>(
        &mut self,
        model: &M,
        n_way: usize,
        num_tasks: usize,
        split: SplitKind,
    ) -> Result<f64> {
        self.run(model, n_way, num_tasks, split, None)
    }

    /// Same as `evaluate`, with every task drawn from one category's classes.
    pub fn evaluate_in_category<M: SimilarityModel + ?Sized>(
        &mut self,
        model: &M,
        n_way: usize,
        num_tasks: usize,
        split: SplitKind,
        category: &str,
    ) -> Result<f64> {
        self.run(model, n_way, num_tasks, split, Some(category))
    }

    fn run<M: SimilarityModel + ?Sized>(
        &mut self,
        model: &M,
        n_way: usize,
        num_tasks: usize,
        split: SplitKind,
        category: Option<&str>,
    ) -> Result<f64> {
        self.validate(n_way, num_tasks, split, category)?;
        debug!(
            tasks = num_tasks,
            n_way,
            %split,
            category = category.unwrap_or("any"),
            "Evaluating model on {} random {} way one-shot learning tasks", num_tasks, n_way
        );

        let mut n_correct = 0usize;
        for _ in 0..num_tasks {
            let task = self.generator.make_task(n_way, split, category)?;
            let scores = model.predict(&task.queries, &task.support).map_err(Error::Inference)?;
            if scores.len() != task.n_way() {
                return Err(Error::Inference(ModelError::ShapeMismatch {
                    expected: task.n_way(),
                    actual: scores.len(),
                }));
            }
            if argmax(&scores) == task.target_index() {
                n_correct += 1;
            }
        }

        let percent_correct = 100.0 * n_correct as f64 / num_tasks as f64;
        debug!(accuracy = percent_correct, n_way, "Got an average of {}% {} way one-shot learning accuracy", percent_correct, n_way);
        Ok(percent_correct)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::dataset::fixtures::{class_of, tagged_dataset};
    use crate::data::image::Image;

    /// Scores 1 for same-class pairs, so the true match always wins.
    struct Oracle;

    impl SimilarityModel for Oracle {
        fn predict(&self, left: &[Image], right: &[Image]) -> std::result::Result<Vec<f64>, ModelError> {
            Ok(left.iter().zip(right)
                .map(|(a, b)| if class_of(a) == class_of(b) { 1.0 } else { 0.0 })
                .collect())
        }
    }

    /// Every candidate looks the same.
    struct Indifferent;

    impl SimilarityModel for Indifferent {
        fn predict(&self, left: &[Image], _right: &[Image]) -> std::result::Result<Vec<f64>, ModelError> {
            Ok(vec![0.5; left.len()])
        }
    }

    struct Broken;

    impl SimilarityModel for Broken {
        fn predict(&self, left: &[Image], _right: &[Image]) -> std::result::Result<Vec<f64>, ModelError> {
            Err(ModelError::ShapeMismatch { expected: 0, actual: left.len() })
        }
    }

    #[test]
    fn oracle_scores_perfectly() {
        let dataset = tagged_dataset(30, 4);
        let mut evaluator = Evaluator::with_seed(&dataset, 17);
        for num_tasks in [1, 7, 250] {
            let acc = evaluator.evaluate(&Oracle, 20, num_tasks, SplitKind::Validation).unwrap();
            assert_eq!(acc, 100.0);
        }
    }

    #[test]
    fn constant_scores_give_chance_accuracy() {
        let dataset = tagged_dataset(10, 3);
        let mut evaluator = Evaluator::with_seed(&dataset, 99);
        let acc = evaluator.evaluate(&Indifferent, 4, 4000, SplitKind::Validation).unwrap();
        assert!((acc - 25.0).abs() < 3.0, "accuracy {acc}");
    }

    #[test]
    fn inference_failures_propagate() {
        let dataset = tagged_dataset(5, 2);
        let mut evaluator = Evaluator::with_seed(&dataset, 0);
        let err = evaluator.evaluate(&Broken, 3, 5, SplitKind::Train).unwrap_err();
        assert!(matches!(err, Error::Inference(_)));
    }

    /// Returns no scores at all.
    struct Silent;

    impl SimilarityModel for Silent {
        fn predict(&self, _left: &[Image], _right: &[Image]) -> std::result::Result<Vec<f64>, ModelError> {
            Ok(vec![])
        }
    }

    #[test]
    fn wrong_score_count_is_an_inference_error() {
        let dataset = tagged_dataset(6, 2);
        let mut evaluator = Evaluator::with_seed(&dataset, 12);
        let err = evaluator.evaluate(&Silent, 4, 400, SplitKind::Validation).unwrap_err();
        assert!(matches!(err, Error::Inference(ModelError::ShapeMismatch { expected: 4, actual: 0 })));
    }

    #[test]
    fn zero_tasks_is_rejected() {
        let dataset = tagged_dataset(5, 2);
        let mut evaluator = Evaluator::with_seed(&dataset, 0);
        assert!(matches!(
            evaluator.evaluate(&Oracle, 3, 0, SplitKind::Train),
            Err(Error::InvalidTaskCount(0))
        ));
    }

    #[test]
    fn category_evaluation_checks_the_category() {
        let dataset = tagged_dataset(6, 2);
        let mut evaluator = Evaluator::with_seed(&dataset, 4);
        assert_eq!(evaluator.evaluate_in_category(&Oracle, 6, 10, SplitKind::Train, "all").unwrap(), 100.0);
        assert!(matches!(
            evaluator.evaluate_in_category(&Oracle, 7, 10, SplitKind::Train, "all"),
            Err(Error::CategoryTooSmall { .. })
        ));
    }
}
