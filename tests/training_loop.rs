use std::cell::Cell;
use std::path::Path;

use siamese_oneshot::config::ExperimentConfig;
use siamese_oneshot::data::loader::{save_json_split, DatasetFormat};
use siamese_oneshot::train::{evaluate_checkpoint, latest_checkpoint, run_experiment};
use siamese_oneshot::{
    train_loop, Checkpointer, ClassImageSet, Dataset, Error, Image, ModelError, PairBatch,
    SimilarityModel, Split, SplitKind, TrainConfig, TrainableModel,
};
use tempfile::TempDir;

/// 2×2 images; pixel 0 holds the class, pixel 1 the example index.
fn tagged_split(n_classes: u8, n_examples: u8) -> Split {
    let classes = (0..n_classes)
        .map(|c| (0..n_examples).map(|e| Image::new(2, 2, vec![c, e, 0, 0]).unwrap()).collect())
        .collect();
    Split::uncategorised(ClassImageSet::new(classes).unwrap())
}

fn tagged_dataset(n_classes: u8, n_examples: u8) -> Dataset {
    Dataset {
        train: tagged_split(n_classes, n_examples),
        validation: tagged_split(n_classes, n_examples),
    }
}

/// Scores same-class pairs 1.0, so every one-shot task is answered correctly.
#[derive(Default)]
struct RecordingModel {
    train_steps: Cell<usize>,
    fail_train: bool,
    fail_save: bool,
}

impl SimilarityModel for RecordingModel {
    fn predict(&self, left: &[Image], right: &[Image]) -> Result<Vec<f64>, ModelError> {
        Ok(left.iter().zip(right)
            .map(|(a, b)| if a.pixels[0] == b.pixels[0] { 1.0 } else { 0.0 })
            .collect())
    }
}

impl TrainableModel for RecordingModel {
    fn train_step(&mut self, batch: &PairBatch) -> Result<f64, ModelError> {
        if self.fail_train {
            return Err(ModelError::BatchMismatch { left: batch.left.len(), right: 0 });
        }
        self.train_steps.set(self.train_steps.get() + 1);
        Ok(0.5)
    }

    fn save_weights(&self, path: &Path) -> Result<(), ModelError> {
        if self.fail_save {
            return Err(ModelError::Io(std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only")));
        }
        std::fs::write(path, "weights")?;
        Ok(())
    }

    fn load_weights(&mut self, _path: &Path) -> Result<(), ModelError> {
        Ok(())
    }

    fn save_architecture(&self, path: &Path) -> Result<(), ModelError> {
        std::fs::write(path, "architecture")?;
        Ok(())
    }

    fn save_model(&self, path: &Path) -> Result<(), ModelError> {
        std::fs::write(path, "model")?;
        Ok(())
    }
}

fn checkpointer(dir: &TempDir) -> Checkpointer {
    Checkpointer::new(&dir.path().join("checkpoints"), &dir.path().join("final"), "oneshot").unwrap()
}

#[test]
fn single_iteration_evaluates_once_and_saves_everything() {
    let dir = TempDir::new().unwrap();
    let dataset = tagged_dataset(6, 3);
    let mut model = RecordingModel::default();
    let config = TrainConfig::new(1, 4, 1, 3, 10).with_seed(1);

    let summary = train_loop(&mut model, &dataset, &config, &checkpointer(&dir)).unwrap();

    assert_eq!(model.train_steps.get(), 1);
    assert_eq!(summary.evaluations.len(), 1);
    assert_eq!(summary.evaluations[0].iteration, 1);
    assert_eq!(summary.evaluations[0].val_accuracy, 100.0);

    let expected = dir.path().join("checkpoints").join("weights.1.json");
    assert_eq!(summary.checkpoints, vec![expected.clone()]);
    assert!(expected.exists());
    assert_eq!(std::fs::read_dir(dir.path().join("checkpoints")).unwrap().count(), 1);

    let artifacts = &summary.final_artifacts;
    assert!(artifacts.architecture.exists());
    assert!(artifacts.weights.exists());
    assert!(artifacts.model.exists());
    assert_ne!(artifacts.weights, expected);
}

#[test]
fn checkpoints_follow_the_evaluation_schedule_and_are_all_kept() {
    let dir = TempDir::new().unwrap();
    let dataset = tagged_dataset(8, 2);
    let mut model = RecordingModel::default();
    let config = TrainConfig::new(7, 2, 3, 4, 5).with_seed(2);

    let summary = train_loop(&mut model, &dataset, &config, &checkpointer(&dir)).unwrap();

    assert_eq!(model.train_steps.get(), 7);
    let iterations: Vec<usize> = summary.evaluations.iter().map(|s| s.iteration).collect();
    assert_eq!(iterations, vec![3, 6]);
    assert!(summary.checkpoints.iter().all(|p| p.exists()));
    assert_eq!(summary.checkpoints.len(), 2);
}

#[test]
fn ties_make_the_latest_evaluation_the_best() {
    let dir = TempDir::new().unwrap();
    let dataset = tagged_dataset(6, 2);
    let mut model = RecordingModel::default();
    let config = TrainConfig::new(4, 2, 1, 3, 3).with_seed(3);

    let summary = train_loop(&mut model, &dataset, &config, &checkpointer(&dir)).unwrap();

    assert_eq!(summary.best_accuracy, Some(100.0));
    assert_eq!(summary.best_iteration, Some(4));
}

#[test]
fn no_evaluation_means_no_best() {
    let dir = TempDir::new().unwrap();
    let dataset = tagged_dataset(4, 2);
    let mut model = RecordingModel::default();
    let config = TrainConfig::new(2, 2, 5, 3, 3);

    let summary = train_loop(&mut model, &dataset, &config, &checkpointer(&dir)).unwrap();

    assert!(summary.evaluations.is_empty());
    assert_eq!(summary.best_accuracy, None);
    assert!(summary.final_artifacts.weights.exists());
}

#[test]
fn train_step_failure_aborts_before_any_artifact() {
    let dir = TempDir::new().unwrap();
    let dataset = tagged_dataset(4, 2);
    let mut model = RecordingModel { fail_train: true, ..Default::default() };
    let config = TrainConfig::new(3, 2, 1, 2, 2);

    let err = train_loop(&mut model, &dataset, &config, &checkpointer(&dir)).unwrap_err();

    assert!(matches!(err, Error::TrainingStep { iteration: 1, .. }));
    assert!(!dir.path().join("final").join("oneshot_weights.json").exists());
}

#[test]
fn checkpoint_failure_is_fatal() {
    let dir = TempDir::new().unwrap();
    let dataset = tagged_dataset(4, 2);
    let mut model = RecordingModel { fail_save: true, ..Default::default() };
    let config = TrainConfig::new(3, 2, 1, 2, 2);

    let err = train_loop(&mut model, &dataset, &config, &checkpointer(&dir)).unwrap_err();

    match err {
        Error::CheckpointIo { path, .. } => assert!(path.ends_with("weights.1.json")),
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(model.train_steps.get(), 1);
}

#[test]
fn sampling_preconditions_abort_the_run() {
    let dir = TempDir::new().unwrap();
    let dataset = tagged_dataset(3, 2);
    let mut model = RecordingModel::default();
    let config = TrainConfig::new(1, 4, 1, 2, 2);

    let err = train_loop(&mut model, &dataset, &config, &checkpointer(&dir)).unwrap_err();
    assert!(matches!(err, Error::InsufficientClasses { requested: 4, available: 3 }));
}

#[test]
fn evaluation_settings_are_checked_before_training() {
    let dir = TempDir::new().unwrap();
    let dataset = Dataset { train: tagged_split(8, 2), validation: tagged_split(3, 2) };
    let mut model = RecordingModel::default();
    let config = TrainConfig::new(10, 2, 5, 4, 3);

    let err = train_loop(&mut model, &dataset, &config, &checkpointer(&dir)).unwrap_err();

    assert!(matches!(err, Error::InsufficientClasses { requested: 4, available: 3 }));
    assert_eq!(model.train_steps.get(), 0);
    assert_eq!(std::fs::read_dir(dir.path().join("checkpoints")).unwrap().count(), 0);

    let config = TrainConfig::new(10, 2, 5, 3, 0);
    let err = train_loop(&mut model, &dataset, &config, &checkpointer(&dir)).unwrap_err();
    assert!(matches!(err, Error::InvalidTaskCount(0)));
    assert_eq!(model.train_steps.get(), 0);
}

#[test]
fn zero_evaluation_interval_is_rejected() {
    let dir = TempDir::new().unwrap();
    let dataset = tagged_dataset(4, 2);
    let mut model = RecordingModel::default();
    let config = TrainConfig::new(1, 2, 0, 2, 2);

    assert!(matches!(
        train_loop(&mut model, &dataset, &config, &checkpointer(&dir)),
        Err(Error::InvalidSchedule(_))
    ));
}

#[test]
fn empty_checkpoint_directory_has_no_latest() {
    let dir = TempDir::new().unwrap();
    let mut config = ExperimentConfig::default();
    config.output.checkpoint_dir = dir.path().join("checkpoints");
    config.output.final_dir = dir.path().join("final");

    match latest_checkpoint(&config).unwrap_err() {
        Error::NoCheckpoint(path) => assert_eq!(path, dir.path().join("checkpoints")),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn siamese_network_end_to_end_from_json_dataset() {
    let dir = TempDir::new().unwrap();
    let train_path = dir.path().join("train.json");
    let val_path = dir.path().join("val.json");
    save_json_split(&tagged_split(6, 3), &train_path).unwrap();
    save_json_split(&tagged_split(5, 3), &val_path).unwrap();

    let mut config = ExperimentConfig::default();
    config.data.format = DatasetFormat::Json;
    config.data.train_dir = train_path;
    config.data.val_dir = val_path;
    config.model.height = 2;
    config.model.width = 2;
    config.model.hidden = vec![4];
    config.model.embedding = 3;
    config.training.n_iter = 4;
    config.training.batch_size = 4;
    config.training.evaluate_every = 2;
    config.training.n_way = 3;
    config.training.n_val = 6;
    config.training.learning_rate = 0.01;
    config.training.seed = Some(11);
    config.output.checkpoint_dir = dir.path().join("checkpoints");
    config.output.final_dir = dir.path().join("finalModel");

    let summary = run_experiment(&config).unwrap();
    assert_eq!(summary.checkpoints.len(), 2);
    assert!(summary.final_artifacts.model.exists());
    for stats in &summary.evaluations {
        assert!((0.0..=100.0).contains(&stats.val_accuracy));
    }

    let latest = latest_checkpoint(&config).unwrap();
    assert_eq!(latest, dir.path().join("checkpoints").join("weights.4.json"));
    assert_eq!(latest, summary.checkpoints[1]);

    let artifacts = &summary.final_artifacts;
    let accuracy = evaluate_checkpoint(&config, None, &artifacts.weights, SplitKind::Validation, None).unwrap();
    assert!((0.0..=100.0).contains(&accuracy));

    let restored = evaluate_checkpoint(
        &config,
        Some(artifacts.architecture.as_path()),
        &summary.checkpoints[1],
        SplitKind::Validation,
        Some("all"),
    ).unwrap();
    assert!((0.0..=100.0).contains(&restored));
}
