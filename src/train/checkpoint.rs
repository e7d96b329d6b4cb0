use std::ffi::OsString;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{Error, ModelError, Result};
use crate::network::model::TrainableModel;
use crate::train::evaluation_stats::FinalArtifacts;

/// Writes per-iteration weight checkpoints and the final model artifacts.
///
/// Each iteration gets its own file (`weights.<iteration>.json`); older
/// checkpoints are never removed or overwritten.
pub struct Checkpointer {
    directory: PathBuf,
    final_directory: PathBuf,
    name: String,
}

impl Checkpointer {
    /// Creates both directories if needed.
    pub fn new(directory: &Path, final_directory: &Path, name: &str) -> Result<Self> {
        for dir in [directory, final_directory] {
            std::fs::create_dir_all(dir).map_err(|source| Error::CheckpointIo {
                path: dir.to_owned(),
                source: ModelError::Io(source),
            })?;
        }

        Ok(Self {
            directory: directory.to_owned(),
            final_directory: final_directory.to_owned(),
            name: name.to_string(),
        })
    }

    pub fn path_for_iteration(&self, iteration: usize) -> PathBuf {
        self.directory.join(format!("weights.{}.json", iteration))
    }

    pub fn final_artifacts(&self) -> FinalArtifacts {
        FinalArtifacts {
            architecture: self.final_directory.join(format!("{}_architecture.json", self.name)),
            weights: self.final_directory.join(format!("{}_weights.json", self.name)),
            model: self.final_directory.join(format!("{}_model.json", self.name)),
        }
    }

    pub fn save<M: TrainableModel + ?Sized>(&self, model: &M, iteration: usize) -> Result<PathBuf> {
        let path = self.path_for_iteration(iteration);
        model.save_weights(&path).map_err(checkpoint_error(&path))?;
        debug!(iteration, path = %path.display(), "Checkpoint written");
        Ok(path)
    }

    pub fn save_final<M: TrainableModel + ?Sized>(&self, model: &M) -> Result<FinalArtifacts> {
        let artifacts = self.final_artifacts();
        model.save_architecture(&artifacts.architecture).map_err(checkpoint_error(&artifacts.architecture))?;
        model.save_weights(&artifacts.weights).map_err(checkpoint_error(&artifacts.weights))?;
        model.save_model(&artifacts.model).map_err(checkpoint_error(&artifacts.model))?;
        Ok(artifacts)
    }

    /// Most recent checkpoint on disk, by iteration number.
    ///
    /// Resuming is left to the caller; this only locates the file.
    pub fn latest(&self) -> Result<Option<(usize, PathBuf)>> {
        let entries = std::fs::read_dir(&self.directory).map_err(|source| Error::CheckpointIo {
            path: self.directory.clone(),
            source: ModelError::Io(source),
        })?;
        newest_checkpoint(&self.directory, entries.map(|entry| entry.map(|e| (e.file_name(), e.path()))))
    }
}

/// Highest `weights.<iteration>.json` among `(file name, path)` entries.
/// Other file names are skipped; an unreadable entry is an error.
fn newest_checkpoint<I>(directory: &Path, entries: I) -> Result<Option<(usize, PathBuf)>>
where
    I: Iterator<Item = std::io::Result<(OsString, PathBuf)>>,
{
    let mut newest: Option<(usize, PathBuf)> = None;
    for entry in entries {
        let (name, path) = entry.map_err(|source| Error::CheckpointIo {
            path: directory.to_owned(),
            source: ModelError::Io(source),
        })?;
        let iteration = name.to_str()
            .and_then(|n| n.strip_prefix("weights."))
            .and_then(|n| n.strip_suffix(".json"))
            .and_then(|n| n.parse::<usize>().ok());
        if let Some(iteration) = iteration {
            if newest.as_ref().map_or(true, |(best, _)| iteration > *best) {
                newest = Some((iteration, path));
            }
        }
    }
    Ok(newest)
}

fn checkpoint_error(path: &Path) -> impl FnOnce(ModelError) -> Error + '_ {
    move |source| Error::CheckpointIo { path: path.to_owned(), source }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn paths_are_tagged_by_iteration() {
        let dir = TempDir::new().unwrap();
        let ckpt = Checkpointer::new(&dir.path().join("ckpt"), &dir.path().join("final"), "oneshot").unwrap();
        assert!(ckpt.path_for_iteration(2000).ends_with("weights.2000.json"));
        let artifacts = ckpt.final_artifacts();
        assert!(artifacts.architecture.ends_with("oneshot_architecture.json"));
        assert!(artifacts.weights.ends_with("oneshot_weights.json"));
        assert!(artifacts.model.ends_with("oneshot_model.json"));
    }

    #[test]
    fn latest_picks_highest_iteration() {
        let dir = TempDir::new().unwrap();
        let ckpt = Checkpointer::new(&dir.path().join("ckpt"), &dir.path().join("final"), "m").unwrap();
        assert_eq!(ckpt.latest().unwrap(), None);
        for i in [2, 10, 4] {
            std::fs::write(ckpt.path_for_iteration(i), "{}").unwrap();
        }
        std::fs::write(dir.path().join("ckpt").join("notes.txt"), "").unwrap();
        let (iteration, path) = ckpt.latest().unwrap().unwrap();
        assert_eq!(iteration, 10);
        assert_eq!(path, ckpt.path_for_iteration(10));
    }

    #[test]
    fn unreadable_directory_entry_is_a_checkpoint_error() {
        let dir = PathBuf::from("ckpt");
        let entries = vec![
            Ok((OsString::from("weights.4.json"), dir.join("weights.4.json"))),
            Err(std::io::Error::new(std::io::ErrorKind::Other, "stale handle")),
            Ok((OsString::from("weights.9.json"), dir.join("weights.9.json"))),
        ];
        let err = newest_checkpoint(&dir, entries.into_iter()).unwrap_err();
        match err {
            Error::CheckpointIo { path, source: ModelError::Io(_) } => assert_eq!(path, dir),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn unwritable_directory_is_a_checkpoint_error() {
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("file");
        std::fs::write(&blocker, "").unwrap();
        let err = Checkpointer::new(&blocker.join("ckpt"), dir.path(), "m").err().unwrap();
        assert!(matches!(err, Error::CheckpointIo { .. }));
    }
}
