//! On-disk dataset readers.
//!
//! Two layouts are understood:
//! - Omniglot-style directories, `root/<category>/<class>/<image>`, where each
//!   category (alphabet) becomes one contiguous `CategoryRange`.
//! - A JSON dump of a split (`classes` + `categories`), written by
//!   [`save_json_split`].

use std::fs;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::DataConfig;
use crate::data::dataset::{CategoryMap, CategoryRange, ClassImageSet, Dataset, Split};
use crate::data::image::{self, Image};
use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DatasetFormat {
    #[default]
    Omniglot,
    Json,
}

#[derive(Serialize, Deserialize)]
struct SplitFile {
    classes: Vec<Vec<Image>>,
    categories: CategoryMap,
}

/// Loads both splits described by `config`, checking every image is `height × width`.
pub fn load_dataset(config: &DataConfig, height: usize, width: usize) -> Result<Dataset> {
    let load = |path: &Path| match config.format {
        DatasetFormat::Omniglot => load_omniglot_split(path, height, width),
        DatasetFormat::Json => load_json_split(path),
    };

    let train = load(&config.train_dir)?;
    let validation = load(&config.val_dir)?;

    for (name, split) in [("train", &train), ("validation", &validation)] {
        let (h, w, _) = split.images.image_shape();
        if (h, w) != (height, width) {
            return Err(Error::InvalidDataset(format!(
                "{} split images are {}x{}, model expects {}x{}",
                name, h, w, height, width
            )));
        }
        info!(
            split = name,
            classes = split.images.n_classes(),
            examples_per_class = split.images.examples_per_class(),
            categories = split.categories.len(),
            "Loaded split"
        );
    }

    Ok(Dataset { train, validation })
}

/// Reads `root/<category>/<class>/<image>`; all levels are visited in sorted
/// name order so class indices are stable across runs. Every image must
/// already be `height × width`.
pub fn load_omniglot_split(root: &Path, height: usize, width: usize) -> Result<Split> {
    let mut classes: Vec<Vec<Image>> = Vec::new();
    let mut categories = CategoryMap::new();

    for category_dir in sorted_entries(root, true)? {
        let low = classes.len();
        for class_dir in sorted_entries(&category_dir, true)? {
            let mut examples = Vec::new();
            for file in sorted_entries(&class_dir, false)? {
                let decoded = ::image::open(&file).map_err(|source| Error::ImageDecode {
                    path: file.clone(),
                    source,
                })?;
                let img = image::from_dynamic(decoded);
                if (img.height, img.width) != (height, width) {
                    return Err(Error::InvalidDataset(format!(
                        "{} is {}x{}, model expects {}x{}",
                        file.display(), img.height, img.width, height, width
                    )));
                }
                examples.push(img);
            }
            classes.push(examples);
        }

        let name = file_name(&category_dir);
        if classes.len() == low {
            debug!(category = %name, "Skipping category without classes");
            continue;
        }
        debug!(category = %name, low, high = classes.len(), "Indexed category");
        categories.insert(name, CategoryRange::new(low, classes.len())?);
    }

    Split::new(ClassImageSet::new(classes)?, categories)
}

pub fn load_json_split(path: &Path) -> Result<Split> {
    let file = fs::File::open(path).map_err(|source| Error::DatasetIo {
        path: path.to_owned(),
        source,
    })?;
    let raw: SplitFile = serde_json::from_reader(BufReader::new(file)).map_err(|source| {
        Error::DatasetFormat {
            path: path.to_owned(),
            source,
        }
    })?;
    Split::new(ClassImageSet::new(raw.classes)?, raw.categories)
}

pub fn save_json_split(split: &Split, path: &Path) -> Result<()> {
    let file = fs::File::create(path).map_err(|source| Error::DatasetIo {
        path: path.to_owned(),
        source,
    })?;
    let raw = SplitFile {
        classes: split.images.classes().to_vec(),
        categories: split.categories.clone(),
    };
    serde_json::to_writer(BufWriter::new(file), &raw).map_err(|source| Error::DatasetFormat {
        path: path.to_owned(),
        source,
    })
}

fn sorted_entries(dir: &Path, want_dirs: bool) -> Result<Vec<PathBuf>> {
    let io_err = |source: std::io::Error| Error::DatasetIo { path: dir.to_owned(), source };
    let mut entries = Vec::new();
    for entry in fs::read_dir(dir).map_err(io_err)? {
        let path = entry.map_err(io_err)?.path();
        if path.is_dir() == want_dirs && !file_name(&path).starts_with('.') {
            entries.push(path);
        }
    }
    entries.sort();
    Ok(entries)
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}
