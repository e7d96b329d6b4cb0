use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::data::image::Image;
use crate::error::{Error, Result};

/// Images grouped by class.
///
/// Every class holds the same number of examples and every image shares
/// one `height × width` shape; both are checked by [`ClassImageSet::new`].
#[derive(Debug, Clone)]
pub struct ClassImageSet {
    classes: Vec<Vec<Image>>,
    examples_per_class: usize,
    height: usize,
    width: usize,
}

impl ClassImageSet {
    pub fn new(classes: Vec<Vec<Image>>) -> Result<ClassImageSet> {
        let first = classes
            .first()
            .and_then(|c| c.first())
            .ok_or_else(|| Error::InvalidDataset("no classes or empty first class".into()))?;
        let (height, width) = (first.height, first.width);
        let examples_per_class = classes[0].len();

        for (class, examples) in classes.iter().enumerate() {
            if examples.len() != examples_per_class {
                return Err(Error::InvalidDataset(format!(
                    "class {} has {} examples, expected {}",
                    class, examples.len(), examples_per_class
                )));
            }
            if let Some(bad) = examples.iter().position(|img| img.len() != img.height * img.width) {
                return Err(Error::InvalidDataset(format!(
                    "class {} example {} has {} pixels, a {}x{} image needs {}",
                    class, bad, examples[bad].len(), examples[bad].height, examples[bad].width,
                    examples[bad].height * examples[bad].width
                )));
            }
            if let Some(bad) = examples.iter().position(|img| img.height != height || img.width != width) {
                return Err(Error::InvalidDataset(format!(
                    "class {} example {} is {}x{}, expected {}x{}",
                    class, bad, examples[bad].height, examples[bad].width, height, width
                )));
            }
        }

        Ok(ClassImageSet { classes, examples_per_class, height, width })
    }

    pub fn n_classes(&self) -> usize {
        self.classes.len()
    }

    pub fn examples_per_class(&self) -> usize {
        self.examples_per_class
    }

    /// `(height, width, channels)` shared by every image.
    pub fn image_shape(&self) -> (usize, usize, usize) {
        (self.height, self.width, 1)
    }

    /// Panics if either index is out of range; samplers only draw valid indices.
    pub fn image(&self, class: usize, example: usize) -> &Image {
        &self.classes[class][example]
    }

    pub fn classes(&self) -> &[Vec<Image>] {
        &self.classes
    }
}

/// Contiguous `[low, high)` interval of class indices belonging to one
/// language/category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryRange {
    pub low: usize,
    pub high: usize,
}

impl CategoryRange {
    pub fn new(low: usize, high: usize) -> Result<CategoryRange> {
        if low >= high {
            return Err(Error::InvalidDataset(format!("empty category range [{}, {})", low, high)));
        }
        Ok(CategoryRange { low, high })
    }

    pub fn len(&self) -> usize {
        self.high - self.low
    }

    pub fn is_empty(&self) -> bool {
        self.high <= self.low
    }
}

pub type CategoryMap = BTreeMap<String, CategoryRange>;

/// One dataset split: its images and the category ranges over its classes.
#[derive(Debug, Clone)]
pub struct Split {
    pub images: ClassImageSet,
    pub categories: CategoryMap,
}

impl Split {
    /// Checks every category range lies inside the class index space.
    pub fn new(images: ClassImageSet, categories: CategoryMap) -> Result<Split> {
        for (name, range) in &categories {
            if range.is_empty() || range.high > images.n_classes() {
                return Err(Error::InvalidDataset(format!(
                    "category '{}' range [{}, {}) is outside 0..{}",
                    name, range.low, range.high, images.n_classes()
                )));
            }
        }
        Ok(Split { images, categories })
    }

    /// A split with a single category spanning every class.
    pub fn uncategorised(images: ClassImageSet) -> Split {
        let mut categories = CategoryMap::new();
        categories.insert("all".to_string(), CategoryRange { low: 0, high: images.n_classes() });
        Split { images, categories }
    }

    pub fn category(&self, name: &str) -> Result<CategoryRange> {
        self.categories
            .get(name)
            .copied()
            .ok_or_else(|| Error::UnknownCategory(name.to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum SplitKind {
    Train,
    Validation,
}

impl fmt::Display for SplitKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SplitKind::Train => f.write_str("train"),
            SplitKind::Validation => f.write_str("validation"),
        }
    }
}

/// Train and validation splits, read-only once loaded.
#[derive(Debug, Clone)]
pub struct Dataset {
    pub train: Split,
    pub validation: Split,
}

impl Dataset {
    pub fn split(&self, kind: SplitKind) -> &Split {
        match kind {
            SplitKind::Train => &self.train,
            SplitKind::Validation => &self.validation,
        }
    }
}
