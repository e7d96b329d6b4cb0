pub mod dataset;
pub mod image;
pub mod loader;
pub mod oneshot;
pub mod pairs;

pub use dataset::{CategoryMap, CategoryRange, ClassImageSet, Dataset, Split, SplitKind};
pub use image::Image;
pub use loader::{load_dataset, DatasetFormat};
pub use oneshot::{OneShotTask, OneShotTaskGenerator};
pub use pairs::{PairBatch, PairSampler};
