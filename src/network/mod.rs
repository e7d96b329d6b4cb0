pub mod encoder;
pub mod model;
pub mod siamese;
pub mod spec;

pub use encoder::Encoder;
pub use model::{SimilarityModel, TrainableModel};
pub use siamese::{SavedModel, SiameseNetwork, SiameseWeights};
pub use spec::{ArchitectureSpec, InputShape, LayerSpec};
