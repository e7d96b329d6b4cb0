use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use serde::{Serialize, Deserialize};

use crate::activation::activation::ActivationFunction;
use crate::error::ModelError;

/// Describes one dense layer.
///
/// Fields:
/// - `size`:       number of neurons in this layer
/// - `input_size`: output size of the previous layer, or the flattened image
///                 size for the first encoder layer
/// - `activation`: activation applied after the affine transform
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerSpec {
    pub size: usize,
    pub input_size: usize,
    pub activation: ActivationFunction,
}

/// Fixed model input shape, `height × width × channels`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputShape {
    pub height: usize,
    pub width: usize,
    pub channels: usize,
}

impl InputShape {
    pub fn flat_len(&self) -> usize {
        self.height * self.width * self.channels
    }
}

/// Architecture description of a siamese network, saved next to the weights.
///
/// Both branches share `encoder`; the `head` maps the component-wise L1
/// distance between the two embeddings to a single similarity score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArchitectureSpec {
    pub name: String,
    pub input: InputShape,
    pub encoder: Vec<LayerSpec>,
    pub head: LayerSpec,
    #[serde(default)]
    pub description: Option<String>,
}

impl ArchitectureSpec {
    /// Dense encoder `input → hidden… → embedding` (sigmoid embedding) and a
    /// one-unit sigmoid head.
    pub fn siamese(
        name: &str,
        input: InputShape,
        hidden: &[usize],
        embedding: usize,
        activation: ActivationFunction,
    ) -> ArchitectureSpec {
        let mut encoder = Vec::with_capacity(hidden.len() + 1);
        let mut input_size = input.flat_len();
        for &size in hidden {
            encoder.push(LayerSpec { size, input_size, activation });
            input_size = size;
        }
        encoder.push(LayerSpec { size: embedding, input_size, activation: ActivationFunction::Sigmoid });

        ArchitectureSpec {
            name: name.to_string(),
            input,
            encoder,
            head: LayerSpec { size: 1, input_size: embedding, activation: ActivationFunction::Sigmoid },
            description: Some("shared dense encoder, L1 distance, sigmoid similarity head".to_string()),
        }
    }

    /// Checks consecutive layers chain and the head emits one score.
    pub fn validate(&self) -> Result<(), String> {
        let mut expected = self.input.flat_len();
        for (i, layer) in self.encoder.iter().enumerate() {
            if layer.input_size != expected {
                return Err(format!(
                    "encoder layer {} takes {} inputs but receives {}",
                    i, layer.input_size, expected
                ));
            }
            expected = layer.size;
        }
        if self.head.input_size != expected || self.head.size != 1 {
            return Err(format!(
                "head must map {} distances to 1 score, got {} -> {}",
                expected, self.head.input_size, self.head.size
            ));
        }
        Ok(())
    }

    pub fn save_json(&self, path: &Path) -> Result<(), ModelError> {
        serde_json::to_writer_pretty(BufWriter::new(File::create(path)?), self)?;
        Ok(())
    }

    /// I/O failures surface as `ModelError::Io`, malformed JSON as
    /// `ModelError::Serialization`. The chain is not validated here.
    pub fn load_json(path: &Path) -> Result<ArchitectureSpec, ModelError> {
        Ok(serde_json::from_reader(BufReader::new(File::open(path)?))?)
    }
}
