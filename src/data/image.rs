use serde::{Deserialize, Serialize};

/// Single-channel image of fixed `height × width`, stored row-major as raw
/// 8-bit intensities.
///
/// Pixels stay as `u8` in memory so a full Omniglot split fits comfortably;
/// they are scaled to `[0, 1]` only when handed to a model via [`Image::to_input`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Image {
    pub height: usize,
    pub width: usize,
    pub pixels: Vec<u8>,
}

impl Image {
    /// Returns `None` when `pixels.len() != height * width`.
    pub fn new(height: usize, width: usize, pixels: Vec<u8>) -> Option<Image> {
        (pixels.len() == height * width).then_some(Image { height, width, pixels })
    }

    /// A uniform image, handy for synthetic datasets.
    pub fn filled(height: usize, width: usize, value: u8) -> Image {
        Image { height, width, pixels: vec![value; height * width] }
    }

    /// `(height, width, channels)`; channels is always 1.
    pub fn shape(&self) -> (usize, usize, usize) {
        (self.height, self.width, 1)
    }

    pub fn len(&self) -> usize {
        self.pixels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pixels.is_empty()
    }

    /// Flattened H×W×1 model input with intensities scaled to `[0, 1]`.
    pub fn to_input(&self) -> Vec<f64> {
        self.pixels.iter().map(|&p| p as f64 / 255.0).collect()
    }
}

/// Grayscale copy of a decoded image at its own dimensions.
pub fn from_dynamic(img: image::DynamicImage) -> Image {
    let gray = img.to_luma8();
    Image {
        height: gray.height() as usize,
        width: gray.width() as usize,
        pixels: gray.into_raw(),
    }
}
