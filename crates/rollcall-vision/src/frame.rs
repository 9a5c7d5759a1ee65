//! Grayscale still frames and the brightness checks run before matching.

use std::path::Path;

use image::imageops::{self, FilterType};
use image::{DynamicImage, GrayImage};

use crate::error::VisionError;

/// Pixels below this value count as dark.
const DARK_PIXEL_CUTOFF: u8 = 32;

/// A captured grayscale frame.
#[derive(Clone, Debug)]
pub struct Frame {
    /// Grayscale pixel data (width * height bytes).
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

impl Frame {
    pub fn from_image(image: &DynamicImage) -> Result<Self, VisionError> {
        Self::from_gray(image.to_luma8())
    }

    pub fn from_gray(gray: GrayImage) -> Result<Self, VisionError> {
        let (width, height) = gray.dimensions();
        if width == 0 || height == 0 {
            return Err(VisionError::EmptyFrame);
        }
        Ok(Self {
            data: gray.into_raw(),
            width,
            height,
        })
    }

    /// Decode a still image (PNG, JPEG, ...) from disk.
    pub fn open(path: &Path) -> Result<Self, VisionError> {
        let image = image::open(path).map_err(|source| VisionError::Image {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_image(&image)
    }

    /// Average pixel brightness (0.0–255.0).
    pub fn avg_brightness(&self) -> f32 {
        if self.data.is_empty() {
            return 0.0;
        }
        self.data.iter().map(|&b| b as f32).sum::<f32>() / self.data.len() as f32
    }

    pub fn is_dark(&self, threshold_pct: f32) -> bool {
        is_dark_frame(&self.data, threshold_pct)
    }

    fn to_gray(&self) -> Result<GrayImage, VisionError> {
        GrayImage::from_raw(self.width, self.height, self.data.clone())
            .ok_or(VisionError::EmptyFrame)
    }

    /// Downscale to `size` x `size` pixels.
    pub fn thumbnail(&self, size: u32) -> Result<Vec<u8>, VisionError> {
        let gray = self.to_gray()?;
        Ok(imageops::resize(&gray, size, size, FilterType::Triangle).into_raw())
    }

    /// Write the frame as an image; the format follows the file extension.
    pub fn save(&self, path: &Path) -> Result<(), VisionError> {
        self.to_gray()?
            .save(path)
            .map_err(|source| VisionError::Image {
                path: path.to_path_buf(),
                source,
            })
    }
}

/// True if more than `threshold_pct` of the pixels are dark.
pub fn is_dark_frame(gray: &[u8], threshold_pct: f32) -> bool {
    if gray.is_empty() {
        return true;
    }
    let dark_count = gray.iter().filter(|&&p| p < DARK_PIXEL_CUTOFF).count();
    (dark_count as f32 / gray.len() as f32) > threshold_pct
}
