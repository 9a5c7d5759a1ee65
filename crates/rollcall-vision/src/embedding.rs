//! Fixed-length face descriptors and the embedders that produce them.

use crate::error::VisionError;
use crate::frame::Frame;

/// Below this L2 norm (in grey levels) a centred thumbnail is treated as flat.
const MIN_DETAIL_NORM: f32 = 8.0;

/// Face descriptor vector, L2-normalized by the embedder.
#[derive(Debug, Clone, PartialEq)]
pub struct Embedding {
    pub values: Vec<f32>,
}

impl Embedding {
    /// Compute cosine similarity between two embeddings.
    ///
    /// Returns a value in [-1, 1]. Higher = more similar.
    pub fn similarity(&self, other: &Embedding) -> f32 {
        let mut dot = 0.0f32;
        let mut norm_a = 0.0f32;
        let mut norm_b = 0.0f32;

        for (a, b) in self.values.iter().zip(other.values.iter()) {
            dot += a * b;
            norm_a += a * a;
            norm_b += b * b;
        }

        let denom = norm_a.sqrt() * norm_b.sqrt();
        if denom > 0.0 {
            dot / denom
        } else {
            0.0
        }
    }
}

/// Turns a frame into an [`Embedding`]. Swap in a model-backed
/// implementation without touching the gallery or the matcher.
pub trait Embedder {
    fn embed(&self, frame: &Frame) -> Result<Embedding, VisionError>;
}

/// Appearance descriptor from a mean-centred grayscale thumbnail.
///
/// Cheap and model-free: good enough to tell apart reference shots taken
/// under the same camera setup, not a general face recognizer.
#[derive(Debug, Clone, Copy)]
pub struct ThumbnailEmbedder {
    pub size: u32,
}

impl Default for ThumbnailEmbedder {
    fn default() -> Self {
        Self { size: 32 }
    }
}

impl Embedder for ThumbnailEmbedder {
    fn embed(&self, frame: &Frame) -> Result<Embedding, VisionError> {
        let thumb = frame.thumbnail(self.size)?;
        let mean = thumb.iter().map(|&p| p as f32).sum::<f32>() / thumb.len() as f32;
        let centred: Vec<f32> = thumb.iter().map(|&p| p as f32 - mean).collect();

        let norm = centred.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm < MIN_DETAIL_NORM {
            return Err(VisionError::FeaturelessFrame);
        }
        Ok(Embedding {
            values: centred.iter().map(|v| v / norm).collect(),
        })
    }
}
