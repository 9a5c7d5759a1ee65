//! Cosine matching of a probe frame against the reference gallery.

use rollcall_core::FaceMatcher;

use crate::embedding::{Embedder, Embedding};
use crate::error::VisionError;
use crate::frame::Frame;
use crate::gallery::{Reference, ReferenceGallery};

pub const DEFAULT_MATCH_THRESHOLD: f32 = 0.80;
pub const DEFAULT_DARK_THRESHOLD: f32 = 0.95;

/// Result of comparing a probe against every reference.
#[derive(Debug, Clone)]
pub struct MatchResult {
    pub matched: bool,
    /// Cosine similarity of the best candidate [-1, 1].
    pub similarity: f32,
    pub name: Option<String>,
}

/// Best-of-gallery matcher. Every reference is scored; the best one wins if
/// it reaches the threshold.
pub struct GalleryMatcher<E: Embedder> {
    embedder: E,
    references: Vec<Reference>,
    threshold: f32,
    dark_threshold: f32,
}

impl<E: Embedder> GalleryMatcher<E> {
    pub fn new(embedder: E, references: Vec<Reference>) -> Self {
        Self {
            embedder,
            references,
            threshold: DEFAULT_MATCH_THRESHOLD,
            dark_threshold: DEFAULT_DARK_THRESHOLD,
        }
    }

    /// Load and embed every image in `gallery`.
    pub fn from_gallery(gallery: &ReferenceGallery, embedder: E) -> Result<Self, VisionError> {
        let references = gallery.load(&embedder)?;
        Ok(Self::new(embedder, references))
    }

    pub fn with_threshold(mut self, threshold: f32) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn with_dark_threshold(mut self, dark_threshold: f32) -> Self {
        self.dark_threshold = dark_threshold;
        self
    }

    pub fn len(&self) -> usize {
        self.references.len()
    }

    pub fn is_empty(&self) -> bool {
        self.references.is_empty()
    }

    /// Score `frame` against the gallery.
    pub fn compare(&self, frame: &Frame) -> Result<MatchResult, VisionError> {
        if self.references.is_empty() {
            return Err(VisionError::NoReferences);
        }
        if frame.is_dark(self.dark_threshold) {
            return Err(VisionError::DarkFrame);
        }
        let probe = self.embedder.embed(frame)?;
        let result = compare_embedding(&probe, &self.references, self.threshold);
        tracing::debug!(
            matched = result.matched,
            similarity = result.similarity,
            candidate = ?result.name,
            "probe compared"
        );
        Ok(result)
    }
}

fn compare_embedding(probe: &Embedding, gallery: &[Reference], threshold: f32) -> MatchResult {
    let mut best_sim = f32::NEG_INFINITY;
    let mut best_idx: Option<usize> = None;

    for (i, reference) in gallery.iter().enumerate() {
        let sim = probe.similarity(&reference.embedding);
        if sim > best_sim {
            best_sim = sim;
            best_idx = Some(i);
        }
    }

    match best_idx {
        Some(idx) if best_sim >= threshold => MatchResult {
            matched: true,
            similarity: best_sim,
            name: Some(gallery[idx].name.clone()),
        },
        _ => MatchResult {
            matched: false,
            similarity: if best_sim == f32::NEG_INFINITY { 0.0 } else { best_sim },
            name: None,
        },
    }
}

impl<E: Embedder> FaceMatcher<Frame> for GalleryMatcher<E> {
    type Error = VisionError;

    fn best_match_name(&self, image: &Frame) -> Result<Option<String>, VisionError> {
        Ok(self.compare(image)?.name)
    }
}
