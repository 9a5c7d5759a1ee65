//! rollcall-vision — Capture and face-matching collaborators.
//!
//! Frames come from still images; identities are resolved by comparing a
//! probe frame against a directory holding one reference image per
//! registered person.

pub mod capture;
pub mod embedding;
pub mod error;
pub mod frame;
pub mod gallery;
pub mod matcher;

pub use capture::{CaptureSource, StillImageSource};
pub use embedding::{Embedder, Embedding, ThumbnailEmbedder};
pub use error::VisionError;
pub use frame::Frame;
pub use gallery::{Reference, ReferenceGallery};
pub use matcher::{GalleryMatcher, MatchResult, DEFAULT_DARK_THRESHOLD, DEFAULT_MATCH_THRESHOLD};
