//! Reference gallery: one image per registered identity, named `<identity>.<ext>`.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::embedding::{Embedder, Embedding};
use crate::error::VisionError;
use crate::frame::Frame;

const REFERENCE_EXTENSIONS: [&str; 3] = ["png", "jpg", "jpeg"];

/// An enrolled identity and its descriptor.
#[derive(Debug, Clone)]
pub struct Reference {
    pub name: String,
    pub path: PathBuf,
    pub embedding: Embedding,
}

/// Directory of reference images.
#[derive(Debug, Clone)]
pub struct ReferenceGallery {
    dir: PathBuf,
}

impl ReferenceGallery {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Reject names that cannot be used verbatim as a file stem.
    pub fn validate_identity(name: &str) -> Result<(), VisionError> {
        let bad = name.is_empty()
            || name != name.trim()
            || name.starts_with('.')
            || name.contains(['/', '\\', '\0']);
        if bad {
            return Err(VisionError::InvalidIdentity(name.to_string()));
        }
        Ok(())
    }

    /// Store `frame` as the reference image for `name`, replacing any
    /// previous PNG reference.
    pub fn enroll(&self, name: &str, frame: &Frame) -> Result<PathBuf, VisionError> {
        Self::validate_identity(name)?;
        fs::create_dir_all(&self.dir).map_err(|source| VisionError::Io {
            path: self.dir.clone(),
            source,
        })?;
        let path = self.dir.join(format!("{name}.png"));
        frame.save(&path)?;
        tracing::info!(name, path = %path.display(), "reference image stored");
        Ok(path)
    }

    /// Paths of all reference images, sorted by file name.
    pub fn reference_paths(&self) -> Result<Vec<PathBuf>, VisionError> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => {
                return Err(VisionError::Io {
                    path: self.dir.clone(),
                    source,
                })
            }
        };

        let mut paths = Vec::new();
        for entry in entries {
            let path = entry
                .map_err(|source| VisionError::Io {
                    path: self.dir.clone(),
                    source,
                })?
                .path();
            if path.is_file() && is_reference_image(&path) {
                paths.push(path);
            }
        }
        paths.sort();
        Ok(paths)
    }

    /// Embed every reference image. Unreadable or featureless references
    /// are skipped with a warning.
    pub fn load(&self, embedder: &dyn Embedder) -> Result<Vec<Reference>, VisionError> {
        let mut references = Vec::new();
        for path in self.reference_paths()? {
            let Some(name) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            let embedding = match Frame::open(&path).and_then(|f| embedder.embed(&f)) {
                Ok(e) => e,
                Err(err) => {
                    tracing::warn!(path = %path.display(), error = %err, "skipping reference image");
                    continue;
                }
            };
            references.push(Reference {
                name: name.to_string(),
                path: path.clone(),
                embedding,
            });
        }
        tracing::debug!(dir = %self.dir.display(), count = references.len(), "reference gallery loaded");
        Ok(references)
    }
}

fn is_reference_image(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| {
            REFERENCE_EXTENSIONS
                .iter()
                .any(|known| ext.eq_ignore_ascii_case(known))
        })
}
