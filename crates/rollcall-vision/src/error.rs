use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum VisionError {
    #[error("image error for {path}: {source}")]
    Image {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("io error for {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("captured frame is empty")]
    EmptyFrame,
    #[error("no face detected: frame is too dark")]
    DarkFrame,
    #[error("no face detected: frame has no detail")]
    FeaturelessFrame,
    #[error("no registered users found")]
    NoReferences,
    #[error("{0:?} cannot be used as a reference image name")]
    InvalidIdentity(String),
}
