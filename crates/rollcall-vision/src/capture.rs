//! Still-image capture sources.

use std::path::{Path, PathBuf};

use crate::error::VisionError;
use crate::frame::Frame;

/// Delivers one still frame each time the operator asks for a capture.
pub trait CaptureSource {
    fn capture(&mut self) -> Result<Frame, VisionError>;
}

/// Re-reads the same image file on every capture, so an external webcam
/// tool can keep overwriting it with the latest snapshot.
#[derive(Debug, Clone)]
pub struct StillImageSource {
    path: PathBuf,
}

impl StillImageSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CaptureSource for StillImageSource {
    fn capture(&mut self) -> Result<Frame, VisionError> {
        let frame = Frame::open(&self.path)?;
        tracing::debug!(
            path = %self.path.display(),
            width = frame.width,
            height = frame.height,
            brightness = frame.avg_brightness(),
            "frame captured"
        );
        Ok(frame)
    }
}
