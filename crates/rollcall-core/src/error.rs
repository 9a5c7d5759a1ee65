use std::path::PathBuf;

use chrono::NaiveDate;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, AttendanceError>;

/// Coarse classification of an [`AttendanceError`], one per failure class
/// the operator is shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    Duplicate,
    NotFound,
    Match,
    Storage,
}

#[derive(Debug, Error)]
pub enum AttendanceError {
    #[error("{0}")]
    Validation(String),
    #[error("user already registered: {0}")]
    Duplicate(String),
    #[error("no registered user named {0:?}")]
    UnknownIdentity(String),
    #[error("no attendance data found for {0}")]
    NoLedger(NaiveDate),
    #[error("face match failed: {0}")]
    Match(String),
    #[error("storage error at {path}: {source}")]
    Storage {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed data in {path}: {reason}")]
    Format { path: PathBuf, reason: String },
}

impl AttendanceError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) => ErrorKind::Validation,
            Self::Duplicate(_) => ErrorKind::Duplicate,
            Self::UnknownIdentity(_) | Self::NoLedger(_) => ErrorKind::NotFound,
            Self::Match(_) => ErrorKind::Match,
            Self::Storage { .. } | Self::Format { .. } => ErrorKind::Storage,
        }
    }

    pub(crate) fn storage(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Storage {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn format(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Self::Format {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}
