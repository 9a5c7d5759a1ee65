//! File locations and whole-file persistence shared by the stores.

use std::fs::{self, File};
use std::io::{ErrorKind as IoErrorKind, Write};
use std::path::{Path, PathBuf};

use chrono::NaiveDate;

use crate::error::{AttendanceError, Result};
use crate::types::DATE_FORMAT;

pub const DEFAULT_USERS_FILE: &str = "users.csv";
pub const DEFAULT_LEDGER_DIR: &str = "attendance";

const LEDGER_PREFIX: &str = "attendance_";
const LEDGER_SUFFIX: &str = ".csv";

/// Where the identity store and the daily ledgers live on disk.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub users_file: PathBuf,
    pub ledger_dir: PathBuf,
}

impl StoreConfig {
    /// Default layout under `data_dir`: `users.csv` and `attendance/`.
    pub fn new(data_dir: impl AsRef<Path>) -> Self {
        let data_dir = data_dir.as_ref();
        Self {
            users_file: data_dir.join(DEFAULT_USERS_FILE),
            ledger_dir: data_dir.join(DEFAULT_LEDGER_DIR),
        }
    }

    pub fn ensure_dirs(&self) -> Result<()> {
        if let Some(parent) = self.users_file.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| AttendanceError::storage(parent, e))?;
            }
        }
        fs::create_dir_all(&self.ledger_dir)
            .map_err(|e| AttendanceError::storage(&self.ledger_dir, e))
    }
}

/// `attendance_YYYY-MM-DD.csv`
pub fn ledger_file_name(date: NaiveDate) -> String {
    format!("{LEDGER_PREFIX}{}{LEDGER_SUFFIX}", date.format(DATE_FORMAT))
}

/// Inverse of [`ledger_file_name`]; `None` for unrelated files.
pub fn parse_ledger_file_name(file_name: &str) -> Option<NaiveDate> {
    let stem = file_name
        .strip_prefix(LEDGER_PREFIX)?
        .strip_suffix(LEDGER_SUFFIX)?;
    NaiveDate::parse_from_str(stem, DATE_FORMAT).ok()
}

/// Read a whole file, mapping "does not exist" to `None`.
pub(crate) fn read_optional(path: &Path) -> Result<Option<Vec<u8>>> {
    match fs::read(path) {
        Ok(bytes) => Ok(Some(bytes)),
        Err(e) if e.kind() == IoErrorKind::NotFound => Ok(None),
        Err(e) => Err(AttendanceError::storage(path, e)),
    }
}

/// Replace `path` with `data`: write `<path>.tmp`, fsync, then rename over
/// the target so readers see either the old or the new file.
pub(crate) fn atomic_write(path: &Path, data: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(|e| AttendanceError::storage(parent, e))?;
        }
    }

    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    let mut file = File::create(&tmp).map_err(|e| AttendanceError::storage(&tmp, e))?;
    file.write_all(data)
        .and_then(|_| file.sync_all())
        .map_err(|e| AttendanceError::storage(&tmp, e))?;
    drop(file);

    fs::rename(&tmp, path).map_err(|e| AttendanceError::storage(path, e))?;
    tracing::debug!(path = %path.display(), bytes = data.len(), "file replaced");
    Ok(())
}
