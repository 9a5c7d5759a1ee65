//! Identity store: registered profiles persisted as `users.csv`.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{AttendanceError, Result};
use crate::storage::{atomic_write, read_optional};
use crate::types::{Category, UserProfile};

const HEADER: [&str; 4] = ["name", "category", "organization", "roll_number"];

/// On-disk row. `startup` is the column name used by older files.
#[derive(Debug, Serialize, Deserialize)]
struct ProfileRow {
    name: String,
    category: Category,
    #[serde(alias = "startup", default)]
    organization: String,
    roll_number: String,
}

impl From<ProfileRow> for UserProfile {
    fn from(row: ProfileRow) -> Self {
        Self {
            name: row.name,
            category: row.category,
            organization: row.organization,
            roll_number: row.roll_number,
        }
    }
}

impl From<&UserProfile> for ProfileRow {
    fn from(p: &UserProfile) -> Self {
        Self {
            name: p.name.clone(),
            category: p.category,
            organization: p.organization.clone(),
            roll_number: p.roll_number.clone(),
        }
    }
}

/// Registered users, keyed by unique name, in registration order.
#[derive(Debug)]
pub struct IdentityStore {
    path: PathBuf,
    profiles: Vec<UserProfile>,
}

impl IdentityStore {
    /// Load the store from `path`. A missing file is an empty store.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let profiles = match read_optional(&path)? {
            Some(bytes) => parse_profiles(&path, &bytes)?,
            None => Vec::new(),
        };
        tracing::debug!(path = %path.display(), count = profiles.len(), "identity store loaded");
        Ok(Self { path, profiles })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn profiles(&self) -> &[UserProfile] {
        &self.profiles
    }

    pub fn exists(&self, name: &str) -> bool {
        self.profiles.iter().any(|p| p.name == name)
    }

    pub fn lookup(&self, name: &str) -> Result<&UserProfile> {
        self.profiles
            .iter()
            .find(|p| p.name == name)
            .ok_or_else(|| AttendanceError::UnknownIdentity(name.to_string()))
    }

    /// Add a new profile and persist the store.
    ///
    /// Inputs are trimmed. Name and roll number are required; a name that is
    /// already registered is rejected without touching the file.
    pub fn register(
        &mut self,
        name: &str,
        category: Category,
        organization: &str,
        roll_number: &str,
    ) -> Result<&UserProfile> {
        let name = name.trim();
        let roll_number = roll_number.trim();
        if name.is_empty() || roll_number.is_empty() {
            return Err(AttendanceError::Validation(
                "name and roll number are required".into(),
            ));
        }
        if self.exists(name) {
            return Err(AttendanceError::Duplicate(name.to_string()));
        }

        let organization = match category {
            Category::StartupAffiliate => organization.trim().to_string(),
            Category::OrganizationStaff => {
                if !organization.trim().is_empty() {
                    tracing::warn!(name, organization, "ignoring organization for staff profile");
                }
                String::new()
            }
        };

        let mut next = self.profiles.clone();
        next.push(UserProfile {
            name: name.to_string(),
            category,
            organization,
            roll_number: roll_number.to_string(),
        });
        atomic_write(&self.path, &render_profiles(&self.path, &next)?)?;
        self.profiles = next;

        tracing::info!(name, %category, "user registered");
        let last = self.profiles.len() - 1;
        Ok(&self.profiles[last])
    }
}

fn parse_profiles(path: &Path, bytes: &[u8]) -> Result<Vec<UserProfile>> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(bytes);
    reader
        .deserialize::<ProfileRow>()
        .map(|row| {
            row.map(UserProfile::from)
                .map_err(|e| AttendanceError::format(path, e))
        })
        .collect()
}

fn render_profiles(path: &Path, profiles: &[UserProfile]) -> Result<Vec<u8>> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(Vec::new());
    writer
        .write_record(HEADER)
        .map_err(|e| AttendanceError::format(path, e))?;
    for profile in profiles {
        writer
            .serialize(ProfileRow::from(profile))
            .map_err(|e| AttendanceError::format(path, e))?;
    }
    writer
        .into_inner()
        .map_err(|e| AttendanceError::format(path, e.error()))
}
