use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use rollcall_core::StoreConfig;
use rollcall_vision::{DEFAULT_DARK_THRESHOLD, DEFAULT_MATCH_THRESHOLD};
use serde::Deserialize;

/// Optional TOML config file; every key may be omitted.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct FileConfig {
    data_dir: Option<PathBuf>,
    reference_dir: Option<PathBuf>,
    match_threshold: Option<f32>,
    dark_threshold: Option<f32>,
}

/// Resolved configuration: defaults, then the config file, then `ROLLCALL_*`
/// environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Holds `users.csv` and the `attendance/` ledgers.
    pub data_dir: PathBuf,
    /// One reference image per registered identity.
    pub reference_dir: PathBuf,
    /// Minimum cosine similarity for a positive match.
    pub match_threshold: f32,
    /// Fraction of dark pixels above which a capture is rejected.
    pub dark_threshold: f32,
}

impl Config {
    /// Load from `explicit`, else `$ROLLCALL_CONFIG` if set, then apply
    /// environment overrides.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let path = explicit
            .map(Path::to_path_buf)
            .or_else(|| std::env::var_os("ROLLCALL_CONFIG").map(PathBuf::from));
        let file = match path {
            Some(path) => {
                let text = std::fs::read_to_string(&path)
                    .with_context(|| format!("reading config {}", path.display()))?;
                parse_file(&text).with_context(|| format!("parsing config {}", path.display()))?
            }
            None => FileConfig::default(),
        };
        Ok(Self::resolve(file, |key| std::env::var(key).ok()))
    }

    fn resolve(file: FileConfig, env: impl Fn(&str) -> Option<String>) -> Self {
        let data_dir = env("ROLLCALL_DATA_DIR")
            .map(PathBuf::from)
            .or(file.data_dir)
            .unwrap_or_else(|| default_data_dir(&env));

        let reference_dir = env("ROLLCALL_REFERENCE_DIR")
            .map(PathBuf::from)
            .or(file.reference_dir)
            .unwrap_or_else(|| data_dir.join("faces"));

        Self {
            match_threshold: env_f32(&env, "ROLLCALL_MATCH_THRESHOLD")
                .or(file.match_threshold)
                .unwrap_or(DEFAULT_MATCH_THRESHOLD),
            dark_threshold: env_f32(&env, "ROLLCALL_DARK_THRESHOLD")
                .or(file.dark_threshold)
                .unwrap_or(DEFAULT_DARK_THRESHOLD),
            data_dir,
            reference_dir,
        }
    }

    pub fn store_config(&self) -> StoreConfig {
        StoreConfig::new(&self.data_dir)
    }
}

fn parse_file(text: &str) -> Result<FileConfig> {
    Ok(toml::from_str(text)?)
}

fn default_data_dir(env: &impl Fn(&str) -> Option<String>) -> PathBuf {
    env("XDG_DATA_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|| {
            let home = env("HOME").unwrap_or_else(|| "/tmp".to_string());
            PathBuf::from(home).join(".local/share")
        })
        .join("rollcall")
}

fn env_f32(env: &impl Fn(&str) -> Option<String>, key: &str) -> Option<f32> {
    env(key).and_then(|v| v.parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env_of(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_follow_xdg_layout() {
        let config = Config::resolve(FileConfig::default(), env_of(&[("HOME", "/home/op")]));
        assert_eq!(config.data_dir, PathBuf::from("/home/op/.local/share/rollcall"));
        assert_eq!(
            config.reference_dir,
            PathBuf::from("/home/op/.local/share/rollcall/faces")
        );
        assert_eq!(config.match_threshold, DEFAULT_MATCH_THRESHOLD);
        assert_eq!(config.dark_threshold, DEFAULT_DARK_THRESHOLD);
        assert_eq!(
            config.store_config().users_file,
            PathBuf::from("/home/op/.local/share/rollcall/users.csv")
        );
    }

    #[test]
    fn test_file_values_apply_and_env_wins() {
        let file = parse_file(
            r#"
            data_dir = "/srv/attendance"
            match_threshold = 0.7
            "#,
        )
        .unwrap();
        let config = Config::resolve(
            file,
            env_of(&[("ROLLCALL_MATCH_THRESHOLD", "0.9"), ("XDG_DATA_HOME", "/x")]),
        );
        assert_eq!(config.data_dir, PathBuf::from("/srv/attendance"));
        assert_eq!(config.reference_dir, PathBuf::from("/srv/attendance/faces"));
        assert!((config.match_threshold - 0.9).abs() < 1e-6);
    }

    #[test]
    fn test_unparsable_env_threshold_falls_back() {
        let config = Config::resolve(
            FileConfig::default(),
            env_of(&[("ROLLCALL_DARK_THRESHOLD", "very"), ("XDG_DATA_HOME", "/x")]),
        );
        assert_eq!(config.dark_threshold, DEFAULT_DARK_THRESHOLD);
        assert_eq!(config.data_dir, PathBuf::from("/x/rollcall"));
    }

    #[test]
    fn test_unknown_keys_are_rejected() {
        assert!(parse_file("camera = \"/dev/video0\"").is_err());
    }
}
