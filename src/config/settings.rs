use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

const DB_FILE_NAME: &str = "conveyor.db";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub data_dir: PathBuf,
    /// Public base URL of this service (e.g., "https://ci.example.com").
    /// Webhook callback links handed to the remote provider are built from it.
    pub public_base_url: String,
    /// Default build timeout in minutes for newly provisioned repositories.
    pub default_timeout: i64,
    /// How long a writer waits on a locked database before giving up.
    pub busy_timeout_ms: u64,
}

impl Config {
    /// Loads a TOML config file. Fields missing from the file keep their defaults.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)
            .map_err(|e| Error::Config(format!("{}: {e}", path.display())))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.public_base_url.trim().is_empty() {
            return Err(Error::Config("public_base_url cannot be empty".to_string()));
        }
        if self.default_timeout <= 0 {
            return Err(Error::Config(
                "default_timeout must be a positive number of minutes".to_string(),
            ));
        }
        Ok(())
    }

    #[must_use]
    pub fn db_path(&self) -> PathBuf {
        self.data_dir.join(DB_FILE_NAME)
    }

    /// Callback link the remote provider calls on webhook delivery.
    #[must_use]
    pub fn hook_url(&self, token: &str) -> String {
        format!(
            "{}/hook?access_token={}",
            self.public_base_url.trim_end_matches('/'),
            token
        )
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data"),
            public_base_url: "http://127.0.0.1:8000".to_string(),
            default_timeout: 60,
            busy_timeout_ms: 5000,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_hook_url_trims_trailing_slash() {
        let config = Config {
            public_base_url: "https://ci.example.com/".to_string(),
            ..Config::default()
        };
        assert_eq!(
            config.hook_url("abc.def"),
            "https://ci.example.com/hook?access_token=abc.def"
        );
    }

    #[test]
    fn test_load_partial_file_keeps_defaults() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("conveyor.toml");
        fs::write(&path, "public_base_url = \"https://ci.example.com\"\n").unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.public_base_url, "https://ci.example.com");
        assert_eq!(config.default_timeout, 60);
        assert_eq!(config.busy_timeout_ms, 5000);
    }

    #[test]
    fn test_load_rejects_non_positive_timeout() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("conveyor.toml");
        fs::write(&path, "default_timeout = 0\n").unwrap();

        assert!(matches!(Config::load(&path), Err(Error::Config(_))));
    }

    #[test]
    fn test_db_path() {
        let config = Config {
            data_dir: PathBuf::from("/var/lib/conveyor"),
            ..Config::default()
        };
        assert_eq!(config.db_path(), PathBuf::from("/var/lib/conveyor/conveyor.db"));
    }
}
