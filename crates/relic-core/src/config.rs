//! config.toml settings and the persistence credentials file.

use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ConfigResult};

/// Settings file name, resolved against the data directory.
pub const CONFIG_FILE: &str = "config.toml";

/// Persistence credentials file name, resolved against the data directory.
pub const CREDENTIALS_FILE: &str = "database-credentials.json";

/// Structured settings exposed as lookups by dotted key path
/// (`discord.bot_token`, `analytics.write_key`, `digital_ocean_auth`).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Settings {
    root: toml::Table,
}

impl Settings {
    /// Load `config.toml` from the given data directory.
    pub fn load(data_dir: &Path) -> ConfigResult<Self> {
        Self::from_file(&data_dir.join(CONFIG_FILE))
    }

    pub fn from_file(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        content.parse()
    }

    /// Resolve a dotted key path to its raw value.
    pub fn lookup(&self, key: &str) -> Option<&toml::Value> {
        let mut segments = key.split('.');
        let mut current = self.root.get(segments.next()?)?;
        for segment in segments {
            current = current.as_table()?.get(segment)?;
        }
        Some(current)
    }

    /// String value at `key`, `None` if absent.
    pub fn get_str(&self, key: &str) -> ConfigResult<Option<&str>> {
        match self.lookup(key) {
            None => Ok(None),
            Some(value) => value.as_str().map(Some).ok_or_else(|| ConfigError::WrongType {
                key: key.to_string(),
                expected: "string",
            }),
        }
    }

    /// Integer value at `key`, `None` if absent.
    pub fn get_i64(&self, key: &str) -> ConfigResult<Option<i64>> {
        match self.lookup(key) {
            None => Ok(None),
            Some(value) => value
                .as_integer()
                .map(Some)
                .ok_or_else(|| ConfigError::WrongType {
                    key: key.to_string(),
                    expected: "integer",
                }),
        }
    }

    /// Non-negative integer at `key`, or `default` when absent.
    pub fn get_u64_or(&self, key: &str, default: u64) -> ConfigResult<u64> {
        match self.get_i64(key)? {
            None => Ok(default),
            Some(value) => u64::try_from(value).map_err(|_| ConfigError::WrongType {
                key: key.to_string(),
                expected: "non-negative integer",
            }),
        }
    }

    /// String value at `key`; absent or empty values are an error.
    pub fn require_str(&self, key: &str) -> ConfigResult<&str> {
        match self.get_str(key)? {
            Some(value) if !value.trim().is_empty() => Ok(value),
            _ => Err(ConfigError::Missing(key.to_string())),
        }
    }
}

impl FromStr for Settings {
    type Err = ConfigError;

    fn from_str(s: &str) -> ConfigResult<Self> {
        let root: toml::Table = toml::from_str(s)?;
        Ok(Self { root })
    }
}

/// Contents of `database-credentials.json`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DatabaseCredentials {
    pub project_id: String,
    /// Store location. Relative paths resolve against the data directory.
    pub database_path: PathBuf,
}

impl DatabaseCredentials {
    /// Load and validate the credentials file from the data directory.
    pub fn load(data_dir: &Path) -> ConfigResult<Self> {
        let path = data_dir.join(CREDENTIALS_FILE);
        let content = std::fs::read_to_string(&path).map_err(|source| ConfigError::Io {
            path: path.clone(),
            source,
        })?;
        let mut creds: DatabaseCredentials = serde_json::from_str(&content)?;
        creds.validate()?;
        if creds.database_path.is_relative() {
            creds.database_path = data_dir.join(&creds.database_path);
        }
        Ok(creds)
    }

    fn validate(&self) -> ConfigResult<()> {
        if self.project_id.trim().is_empty() {
            return Err(ConfigError::InvalidCredentials("project_id is empty".into()));
        }
        if self.database_path.as_os_str().is_empty() {
            return Err(ConfigError::InvalidCredentials("database_path is empty".into()));
        }
        Ok(())
    }
}
