//! Backend configuration and connection string resolution.

use crate::types::{DatabaseError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Connection string used when nothing else is configured.
pub const DEFAULT_DATABASE_URL: &str = "sqlite::memory:";

/// Environment variable overriding the connection string.
pub const ENV_DATABASE_URL: &str = "STUDENTS_DATABASE_URL";

/// Environment variable selecting the `enrolled_date` default policy.
pub const ENV_ENROLLED_DEFAULT: &str = "STUDENTS_ENROLLED_DEFAULT";

/// How `enrolled_date` is filled when an insert does not provide it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EnrolledDefault {
    /// One timestamp taken when the schema is built, shared by every insert
    #[default]
    Shared,
    /// Local time of each individual insert
    PerInsert,
}

impl FromStr for EnrolledDefault {
    type Err = DatabaseError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "shared" => Ok(Self::Shared),
            "per-insert" | "per_insert" => Ok(Self::PerInsert),
            other => Err(DatabaseError::ConfigError(format!(
                "unknown enrolled default '{}' (expected 'shared' or 'per-insert')",
                other
            ))),
        }
    }
}

impl fmt::Display for EnrolledDefault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Shared => f.write_str("shared"),
            Self::PerInsert => f.write_str("per-insert"),
        }
    }
}

/// Where the backend lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Backend {
    /// Ephemeral, lost when the connection closes
    Memory,
    /// SQLite file
    File(PathBuf),
}

/// Record store configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Connection string, e.g. `sqlite::memory:` or `sqlite:///data/students.db`
    pub database_url: String,

    #[serde(default)]
    pub enrolled_default: EnrolledDefault,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_url: DEFAULT_DATABASE_URL.to_string(),
            enrolled_default: EnrolledDefault::default(),
        }
    }
}

impl Config {
    pub fn new(database_url: impl Into<String>) -> Self {
        Self {
            database_url: database_url.into(),
            ..Self::default()
        }
    }

    /// Load from environment variables, falling back to defaults.
    ///
    /// Resolution order for each setting:
    /// 1. `STUDENTS_DATABASE_URL` / `STUDENTS_ENROLLED_DEFAULT`
    /// 2. built-in default
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same resolution as [`from_env`](Self::from_env) over an arbitrary
    /// variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        if let Some(url) = lookup(ENV_DATABASE_URL) {
            config.database_url = url;
        }
        if let Some(policy) = lookup(ENV_ENROLLED_DEFAULT) {
            config.enrolled_default = policy.parse()?;
        }
        config.backend()?;
        Ok(config)
    }

    pub fn with_enrolled_default(mut self, enrolled_default: EnrolledDefault) -> Self {
        self.enrolled_default = enrolled_default;
        self
    }

    /// Resolve the connection string.
    ///
    /// Accepted forms:
    /// - `sqlite::memory:`, `sqlite:///:memory:`, `:memory:`
    /// - `sqlite:///path/to/file.db`, `sqlite://file.db`
    pub fn backend(&self) -> Result<Backend> {
        let url = self.database_url.trim();

        if url == ":memory:" || url == "sqlite::memory:" {
            return Ok(Backend::Memory);
        }

        let rest = url.strip_prefix("sqlite://").ok_or_else(|| {
            DatabaseError::ConfigError(format!(
                "unsupported database url '{}' (expected sqlite://...)",
                url
            ))
        })?;

        // `sqlite:///x` keeps the third slash as the path separator of a
        // relative path, matching the usual sqlite URL convention.
        let path = rest.strip_prefix('/').unwrap_or(rest);
        match path {
            "" => Err(DatabaseError::ConfigError(format!(
                "database url '{}' names no file",
                url
            ))),
            ":memory:" => Ok(Backend::Memory),
            path => Ok(Backend::File(PathBuf::from(path))),
        }
    }
}
