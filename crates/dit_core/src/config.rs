//! Runtime configuration resolved from the environment.
//!
//! # Responsibility
//! - Resolve database/document paths, store backend and logging settings.
//! - Keep host surfaces on one set of variable names and defaults.
//!
//! # Invariants
//! - Resolution never touches the filesystem.
//! - Blank variables are treated as unset.

use crate::logging::{default_log_level, normalize_level};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;

pub const ENV_DB_PATH: &str = "DIT_DB_PATH";
pub const ENV_LOG_LEVEL: &str = "DIT_LOG_LEVEL";
pub const ENV_LOG_DIR: &str = "DIT_LOG_DIR";
pub const ENV_BACKEND: &str = "DIT_BACKEND";
pub const ENV_DOCUMENT_PATH: &str = "DIT_DOCUMENT_PATH";
pub const ENV_USER_ID: &str = "DIT_USER_ID";

const DEFAULT_DB_FILE_NAME: &str = "dit.sqlite3";
const DEFAULT_DOCUMENT_FILE_NAME: &str = "dit_todos.json";
const DEFAULT_USER_ID: &str = "local";

/// Storage backend selected at composition time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Sqlite,
    Memory,
    Document,
}

impl StoreBackend {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "sqlite" => Some(Self::Sqlite),
            "memory" => Some(Self::Memory),
            "document" => Some(Self::Document),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Sqlite => "sqlite",
            Self::Memory => "memory",
            Self::Document => "document",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    InvalidBackend(String),
    InvalidLogLevel(String),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidBackend(value) => write!(
                f,
                "unsupported {ENV_BACKEND} `{value}`; expected sqlite|memory|document"
            ),
            Self::InvalidLogLevel(message) => write!(f, "{message}"),
        }
    }
}

impl Error for ConfigError {}

/// Resolved runtime settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DitConfig {
    pub backend: StoreBackend,
    pub db_path: PathBuf,
    pub document_path: PathBuf,
    pub user_id: String,
    pub log_level: &'static str,
    /// Logging stays off when unset.
    pub log_dir: Option<String>,
}

impl DitConfig {
    /// Resolves settings from process environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Resolves settings through `lookup`, which maps variable names to values.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let value = |key: &str| {
            lookup(key)
                .map(|raw| raw.trim().to_string())
                .filter(|trimmed| !trimmed.is_empty())
        };

        let backend = match value(ENV_BACKEND) {
            Some(raw) => StoreBackend::parse(&raw).ok_or(ConfigError::InvalidBackend(raw))?,
            None => StoreBackend::Sqlite,
        };
        let log_level = match value(ENV_LOG_LEVEL) {
            Some(raw) => normalize_level(&raw).map_err(ConfigError::InvalidLogLevel)?,
            None => default_log_level(),
        };

        Ok(Self {
            backend,
            db_path: value(ENV_DB_PATH)
                .map(PathBuf::from)
                .unwrap_or_else(|| std::env::temp_dir().join(DEFAULT_DB_FILE_NAME)),
            document_path: value(ENV_DOCUMENT_PATH)
                .map(PathBuf::from)
                .unwrap_or_else(|| std::env::temp_dir().join(DEFAULT_DOCUMENT_FILE_NAME)),
            user_id: value(ENV_USER_ID).unwrap_or_else(|| DEFAULT_USER_ID.to_string()),
            log_level,
            log_dir: value(ENV_LOG_DIR),
        })
    }
}
