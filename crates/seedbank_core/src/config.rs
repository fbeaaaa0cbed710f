//! Runtime configuration for core callers.
//!
//! # Responsibility
//! - Load optional TOML configuration with per-field defaults.
//! - Apply `SEEDBANK_*` environment overrides on top of the file.
//!
//! # Invariants
//! - A missing config file is not an error; defaults are used.
//! - Unparsable environment values are ignored with a warning.

use log::warn;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

pub const ENV_DB_PATH: &str = "SEEDBANK_DB_PATH";
pub const ENV_LOG_LEVEL: &str = "SEEDBANK_LOG_LEVEL";
pub const ENV_LOG_DIR: &str = "SEEDBANK_LOG_DIR";
pub const ENV_BUSY_TIMEOUT_MS: &str = "SEEDBANK_BUSY_TIMEOUT_MS";
pub const ENV_ORIGIN_POLICY: &str = "SEEDBANK_ORIGIN_POLICY";

const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// How updates built against an unrelated document lineage are treated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OriginPolicy {
    /// Accept them; their operations stay parked and change nothing.
    #[default]
    Permissive,
    /// Reject them with `OriginMismatch`.
    Strict,
}

impl OriginPolicy {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Permissive => "permissive",
            Self::Strict => "strict",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "permissive" => Some(Self::Permissive),
            "strict" => Some(Self::Strict),
            _ => None,
        }
    }
}

/// Core configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoreConfig {
    /// SQLite file path; `None` means an in-memory database.
    pub database_path: Option<PathBuf>,
    pub log_level: Option<String>,
    /// Absolute directory for rolling log files; `None` disables file logging.
    pub log_dir: Option<PathBuf>,
    pub busy_timeout_ms: u64,
    pub origin_policy: OriginPolicy,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            database_path: None,
            log_level: None,
            log_dir: None,
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
            origin_policy: OriginPolicy::default(),
        }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    Read { path: PathBuf, source: std::io::Error },
    Parse { path: PathBuf, source: toml::de::Error },
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Read { path, source } => {
                write!(f, "failed to read {}: {source}", path.display())
            }
            Self::Parse { path, source } => {
                write!(f, "failed to parse {}: {source}", path.display())
            }
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Read { source, .. } => Some(source),
            Self::Parse { source, .. } => Some(source),
        }
    }
}

impl CoreConfig {
    /// Loads `path` (when given and present) and applies environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?.unwrap_or_default(),
            None => Self::default(),
        };
        config.apply_env_overrides();
        Ok(config)
    }

    /// Reads one TOML file; `Ok(None)` when it does not exist.
    pub fn from_file(path: &Path) -> Result<Option<Self>, ConfigError> {
        if !path.exists() {
            return Ok(None);
        }
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&contents)
            .map(Some)
            .map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })
    }

    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides_from(|key| std::env::var(key).ok());
    }

    /// Applies overrides read through `lookup` instead of the process environment.
    pub fn apply_overrides_from(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let value = |key: &str| {
            lookup(key)
                .map(|raw| raw.trim().to_string())
                .filter(|raw| !raw.is_empty())
        };

        if let Some(raw) = value(ENV_DB_PATH) {
            self.database_path = Some(PathBuf::from(raw));
        }
        if let Some(raw) = value(ENV_LOG_LEVEL) {
            self.log_level = Some(raw);
        }
        if let Some(raw) = value(ENV_LOG_DIR) {
            self.log_dir = Some(PathBuf::from(raw));
        }
        if let Some(raw) = value(ENV_BUSY_TIMEOUT_MS) {
            match raw.parse::<u64>() {
                Ok(parsed) => self.busy_timeout_ms = parsed,
                Err(err) => warn!(
                    "event=config_override module=config status=ignored key={ENV_BUSY_TIMEOUT_MS} error={err}"
                ),
            }
        }
        if let Some(raw) = value(ENV_ORIGIN_POLICY) {
            match OriginPolicy::parse(&raw) {
                Some(policy) => self.origin_policy = policy,
                None => warn!(
                    "event=config_override module=config status=ignored key={ENV_ORIGIN_POLICY} error=unknown_policy"
                ),
            }
        }
    }
}
