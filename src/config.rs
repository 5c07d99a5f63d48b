use std::{fs, io, path::Path, path::PathBuf, time::Duration};

use serde::{Deserialize, Serialize};

/// Settings for a lookup service and the binding hosting it.
///
/// Every field has a default, so an empty TOML document is a valid config.
///
/// ```toml
/// [selection]
/// fallback_to_me_card = true
/// require_person_kind = true
///
/// [scan]
/// timeout_ms = 5000
///
/// [runtime]
/// worker_threads = 2
///
/// [logging]
/// level = "info"
/// ```
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LookupConfig {
    pub selection: SelectionConfig,
    pub scan: ScanConfig,
    pub runtime: RuntimeConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectionConfig {
    /// Use the me-card heuristic when no email is supplied. When off, such
    /// lookups answer "not found" without scanning.
    pub fallback_to_me_card: bool,
    /// Only people, not organizations, qualify for the me-card heuristic.
    pub require_person_kind: bool,
}

impl Default for SelectionConfig {
    fn default() -> Self {
        SelectionConfig {
            fallback_to_me_card: true,
            require_person_kind: true,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    pub timeout_ms: Option<u64>,
}

impl ScanConfig {
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    pub worker_threads: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        RuntimeConfig { worker_threads: 2 }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter used when `RUST_LOG` is not set.
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            level: "info".to_owned(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Couldn't read config file {path:?}: {source}")]
    Read { path: PathBuf, source: io::Error },
    #[error("Couldn't parse config: {0}")]
    Parse(#[from] toml::de::Error),
}

impl LookupConfig {
    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(raw)?)
    }

    /// Loads the config at `path`, or the defaults if there is no file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            log::debug!("No config at {:?}, using defaults", path);
            return Ok(Self::default());
        }

        let raw = fs::read_to_string(path).map_err(|source| {
            ConfigError::Read {
                path: path.to_path_buf(),
                source,
            }
        })?;
        Self::from_toml_str(&raw)
    }
}
