use polarion::{PolarionConfig, PolarionError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_CONFIG_FILE: &str = "polarion.toml";
pub const NO_CONNECTION: &str =
    "Please fill in connection details (url and token) in the configuration file, flags or environment";

#[derive(Error, Debug)]
pub enum ReporterError {
    #[error("{}", NO_CONNECTION)]
    NoConnection,

    #[error("Cannot read config {}: {source}", path.display())]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config {}: {source}", path.display())]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Invalid workspace {}: {source}", path.display())]
    Workspace {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Polarion(#[from] PolarionError),
}

impl ReporterError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, ReporterError::Polarion(e) if e.is_cancelled())
    }
}

pub type ReporterResult<T> = Result<T, ReporterError>;

/// Connection settings as stored on disk; every field may be overridden.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReporterConfig {
    pub url: Option<String>,
    pub token: Option<String>,
    pub connect_timeout_secs: Option<u64>,
}

impl fmt::Debug for ReporterConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReporterConfig")
            .field("url", &self.url)
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .field("connect_timeout_secs", &self.connect_timeout_secs)
            .finish()
    }
}

impl ReporterConfig {
    pub fn load(path: &Path) -> ReporterResult<Self> {
        let raw = std::fs::read_to_string(path).map_err(|source| ReporterError::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&raw).map_err(|source| ReporterError::ConfigParse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Loads `path` if given, else the default file if it exists, else an empty config.
    pub fn discover(path: Option<&Path>) -> ReporterResult<Self> {
        match path {
            Some(path) => Self::load(path),
            None => {
                let default = Path::new(DEFAULT_CONFIG_FILE);
                if default.is_file() {
                    Self::load(default)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    /// Fields set in `overrides` win.
    pub fn merge(self, overrides: ReporterConfig) -> Self {
        Self {
            url: overrides.url.or(self.url),
            token: overrides.token.or(self.token),
            connect_timeout_secs: overrides.connect_timeout_secs.or(self.connect_timeout_secs),
        }
    }

    pub fn connection(&self) -> ReporterResult<PolarionConfig> {
        let url = non_blank(self.url.as_deref()).ok_or(ReporterError::NoConnection)?;
        let token = non_blank(self.token.as_deref()).ok_or(ReporterError::NoConnection)?;

        let mut config = PolarionConfig::new(url, token);
        if let Some(secs) = self.connect_timeout_secs {
            config = config.with_connect_timeout(Duration::from_secs(secs));
        }
        Ok(config)
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}
