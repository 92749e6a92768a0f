use crate::error::Error;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Default number of concurrent `generate_package` calls.
pub const DEFAULT_MAX_PARALLEL: usize = 32;

/// Runtime configuration for the nodepin CLI.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Current working directory.
    pub cwd: PathBuf,

    /// Whether to emit JSON logs.
    pub json_logs: bool,

    /// Verbosity level (0 = INFO, 1 = DEBUG, 2+ = TRACE).
    pub verbosity: u8,

    /// Channel (dev, nightly, stable) - affects cache paths.
    pub channel: Channel,

    /// Upper bound on in-flight package fetches.
    pub max_parallel: usize,
}

/// Release channel for cache directory namespacing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    #[default]
    Stable,
    Nightly,
    Dev,
}

impl Channel {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Stable => "stable",
            Self::Nightly => "nightly",
            Self::Dev => "dev",
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cwd: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            json_logs: false,
            verbosity: 0,
            channel: Channel::default(),
            max_parallel: DEFAULT_MAX_PARALLEL,
        }
    }
}

impl Config {
    /// Create a new config with the given working directory.
    #[must_use]
    pub fn new(cwd: PathBuf) -> Self {
        Self {
            cwd,
            ..Default::default()
        }
    }

    /// Set verbosity level.
    #[must_use]
    pub fn with_verbosity(mut self, verbosity: u8) -> Self {
        self.verbosity = verbosity;
        self
    }

    /// Set JSON log output.
    #[must_use]
    pub fn with_json_logs(mut self, json: bool) -> Self {
        self.json_logs = json;
        self
    }

    /// Set channel.
    #[must_use]
    pub fn with_channel(mut self, channel: Channel) -> Self {
        self.channel = channel;
        self
    }

    /// Set the fetch concurrency bound.
    #[must_use]
    pub fn with_max_parallel(mut self, max_parallel: usize) -> Self {
        self.max_parallel = max_parallel;
        self
    }

    /// Check values that flags cannot constrain on their own.
    ///
    /// # Errors
    /// Returns [`Error::InvalidConfig`] when `max_parallel` is zero.
    pub fn validate(&self) -> Result<(), Error> {
        if self.max_parallel == 0 {
            return Err(Error::InvalidConfig {
                key: "max_parallel",
                reason: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }

    /// Resolve `path` against the working directory.
    #[must_use]
    pub fn resolve_path(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.cwd.join(path)
        }
    }
}

/// Supported lockfile dialects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    Npm,
    Yarn,
}

impl Dialect {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Npm => "npm",
            Self::Yarn => "yarn",
        }
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Dialect {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "npm" => Ok(Self::Npm),
            "yarn" => Ok(Self::Yarn),
            _ => Err(Error::UnknownDialect(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder() {
        let config = Config::new(PathBuf::from("/work"))
            .with_verbosity(2)
            .with_json_logs(true)
            .with_channel(Channel::Dev)
            .with_max_parallel(4);

        assert_eq!(config.verbosity, 2);
        assert!(config.json_logs);
        assert_eq!(config.channel, Channel::Dev);
        assert_eq!(config.max_parallel, 4);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_parallel_rejected() {
        let config = Config::new(PathBuf::from("/work")).with_max_parallel(0);
        assert!(matches!(
            config.validate(),
            Err(Error::InvalidConfig {
                key: "max_parallel",
                ..
            })
        ));
    }

    #[test]
    fn test_resolve_path() {
        let config = Config::new(PathBuf::from("/work"));
        assert_eq!(
            config.resolve_path(Path::new("yarn.lock")),
            PathBuf::from("/work/yarn.lock")
        );
        assert_eq!(
            config.resolve_path(Path::new("/abs/yarn.lock")),
            PathBuf::from("/abs/yarn.lock")
        );
    }

    #[test]
    fn test_dialect_from_str() {
        assert_eq!("npm".parse::<Dialect>().unwrap(), Dialect::Npm);
        assert_eq!("YARN".parse::<Dialect>().unwrap(), Dialect::Yarn);
        assert!(matches!(
            "pnpm".parse::<Dialect>(),
            Err(Error::UnknownDialect(_))
        ));
    }

    #[test]
    fn test_channel_serde() {
        let json = serde_json::to_string(&Channel::Nightly).unwrap();
        assert_eq!(json, "\"nightly\"");
    }
}
