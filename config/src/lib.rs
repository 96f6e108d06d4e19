//! Configuration for Lookout, read from `~/.lookout/config.toml`.
//!
//! Every section is optional. A missing file yields [`LookoutConfig::default`].

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

/// Overrides the config file location.
pub const CONFIG_ENV: &str = "LOOKOUT_CONFIG";
/// Overrides `race.timeout_ms`.
pub const TIMEOUT_ENV: &str = "LOOKOUT_TIMEOUT_MS";

const DEFAULT_TIMEOUT_MS: u64 = 1000;
const DEFAULT_GRACE_MS: u64 = 250;
const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 5;
const DEFAULT_RETRY_INITIAL_DELAY_MS: u64 = 100;
const DEFAULT_RETRY_MAX_DELAY_MS: u64 = 400;

// Default value function for serde (bool::default() is false, so only true needs a fn)
const fn default_true() -> bool {
    true
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config at {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse config at {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

impl ConfigError {
    pub fn path(&self) -> &PathBuf {
        match self {
            ConfigError::Read { path, .. } | ConfigError::Parse { path, .. } => path,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LookoutConfig {
    pub race: RaceConfig,
    pub http: HttpConfig,
    pub retry: RetryConfig,
    /// Keyed by provider id (`brasilapi`, `viacep`).
    pub providers: BTreeMap<String, ProviderConfig>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RaceConfig {
    pub timeout_ms: u64,
    /// How long cancelled losers get to unwind before their tasks are aborted.
    pub grace_ms: u64,
}

impl Default for RaceConfig {
    fn default() -> Self {
        Self {
            timeout_ms: DEFAULT_TIMEOUT_MS,
            grace_ms: DEFAULT_GRACE_MS,
        }
    }
}

impl RaceConfig {
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    #[must_use]
    pub const fn grace_period(&self) -> Duration {
        Duration::from_millis(self.grace_ms)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HttpConfig {
    pub connect_timeout_secs: u64,
    pub https_only: bool,
    /// `None` keeps the built-in `lookout/<version>` agent.
    pub user_agent: Option<String>,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            connect_timeout_secs: DEFAULT_CONNECT_TIMEOUT_SECS,
            https_only: true,
            user_agent: None,
        }
    }
}

impl HttpConfig {
    #[must_use]
    pub const fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

/// Retry policy for transient provider failures. Off unless `max_retries > 0`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RetryConfig {
    pub max_retries: u32,
    pub initial_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 0,
            initial_delay_ms: DEFAULT_RETRY_INITIAL_DELAY_MS,
            max_delay_ms: DEFAULT_RETRY_MAX_DELAY_MS,
        }
    }
}

impl RetryConfig {
    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        self.max_retries > 0
    }

    #[must_use]
    pub const fn initial_delay(&self) -> Duration {
        Duration::from_millis(self.initial_delay_ms)
    }

    #[must_use]
    pub const fn max_delay(&self) -> Duration {
        Duration::from_millis(self.max_delay_ms)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProviderConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    pub base_url: Option<String>,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            base_url: None,
        }
    }
}

impl LookoutConfig {
    /// Loads the config, then applies `LOOKOUT_TIMEOUT_MS`.
    ///
    /// An `explicit` path (from `--config`) must exist. Otherwise the file named
    /// by `LOOKOUT_CONFIG` or the default path is read if present.
    pub fn resolve(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match explicit {
            Some(path) => Self::load_from(path)?,
            None => match std::env::var_os(CONFIG_ENV).map(PathBuf::from).or_else(config_path) {
                Some(path) => Self::load_optional(&path)?,
                None => Self::default(),
            },
        };
        config.apply_timeout_override(std::env::var(TIMEOUT_ENV).ok().as_deref());
        Ok(config)
    }

    /// Loads an explicitly named file. A missing file is an error.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(err) => {
                tracing::warn!("Failed to read config at {:?}: {}", path, err);
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source: err,
                });
            }
        };

        match toml::from_str::<Self>(&content) {
            Ok(mut config) => {
                config.reject_zero_timeout(path);
                Ok(config)
            }
            Err(err) => {
                tracing::warn!("Failed to parse config at {:?}: {}", path, err);
                Err(ConfigError::Parse {
                    path: path.to_path_buf(),
                    source: err,
                })
            }
        }
    }

    fn reject_zero_timeout(&mut self, path: &Path) {
        if self.race.timeout_ms == 0 {
            tracing::warn!(
                path = %path.display(),
                default_ms = DEFAULT_TIMEOUT_MS,
                "race.timeout_ms must be positive, using the default"
            );
            self.race.timeout_ms = DEFAULT_TIMEOUT_MS;
        }
    }

    fn load_optional(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "No config file, using defaults");
            return Ok(Self::default());
        }
        Self::load_from(path)
    }

    /// Applies a `LOOKOUT_TIMEOUT_MS` value. Anything but a positive integer is ignored.
    pub fn apply_timeout_override(&mut self, raw: Option<&str>) {
        let Some(raw) = raw else { return };
        match raw.trim().parse::<u64>() {
            Ok(ms) if ms > 0 => self.race.timeout_ms = ms,
            _ => tracing::warn!(value = raw, "Ignoring invalid {TIMEOUT_ENV}"),
        }
    }

    /// Settings for one provider, defaulting to enabled with its canonical URL.
    #[must_use]
    pub fn provider(&self, id: &str) -> ProviderConfig {
        self.providers.get(id).cloned().unwrap_or_default()
    }
}

#[must_use]
pub fn config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".lookout").join("config.toml"))
}
