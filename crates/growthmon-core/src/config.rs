//! Configuration management.

use std::path::PathBuf;

use chrono::{TimeDelta, Utc};
use config::builder::DefaultState;
use config::{ConfigBuilder, ConfigError};
use serde::Deserialize;

/// Monitor configuration, passed explicitly to the repository and the chain.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct MonitorConfig {
    /// Time to live of a job in seconds. `<= 0` disables expiry.
    #[serde(default = "default_ttl_secs")]
    pub ttl_secs: i64,

    /// Base directory every job directory lives under
    #[serde(default = "default_media_root")]
    pub media_root: PathBuf,

    /// App-specific prefix under the media root
    #[serde(default = "default_app_root")]
    pub app_root: String,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            ttl_secs: default_ttl_secs(),
            media_root: default_media_root(),
            app_root: default_app_root(),
        }
    }
}

// 10 days
fn default_ttl_secs() -> i64 {
    864_000
}

fn default_media_root() -> PathBuf {
    PathBuf::from("media")
}

fn default_app_root() -> String {
    "growthmonitor".to_string()
}

impl MonitorConfig {
    /// Load configuration from `GROWTHMON_*` environment variables.
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_builder(config::Config::builder())
    }

    /// Load from a specific file path; the environment still wins.
    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        Self::from_builder(config::Config::builder().add_source(config::File::with_name(path)))
    }

    fn from_builder(builder: ConfigBuilder<DefaultState>) -> Result<Self, ConfigError> {
        let config = builder
            .add_source(config::Environment::with_prefix("GROWTHMON").try_parsing(true))
            .build()?;

        let cfg: Self = config.try_deserialize()?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Reject a TTL whose closure, counted from now, is not a valid date.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let closure = self
            .ttl()
            .and_then(|ttl| Utc::now().checked_add_signed(ttl));
        if closure.is_none() {
            return Err(ConfigError::Message(format!(
                "ttl_secs = {} is out of range",
                self.ttl_secs
            )));
        }
        Ok(())
    }

    pub fn with_ttl(mut self, ttl_secs: i64) -> Self {
        self.ttl_secs = ttl_secs;
        self
    }

    pub fn with_media_root(mut self, media_root: impl Into<PathBuf>) -> Self {
        self.media_root = media_root.into();
        self
    }

    /// `None` when `ttl_secs` does not fit a `TimeDelta`.
    pub fn ttl(&self) -> Option<TimeDelta> {
        TimeDelta::try_seconds(self.ttl_secs)
    }

    pub fn expiry_enabled(&self) -> bool {
        self.ttl_secs > 0
    }
}
