//! Configuration file structures for schoolwatch.
//!
//! The configuration is read from a YAML file and merged with environment
//! variables prefixed with `SCHOOLWATCH_`, using `__` between section and key.
//!
//! # Configuration File Format
//!
//! ```yaml
//! # Hosted store
//! store:
//!   # Base URL of the project
//!   url: "https://project.example.co"
//!   # Project api key
//!   api_key: "anon-key"
//!   # Seconds between two refreshes of the active emergencies (default 10)
//!   polling_interval: 10
//!   # Subscribe to the change feed in addition to polling (default true)
//!   push: true
//!   # Seconds the change feed may hold a request open (default 25)
//!   feed_wait: 25
//!
//! # Alarm output
//! alarm:
//!   # Player command relaunched while the alarm sounds, terminal bell if absent
//!   player: ["paplay", "/usr/share/sounds/freedesktop/stereo/alarm-clock-elapsed.oga"]
//!   # Desktop notifications through notify-send (default true)
//!   notifications: true
//!
//! # Console access
//! auth:
//!   password: "shared-password"
//! ```
//!
//! # Environment Variable Overrides
//!
//! ```bash
//! export SCHOOLWATCH_STORE__API_KEY="anon-key"
//! export SCHOOLWATCH_AUTH__PASSWORD="shared-password"
//! ```

use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Yaml},
};
use serde::Deserialize;

/// Prefix of the environment variable overrides.
const ENV_PREFIX: &str = "SCHOOLWATCH_";

/// Root configuration structure.
#[derive(Deserialize, Debug)]
pub struct Config {
    /// Hosted store configuration
    pub store: Store,
    /// Alarm output configuration
    #[serde(default)]
    pub alarm: Alarm,
    /// Console access configuration
    pub auth: Auth,
}

/// Hosted store configuration.
#[derive(Deserialize, Debug)]
pub struct Store {
    /// Base URL of the project, without trailing slash once loaded.
    pub url: String,

    /// Project api key, sent with every request.
    pub api_key: String,

    /// Polling interval in seconds.
    #[serde(default = "default_polling_interval")]
    pub polling_interval: u64,

    /// Whether to subscribe to the change feed.
    ///
    /// Polling stays the source of truth either way.
    #[serde(default = "default_true")]
    pub push: bool,

    /// Seconds the change feed may hold a request before answering empty.
    #[serde(default = "default_feed_wait")]
    pub feed_wait: u64,
}

/// Alarm output configuration.
#[derive(Deserialize, Debug)]
pub struct Alarm {
    /// Program and arguments of the sound player.
    ///
    /// The terminal bell is used when absent.
    #[serde(default)]
    pub player: Option<Vec<String>>,

    /// Whether desktop notifications may be shown.
    #[serde(default = "default_true")]
    pub notifications: bool,
}

impl Default for Alarm {
    fn default() -> Self {
        Alarm {
            player: None,
            notifications: true,
        }
    }
}

/// Console access configuration.
#[derive(Deserialize, Debug)]
pub struct Auth {
    /// Shared static password, compared client-side.
    pub password: String,
}

fn default_polling_interval() -> u64 {
    10
}

fn default_feed_wait() -> u64 {
    25
}

fn default_true() -> bool {
    true
}

impl Config {
    /// Loads the configuration from a YAML file merged with the environment.
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the YAML configuration file
    ///
    /// # Returns
    ///
    /// The [`Config`], or a [`figment::Error`] when the file is unreadable, a
    /// required key is missing, or the polling interval is zero.
    pub fn load(path: &str) -> Result<Config, figment::Error> {
        let mut config: Config = Figment::new()
            .merge(Yaml::file(path))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()?;

        if config.store.polling_interval == 0 {
            return Err(figment::Error::from(
                "store.polling_interval must be at least 1 second".to_string(),
            ));
        }

        // Normalize the store URL
        while config.store.url.ends_with('/') {
            config.store.url.pop();
        }

        Ok(config)
    }

    pub fn polling_interval(&self) -> Duration {
        Duration::from_secs(self.store.polling_interval)
    }
}
