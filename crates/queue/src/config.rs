//! Queue configuration
//!
//! Loads [`QueueConfig`] from defaults, a TOML file, or environment variables.
//! Every loader validates the result before handing it out.
//!
//! ## Environment Variables
//! - `AIRTIME_QUEUE_NAME`: label used in log events
//! - `AIRTIME_QUEUE_ASAP_GUARD_US`: guard gap for `schedule_asap`, in
//!   microseconds
//! - `AIRTIME_QUEUE_WARN_ON_CONFLICT`: log reported conflicts at `warn`
//!   (true/false)
//!
//! Unset variables keep their default.
//!
//! ## File Format
//!
//! ```toml
//! name = "gateway-tx"
//! asap_guard = 500          # microseconds
//! warn_on_conflict = false
//! ```

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ConfigResult};
use crate::utils::duration_micros;

/// Largest accepted `asap_guard`.
pub const MAX_ASAP_GUARD: Duration = Duration::from_secs(1);

const ENV_NAME: &str = "AIRTIME_QUEUE_NAME";
const ENV_ASAP_GUARD_US: &str = "AIRTIME_QUEUE_ASAP_GUARD_US";
const ENV_WARN_ON_CONFLICT: &str = "AIRTIME_QUEUE_WARN_ON_CONFLICT";

/// Per-queue settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueConfig {
    /// Label attached to every log event of the queue
    pub name: String,
    /// Gap left after a conflicting item's end when `schedule_asap` moves its
    /// candidate forward
    #[serde(with = "duration_micros")]
    pub asap_guard: Duration,
    /// Log conflicts reported by `schedule` at `warn` instead of `debug`
    pub warn_on_conflict: bool,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self { name: "queue".to_string(), asap_guard: Duration::ZERO, warn_on_conflict: true }
    }
}

impl QueueConfig {
    /// Default configuration with a custom name
    pub fn named<S: Into<String>>(name: S) -> Self {
        Self { name: name.into(), ..Default::default() }
    }

    /// Sets the `schedule_asap` guard gap
    #[must_use]
    pub fn with_asap_guard(mut self, guard: Duration) -> Self {
        self.asap_guard = guard;
        self
    }

    /// Sets the log level used for reported conflicts
    #[must_use]
    pub fn with_warn_on_conflict(mut self, warn: bool) -> Self {
        self.warn_on_conflict = warn;
        self
    }

    /// Validate configuration
    ///
    /// # Errors
    /// Returns [`ConfigError::Invalid`] when the name is blank or the guard
    /// exceeds [`MAX_ASAP_GUARD`].
    pub fn validate(&self) -> ConfigResult<()> {
        if self.name.trim().is_empty() {
            return Err(ConfigError::invalid("name", "must not be empty"));
        }

        if self.asap_guard > MAX_ASAP_GUARD {
            return Err(ConfigError::invalid(
                "asap_guard",
                format!("must not exceed {MAX_ASAP_GUARD:?}, got {:?}", self.asap_guard),
            ));
        }

        Ok(())
    }

    /// Parse and validate a TOML document
    ///
    /// # Errors
    /// Returns [`ConfigError::Parse`] for malformed TOML and
    /// [`ConfigError::Invalid`] when validation fails.
    pub fn from_toml_str(input: &str) -> ConfigResult<Self> {
        let config: Self = toml::from_str(input)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a TOML config file
    ///
    /// # Errors
    /// Returns [`ConfigError::Io`] when the file cannot be read, otherwise the
    /// errors of [`QueueConfig::from_toml_str`].
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> ConfigResult<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .map_err(|source| ConfigError::Io { path: path.to_path_buf(), source })?;
        let config = Self::from_toml_str(&contents)?;
        tracing::info!(
            path = %path.display(),
            queue = %config.name,
            "queue config loaded from file"
        );
        Ok(config)
    }

    /// Build configuration from environment variables over the defaults
    ///
    /// # Errors
    /// Returns [`ConfigError::Env`] when a variable holds an unparsable value
    /// and [`ConfigError::Invalid`] when validation fails.
    pub fn from_env() -> ConfigResult<Self> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    pub(crate) fn from_lookup<F>(lookup: F) -> ConfigResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(name) = lookup(ENV_NAME) {
            config.name = name;
        }

        if let Some(raw) = lookup(ENV_ASAP_GUARD_US) {
            let micros = raw
                .trim()
                .parse::<u64>()
                .map_err(|e| ConfigError::env(ENV_ASAP_GUARD_US, e.to_string()))?;
            config.asap_guard = Duration::from_micros(micros);
        }

        if let Some(raw) = lookup(ENV_WARN_ON_CONFLICT) {
            config.warn_on_conflict = parse_bool(&raw)
                .ok_or_else(|| ConfigError::env(ENV_WARN_ON_CONFLICT, "expected true or false"))?;
        }

        config.validate()?;
        tracing::debug!(queue = %config.name, "queue config loaded from environment");
        Ok(config)
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
