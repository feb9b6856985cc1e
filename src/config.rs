// Erase configuration: countdown delay, write chunk size and pass pattern.
//
// Values are fixed once a timer or eraser is constructed. Layering is
// defaults < config file < AUTOSHRED_* environment variables.

use crate::algorithms::ErasurePattern;
use crate::io::DEFAULT_CHUNK_SIZE;
use crate::timer::MAX_COUNTDOWN;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Default countdown before an armed timer erases its file
pub const DEFAULT_DELAY: Duration = Duration::from_secs(30);

const ENV_PREFIX: &str = "AUTOSHRED";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("chunk_size must be greater than zero")]
    ZeroChunkSize,

    #[error("delay must be greater than zero")]
    ZeroDelay,

    #[error("delay of {delay:?} exceeds the maximum countdown of 30 years")]
    DelayTooLong { delay: Duration },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EraseConfig {
    /// Countdown before automatic erasure, e.g. "30s" or "2m"
    #[serde(with = "humantime_serde")]
    pub delay: Duration,

    /// Bytes per write call
    pub chunk_size: usize,

    /// One byte per pass
    pub pattern: ErasurePattern,
}

impl Default for EraseConfig {
    fn default() -> Self {
        Self {
            delay: DEFAULT_DELAY,
            chunk_size: DEFAULT_CHUNK_SIZE,
            pattern: ErasurePattern::vsitr(),
        }
    }
}

impl EraseConfig {
    /// Load configuration from `explicit` (must exist) or the platform config
    /// file (optional), then apply environment overrides.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        let mut builder = config::Config::builder();

        match explicit {
            Some(path) => {
                builder = builder.add_source(config::File::from(path).required(true));
            }
            None => {
                if let Some(path) = Self::default_path() {
                    builder = builder.add_source(config::File::from(path).required(false));
                }
            }
        }

        let loaded: Self = builder
            .add_source(config::Environment::with_prefix(ENV_PREFIX).try_parsing(true))
            .build()?
            .try_deserialize()?;

        loaded.validate()?;
        tracing::debug!(
            delay = %humantime::format_duration(loaded.delay),
            chunk_size = loaded.chunk_size,
            passes = loaded.pattern.passes(),
            "Configuration loaded"
        );
        Ok(loaded)
    }

    /// `<config dir>/autoshred/config.toml` for the current platform
    pub fn default_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", "autoshred").map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// Apply a command-line delay over the loaded one and re-validate
    pub fn with_delay_override(mut self, delay: Option<Duration>) -> Result<Self, ConfigError> {
        if let Some(delay) = delay {
            self.delay = delay;
        }
        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.chunk_size == 0 {
            return Err(ConfigError::ZeroChunkSize);
        }
        if self.delay.is_zero() {
            return Err(ConfigError::ZeroDelay);
        }
        if self.delay > MAX_COUNTDOWN {
            return Err(ConfigError::DelayTooLong { delay: self.delay });
        }
        Ok(())
    }
}

/// Serde adapter writing durations as humantime strings ("30s").
///
/// Bare integers are read as seconds.
pub(crate) mod humantime_serde {
    use serde::de::{self, Visitor};
    use serde::{Deserializer, Serializer};
    use std::fmt;
    use std::time::Duration;

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&humantime::format_duration(*duration).to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        deserializer.deserialize_any(DurationVisitor)
    }

    struct DurationVisitor;

    impl<'de> Visitor<'de> for DurationVisitor {
        type Value = Duration;

        fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
            f.write_str("a duration such as \"30s\" or a number of seconds")
        }

        fn visit_str<E: de::Error>(self, value: &str) -> Result<Duration, E> {
            humantime::parse_duration(value.trim()).map_err(E::custom)
        }

        fn visit_u64<E: de::Error>(self, secs: u64) -> Result<Duration, E> {
            Ok(Duration::from_secs(secs))
        }

        fn visit_i64<E: de::Error>(self, secs: i64) -> Result<Duration, E> {
            u64::try_from(secs)
                .map(Duration::from_secs)
                .map_err(|_| E::custom("duration cannot be negative"))
        }
    }
}
