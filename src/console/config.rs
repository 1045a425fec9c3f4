//! Console server configuration
//!
//! Loaded from an optional TOML file, then overridden by environment
//! variables:
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | STATSD_CONSOLE_ADDR | 0.0.0.0:8126 | Listen address |
//! | STATSD_CONSOLE_WORKERS | 16 | Number of aggregator shards |
//! | STATSD_CONSOLE_RESULT_BUFFER | 16 | Fan-in result slots per read |
//! | STATSD_CONSOLE_IDLE_TIMEOUT_SECS | - | Close idle sessions after this many seconds |
//! | STATSD_CONSOLE_LOG_JSON | false | Emit JSON logs |

use crate::aggregator::DEFAULT_RESULT_BUFFER;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

pub const DEFAULT_CONSOLE_ADDR: &str = "0.0.0.0:8126";
pub const DEFAULT_PROMPT: &str = "console> ";
pub const DEFAULT_NUM_WORKERS: usize = 16;
pub const DEFAULT_MAX_LINE_LENGTH: usize = 8192;

#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(toml::de::Error),
    Invalid(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "failed to read config: {}", e),
            ConfigError::Parse(e) => write!(f, "failed to parse config: {}", e),
            ConfigError::Invalid(msg) => write!(f, "invalid config: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<std::io::Error> for ConfigError {
    fn from(e: std::io::Error) -> Self {
        ConfigError::Io(e)
    }
}

impl From<toml::de::Error> for ConfigError {
    fn from(e: toml::de::Error) -> Self {
        ConfigError::Parse(e)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsoleConfig {
    /// TCP listen address; empty means the default
    pub addr: String,
    /// Written before every input line
    pub prompt: String,
    /// Number of aggregator shards
    pub num_workers: usize,
    /// Capacity of the bounded fan-in channel of a read
    pub result_buffer: usize,
    /// Sessions idle for longer than this are closed
    pub idle_timeout_secs: Option<u64>,
    /// Longest accepted input line, in bytes
    pub max_line_length: usize,
    pub log_json: bool,
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        ConsoleConfig {
            addr: DEFAULT_CONSOLE_ADDR.to_string(),
            prompt: DEFAULT_PROMPT.to_string(),
            num_workers: DEFAULT_NUM_WORKERS,
            result_buffer: DEFAULT_RESULT_BUFFER,
            idle_timeout_secs: None,
            max_line_length: DEFAULT_MAX_LINE_LENGTH,
            log_json: false,
        }
    }
}

impl ConsoleConfig {
    /// File (if any), then environment, then validation
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        let config = config.apply_env()?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    pub fn apply_env(self) -> Result<Self, ConfigError> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Apply `STATSD_CONSOLE_*` overrides looked up through `lookup`
    pub fn apply_overrides<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(addr) = lookup("STATSD_CONSOLE_ADDR") {
            self.addr = addr;
        }
        if let Some(workers) = lookup("STATSD_CONSOLE_WORKERS") {
            self.num_workers = parse_var("STATSD_CONSOLE_WORKERS", &workers)?;
        }
        if let Some(slots) = lookup("STATSD_CONSOLE_RESULT_BUFFER") {
            self.result_buffer = parse_var("STATSD_CONSOLE_RESULT_BUFFER", &slots)?;
        }
        if let Some(secs) = lookup("STATSD_CONSOLE_IDLE_TIMEOUT_SECS") {
            self.idle_timeout_secs = Some(parse_var("STATSD_CONSOLE_IDLE_TIMEOUT_SECS", &secs)?);
        }
        if let Some(json) = lookup("STATSD_CONSOLE_LOG_JSON") {
            self.log_json = json == "true" || json == "1";
        }
        Ok(self)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.num_workers == 0 || self.num_workers > u16::MAX as usize {
            return Err(ConfigError::Invalid(format!(
                "num_workers must be between 1 and {}, got {}",
                u16::MAX,
                self.num_workers
            )));
        }
        if self.result_buffer == 0 {
            return Err(ConfigError::Invalid("result_buffer must be at least 1".to_string()));
        }
        if self.max_line_length == 0 {
            return Err(ConfigError::Invalid("max_line_length must be at least 1".to_string()));
        }
        if self.idle_timeout_secs == Some(0) {
            return Err(ConfigError::Invalid("idle_timeout_secs must be at least 1".to_string()));
        }
        Ok(())
    }

    /// Listen address, falling back to the default when unset
    pub fn addr(&self) -> &str {
        if self.addr.is_empty() {
            DEFAULT_CONSOLE_ADDR
        } else {
            &self.addr
        }
    }

    /// Shard count, clamped to what a worker id can address
    pub fn worker_count(&self) -> u16 {
        u16::try_from(self.num_workers).unwrap_or(u16::MAX).max(1)
    }

    pub fn idle_timeout(&self) -> Option<Duration> {
        self.idle_timeout_secs.map(Duration::from_secs)
    }
}

fn parse_var<T: std::str::FromStr>(name: &str, value: &str) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::Invalid(format!("{} has invalid value {:?}", name, value)))
}
