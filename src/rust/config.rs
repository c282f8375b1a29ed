//! Process configuration read from the environment.
//!
//! | Variable | Default | Meaning |
//! |----------|---------|---------|
//! | `HOST` | `0.0.0.0` | address the HTTP server binds |
//! | `PORT` | `5000` | port the HTTP server binds |
//! | `TOXIC_MODEL_LOCAL_DIR` | unset | model directory tried first |
//! | `TOXISCORE_CACHE` | platform cache | root of the download cache |
//! | `TOXISCORE_FALLBACK_URL` | Hugging Face | base URL of the fallback model |
//! | `TOXISCORE_OFFLINE` | `false` | never download the fallback model |
//! | `TOXISCORE_MAX_LENGTH` | `512` | truncation length in tokens |
//! | `TOXISCORE_INTRA_THREADS` | `0` | ONNX Runtime intra-op threads |
//! | `TOXISCORE_OPT_LEVEL` | `all` | ONNX graph optimization level |

use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;

use crate::classifier::builder::DEFAULT_MAX_SEQUENCE_LENGTH;
use crate::runtime::{OptimizationLevel, RuntimeConfig};

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 5000;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid value '{value}' for {key}")]
    InvalidValue { key: String, value: String },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub model_dir: Option<PathBuf>,
    pub cache_dir: Option<PathBuf>,
    pub fallback_url: Option<String>,
    pub offline: bool,
    pub max_sequence_length: usize,
    pub runtime: RuntimeConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            model_dir: None,
            cache_dir: None,
            fallback_url: None,
            offline: false,
            max_sequence_length: DEFAULT_MAX_SEQUENCE_LENGTH,
            runtime: RuntimeConfig::default(),
        }
    }
}

fn parse<T: FromStr>(key: &str, value: String) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::InvalidValue { key: key.to_string(), value })
}

fn parse_bool(key: &str, value: String) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        _ => Err(ConfigError::InvalidValue { key: key.to_string(), value }),
    }
}

impl Config {
    /// Reads the configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads the configuration through `lookup`, which maps a variable name
    /// to its value. Empty path values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(host) = lookup("HOST").filter(|h| !h.trim().is_empty()) {
            config.host = host.trim().to_string();
        }
        if let Some(port) = lookup("PORT") {
            config.port = parse("PORT", port)?;
        }
        config.model_dir = lookup("TOXIC_MODEL_LOCAL_DIR")
            .filter(|dir| !dir.is_empty())
            .map(PathBuf::from);
        config.cache_dir = lookup("TOXISCORE_CACHE")
            .filter(|dir| !dir.is_empty())
            .map(|dir| PathBuf::from(dir).join("models"));
        config.fallback_url = lookup("TOXISCORE_FALLBACK_URL").filter(|url| !url.is_empty());
        if let Some(offline) = lookup("TOXISCORE_OFFLINE") {
            config.offline = parse_bool("TOXISCORE_OFFLINE", offline)?;
        }
        if let Some(max_length) = lookup("TOXISCORE_MAX_LENGTH") {
            let max_length: usize = parse("TOXISCORE_MAX_LENGTH", max_length.clone())?;
            if max_length == 0 {
                return Err(ConfigError::InvalidValue {
                    key: "TOXISCORE_MAX_LENGTH".to_string(),
                    value: max_length.to_string(),
                });
            }
            config.max_sequence_length = max_length;
        }
        if let Some(threads) = lookup("TOXISCORE_INTRA_THREADS") {
            config.runtime.intra_threads = parse("TOXISCORE_INTRA_THREADS", threads)?;
        }
        if let Some(level) = lookup("TOXISCORE_OPT_LEVEL") {
            config.runtime.optimization_level = OptimizationLevel::parse(&level).ok_or(
                ConfigError::InvalidValue { key: "TOXISCORE_OPT_LEVEL".to_string(), value: level },
            )?;
        }

        Ok(config)
    }

    /// Address the HTTP server binds.
    pub fn bind_addr(&self) -> Result<SocketAddr, ConfigError> {
        let addr = format!("{}:{}", self.host, self.port);
        addr.parse().map_err(|_| ConfigError::InvalidValue { key: "HOST".to_string(), value: self.host.clone() })
    }
}
