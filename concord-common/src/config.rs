//! Configuration loading and resolution
//!
//! Resolution priority for every setting:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. TOML config file
//! 4. Compiled default (fallback)
//!
//! A missing TOML file is not fatal: a warning is logged and defaults apply.
//! A TOML file that exists but does not parse is a configuration error.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable naming an explicit config file
pub const ENV_CONFIG: &str = "CONCORD_CONFIG";
/// Environment variable overriding the HTTP port
pub const ENV_PORT: &str = "CONCORD_PORT";
/// Environment variable overriding the log level
pub const ENV_LOG_LEVEL: &str = "CONCORD_LOG_LEVEL";

/// Complete configuration as read from TOML (every section optional)
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct TomlConfig {
    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub server: ServerConfig,

    /// Evaluation policy knobs handed explicitly to every run
    #[serde(default)]
    pub policy: EvaluationPolicy,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log file path (optional, logs to stderr if not specified)
    #[serde(default)]
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: None,
        }
    }
}

/// HTTP service configuration (`concord-rc serve`)
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Largest accepted request body
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            max_body_bytes: default_max_body_bytes(),
        }
    }
}

/// How to treat two different exact status codes within one status class
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum VariantPolicy {
    /// Keep the outcome, attach a `STATUS_VARIANTS` structural warning
    Warn,
    /// Treat the differing codes as mutually exclusive
    Contradict,
}

/// Evaluation policy for same-class status differences
///
/// Differing status classes (2xx vs 4xx vs 5xx) are always mutually
/// exclusive; these knobs only cover codes sharing a class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct EvaluationPolicy {
    /// 2xx vs 2xx (e.g. 200 vs 201)
    #[serde(default = "default_success_variants")]
    pub success_variants: VariantPolicy,

    /// 4xx vs 4xx or 5xx vs 5xx (e.g. 400 vs 422)
    #[serde(default = "default_error_variants")]
    pub error_variants: VariantPolicy,
}

impl Default for EvaluationPolicy {
    fn default() -> Self {
        Self {
            success_variants: default_success_variants(),
            error_variants: default_error_variants(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    5730
}

fn default_max_body_bytes() -> usize {
    8 * 1024 * 1024
}

fn default_success_variants() -> VariantPolicy {
    VariantPolicy::Warn
}

fn default_error_variants() -> VariantPolicy {
    VariantPolicy::Contradict
}

impl TomlConfig {
    /// Parse a TOML config file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content)
            .map_err(|e| Error::Config(format!("Parse TOML failed ({}): {}", path.display(), e)))
    }

    /// Default per-user config location (`<config_dir>/concord/concord.toml`)
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("concord").join("concord.toml"))
    }
}

/// Values given on the command line; `None` means "not given"
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub config_path: Option<PathBuf>,
    pub port: Option<u16>,
    pub log_level: Option<String>,
}

/// Resolve the effective configuration (CLI → ENV → TOML → defaults)
pub fn resolve_config(overrides: &ConfigOverrides) -> Result<TomlConfig> {
    let mut config = match locate_config_file(overrides) {
        Some(path) if path.exists() => {
            info!("Loading configuration from {}", path.display());
            TomlConfig::load(&path)?
        }
        Some(path) => {
            warn!(
                "Config file {} not found, using built-in defaults",
                path.display()
            );
            TomlConfig::default()
        }
        None => TomlConfig::default(),
    };

    // Port: CLI → ENV → TOML
    if let Some(port) = overrides.port {
        config.server.port = port;
    } else if let Ok(raw) = std::env::var(ENV_PORT) {
        config.server.port = raw
            .trim()
            .parse()
            .map_err(|_| Error::Config(format!("{} is not a valid port: '{}'", ENV_PORT, raw)))?;
    }

    // Log level: CLI → ENV → TOML
    if let Some(level) = &overrides.log_level {
        config.logging.level = level.clone();
    } else if let Ok(level) = std::env::var(ENV_LOG_LEVEL) {
        if !level.trim().is_empty() {
            config.logging.level = level.trim().to_string();
        }
    }

    Ok(config)
}

/// Config file path by priority; `None` when nothing points anywhere
fn locate_config_file(overrides: &ConfigOverrides) -> Option<PathBuf> {
    if let Some(path) = &overrides.config_path {
        return Some(path.clone());
    }

    if let Ok(path) = std::env::var(ENV_CONFIG) {
        if !path.trim().is_empty() {
            return Some(PathBuf::from(path));
        }
    }

    // The per-user default only counts when it is actually there
    TomlConfig::default_path().filter(|p| p.exists())
}
