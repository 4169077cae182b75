//! Application configuration.
//!
//! Configuration is loaded from a TOML file at:
//! 1. `$MBOXSESSION_CONFIG` (environment variable)
//! 2. `~/.config/mboxsession/config.toml` (Linux/macOS)
//!    `%APPDATA%\mboxsession\config.toml` (Windows)
//! 3. Built-in defaults

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::index::builder::{IndexOptions, DEFAULT_LABEL_PREFIX_LEN};
use crate::parser::mbox::DEFAULT_CHUNK_SIZE;
use crate::parser::summary::DEFAULT_PREVIEW_LEN;
use crate::session::cache::DEFAULT_DETAIL_CACHE_SIZE;
use crate::session::SessionSettings;

/// Environment variable overriding the config file location.
pub const CONFIG_ENV_VAR: &str = "MBOXSESSION_CONFIG";

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General behavior settings.
    pub general: GeneralConfig,
    /// Performance tuning.
    pub performance: PerformanceConfig,
}

/// General behavior settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log level: "error", "warn", "info", "debug", "trace".
    pub log_level: String,
    /// Override cache directory for logs.
    pub cache_dir: Option<PathBuf>,
}

/// Performance tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PerformanceConfig {
    /// Boundary scan chunk size in bytes (default: 4 MiB).
    pub chunk_size: usize,
    /// Bytes of each message searched for Gmail labels (default: 4 KiB).
    pub label_prefix_len: u64,
    /// Bytes of each message read to build a summary (default: 16 KiB).
    pub header_prefix_len: u64,
    /// Maximum preview length in characters.
    pub preview_len: usize,
    /// Number of decoded messages kept per session.
    pub detail_cache_size: usize,
}

// ── Default implementations ─────────────────────────────────────

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "warn".to_string(),
            cache_dir: None,
        }
    }
}

impl Default for PerformanceConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            label_prefix_len: DEFAULT_LABEL_PREFIX_LEN,
            header_prefix_len: 16 * 1024, // 16 KiB
            preview_len: DEFAULT_PREVIEW_LEN,
            detail_cache_size: DEFAULT_DETAIL_CACHE_SIZE,
        }
    }
}

impl Config {
    /// Session tuning derived from the `[performance]` section.
    ///
    /// Zero sizes fall back to their defaults.
    pub fn session_settings(&self) -> SessionSettings {
        let perf = &self.performance;
        let defaults = PerformanceConfig::default();
        let or_default_usize = |v: usize, d: usize| if v == 0 { d } else { v };
        let or_default_u64 = |v: u64, d: u64| if v == 0 { d } else { v };

        SessionSettings {
            index: IndexOptions {
                chunk_size: or_default_usize(perf.chunk_size, defaults.chunk_size),
                label_prefix_len: or_default_u64(perf.label_prefix_len, defaults.label_prefix_len),
            },
            header_prefix_len: or_default_u64(perf.header_prefix_len, defaults.header_prefix_len),
            preview_len: or_default_usize(perf.preview_len, defaults.preview_len),
            detail_cache_size: or_default_usize(perf.detail_cache_size, defaults.detail_cache_size),
        }
    }
}

// ── Load / save ─────────────────────────────────────────────────

/// Load configuration, searching standard locations.
///
/// Returns the default configuration if no file is found or on parse error.
pub fn load_config() -> Config {
    if let Some(path) = config_file_path() {
        if path.exists() {
            match std::fs::read_to_string(&path) {
                Ok(contents) => match toml::from_str::<Config>(&contents) {
                    Ok(cfg) => {
                        tracing::info!(path = %path.display(), "Loaded config");
                        return cfg;
                    }
                    Err(e) => {
                        tracing::warn!(
                            path = %path.display(),
                            error = %e,
                            "Failed to parse config, using defaults"
                        );
                    }
                },
                Err(e) => {
                    tracing::warn!(
                        path = %path.display(),
                        error = %e,
                        "Failed to read config file, using defaults"
                    );
                }
            }
        }
    }
    Config::default()
}

/// Save configuration to the standard location.
pub fn save_config(config: &Config) -> anyhow::Result<()> {
    let path = config_file_path()
        .ok_or_else(|| anyhow::anyhow!("Could not determine config file path"))?;

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let contents = toml::to_string_pretty(config)?;
    std::fs::write(&path, contents)?;
    tracing::info!(path = %path.display(), "Saved config");
    Ok(())
}

/// Determine the config file path (checking env var first, then standard dirs).
pub fn config_file_path() -> Option<PathBuf> {
    if let Ok(env_path) = std::env::var(CONFIG_ENV_VAR) {
        return Some(PathBuf::from(env_path));
    }
    dirs::config_dir().map(|d| d.join("mboxsession").join("config.toml"))
}

/// Return the cache directory for logs.
pub fn cache_dir(config: &Config) -> PathBuf {
    if let Some(ref dir) = config.general.cache_dir {
        return dir.clone();
    }
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("mboxsession")
}

/// Return the log file path.
pub fn log_file_path(config: &Config) -> PathBuf {
    cache_dir(config).join("mboxsession.log")
}
