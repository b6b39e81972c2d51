//! `load_config` module: loads the static YAML config and injects secrets from the environment.
//!
//! The config file holds nothing sensitive and is optional: every key has a default, and a
//! missing `pubsync.yaml` simply means "use the defaults". The API credential is only ever
//! read from the environment (`PUBSYNC_API_KEY`, optionally via a `.env` file).
//!
//! # Errors
//! File and YAML problems surface as `anyhow::Error` with the offending path; a missing
//! credential surfaces as [`PublishError::MissingCredential`].

use anyhow::{Context, Result};
use pubsync_core::config::Baseline;
use pubsync_core::PublishError;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{error, info};

pub const DEFAULT_CONFIG_PATH: &str = "pubsync.yaml";
pub const API_KEY_ENV: &str = "PUBSYNC_API_KEY";
pub const API_URL_ENV: &str = "PUBSYNC_API_URL";

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct CliConfig {
    /// Repository root. Content paths and git queries resolve against it; `index` and
    /// `state` are opened as given, relative to the working directory.
    pub root: PathBuf,
    pub index: PathBuf,
    pub state: PathBuf,
    pub api: ApiSection,
    pub retry: RetrySection,
    /// pandoc executable used for Org sources.
    pub pandoc: PathBuf,
    pub baseline: Baseline,
    pub strict_paths: bool,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            index: PathBuf::from("index.yaml"),
            state: PathBuf::from("publish-state.json"),
            api: ApiSection::default(),
            retry: RetrySection::default(),
            pandoc: PathBuf::from(pubsync_core::convert::DEFAULT_PANDOC),
            baseline: Baseline::default(),
            strict_paths: false,
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct ApiSection {
    pub base_url: String,
    pub timeout_secs: u64,
}

impl Default for ApiSection {
    fn default() -> Self {
        Self {
            base_url: "https://dev.to/api".to_string(),
            timeout_secs: 30,
        }
    }
}

/// Fixed-delay retry policy for transient transport failures.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct RetrySection {
    /// Total attempts, including the first one.
    pub attempts: u32,
    pub delay_ms: u64,
}

impl Default for RetrySection {
    fn default() -> Self {
        Self {
            attempts: 3,
            delay_ms: 2000,
        }
    }
}

/// Loads the config from `path`, or from `pubsync.yaml` when `path` is `None`.
///
/// An explicitly named file must exist; the default file may be absent.
pub fn load_config(path: Option<&Path>) -> Result<CliConfig> {
    let (path_ref, required) = match path {
        Some(p) => (p.to_path_buf(), true),
        None => (PathBuf::from(DEFAULT_CONFIG_PATH), false),
    };

    let mut config = if !required && !path_ref.exists() {
        info!(config_path = ?path_ref, "No config file, using defaults");
        CliConfig::default()
    } else {
        info!(config_path = ?path_ref, "Loading configuration from file");
        let content = fs::read_to_string(&path_ref).map_err(|e| {
            error!(error = ?e, config_path = ?path_ref, "Failed to read config file");
            anyhow::anyhow!("Failed to read config file {:?}: {}", path_ref, e)
        })?;
        if content.trim().is_empty() {
            CliConfig::default()
        } else {
            serde_yaml::from_str(&content)
                .map_err(|e| {
                    error!(error = ?e, config_path = ?path_ref, "Failed to parse config YAML");
                    e
                })
                .with_context(|| format!("Failed to parse config YAML {:?}", path_ref))?
        }
    };

    if let Ok(url) = std::env::var(API_URL_ENV) {
        if !url.trim().is_empty() {
            info!(base_url = %url, "API base URL overridden from environment");
            config.api.base_url = url.trim().to_string();
        }
    }

    if config.retry.attempts == 0 {
        anyhow::bail!("retry.attempts must be at least 1");
    }

    info!(
        index = %config.index.display(),
        state = %config.state.display(),
        base_url = %config.api.base_url,
        "Config loaded"
    );
    Ok(config)
}

/// Reads the API credential. Empty values count as missing.
pub fn api_key_from_env() -> Result<String, PublishError> {
    match std::env::var(API_KEY_ENV) {
        Ok(key) if !key.trim().is_empty() => {
            info!("{API_KEY_ENV} found in env");
            Ok(key.trim().to_string())
        }
        _ => {
            error!("{API_KEY_ENV} environment variable not set");
            Err(PublishError::MissingCredential(API_KEY_ENV))
        }
    }
}
