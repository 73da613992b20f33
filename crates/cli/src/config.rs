//! # Application Configuration
//!
//! Loads the `sitekb` configuration from an optional `config.yml` and environment
//! variables, in this order (later layers win):
//! 1. Built-in defaults.
//! 2. The YAML file, with `${VAR}` placeholders replaced from the environment.
//! 3. Top-level environment variables such as `DB_URL`.
//! 4. `SITEKB_`-prefixed variables for nested keys, e.g. `SITEKB_SITE__MAX_URLS=5`
//!    or `SITEKB_REFRESH__STALENESS_HOURS=12`.

use config::{Config as ConfigBuilder, Environment, File, FileFormat};
use regex::Regex;
use serde::Deserialize;
use sitekb::constants::DEFAULT_DB_FILE;
use sitekb::{RefreshSettings, SiteConfig};
use std::env;
use std::fs;
use std::path::Path;
use thiserror::Error;
use tracing::info;

/// The config file looked up in the working directory when no path is given.
pub const DEFAULT_CONFIG_FILE: &str = "config.yml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration error: {0}")]
    General(String),
    #[error("{0}")]
    NotFound(String),
}

impl From<config::ConfigError> for ConfigError {
    fn from(err: config::ConfigError) -> Self {
        ConfigError::General(err.to_string())
    }
}

/// The root configuration structure, mapping directly to `config.yml`.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct AppConfig {
    /// Path of the knowledge-base database. Loaded from `DB_URL` env var.
    #[serde(default = "default_db_url")]
    pub db_url: String,
    #[serde(default)]
    pub site: SiteConfig,
    #[serde(default)]
    pub refresh: RefreshSettings,
}

fn default_db_url() -> String {
    DEFAULT_DB_FILE.to_string()
}

// Reads a file and substitutes `${VAR}` placeholders. Unset variables become empty.
// Returns Ok(None) if the file does not exist.
fn read_and_substitute(path: &str) -> Result<Option<String>, ConfigError> {
    if !Path::new(path).exists() {
        return Ok(None);
    }

    let content = fs::read_to_string(path)
        .map_err(|e| ConfigError::General(format!("Failed to read config file '{path}': {e}")))?;

    let re = Regex::new(r"\$\{(?P<var>[A-Z0-9_]+)\}")
        .map_err(|e| ConfigError::General(e.to_string()))?;
    let expanded = re.replace_all(&content, |caps: &regex::Captures| {
        env::var(&caps["var"]).unwrap_or_default()
    });

    Ok(Some(expanded.into_owned()))
}

/// Loads the configuration.
///
/// An explicit `config_path_override` must exist; the default `config.yml` is optional.
pub fn get_config(config_path_override: Option<&str>) -> Result<AppConfig, ConfigError> {
    let mut builder = ConfigBuilder::builder()
        // Layer 1: Programmatic defaults.
        .set_default("db_url", DEFAULT_DB_FILE)?;

    // Layer 2: Config file.
    match config_path_override {
        Some(path) => {
            let content = read_and_substitute(path)?.ok_or_else(|| {
                ConfigError::NotFound(format!("Config file not found at '{path}'."))
            })?;
            info!("Loading configuration from '{path}'.");
            builder = builder.add_source(File::from_str(&content, FileFormat::Yaml));
        }
        None => {
            if let Some(content) = read_and_substitute(DEFAULT_CONFIG_FILE)? {
                info!("Loading configuration from '{DEFAULT_CONFIG_FILE}'.");
                builder = builder.add_source(File::from_str(&content, FileFormat::Yaml));
            }
        }
    }

    let settings = builder
        // Layer 3: Top-level keys like DB_URL.
        .add_source(Environment::default())
        // Layer 4: Prefixed variables for nested keys.
        .add_source(
            Environment::with_prefix("SITEKB")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true)
                .list_separator(",")
                .with_list_parse_key("site.keywords")
                .with_list_parse_key("site.fallback_urls"),
        )
        .build()?;

    Ok(settings.try_deserialize()?)
}
