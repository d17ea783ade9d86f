//! Configuration module for the retrieval index.
//!
//! This module provides a layered configuration system that supports:
//! - Default values
//! - TOML configuration file
//! - Environment variable overrides
//! - CLI argument overrides
//!
//! # Environment Variables
//!
//! Environment variables must be prefixed with `SEMDEX_` and use double underscores
//! to separate nested levels:
//! - `SEMDEX_INDEX__MANIFEST=https://cdn.example.com/idx/manifest.json` sets `index.manifest`
//! - `SEMDEX_SEARCH__TOP_M_CLUSTERS=4` sets `search.top_m_clusters`
//! - `SEMDEX_LOGGING__LEVEL=debug` sets `logging.level`

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Name of the per-project configuration directory.
const CONFIG_DIR: &str = ".semdex";

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct Settings {
    /// Version of the configuration schema
    #[serde(default = "default_version")]
    pub version: u32,

    /// Index location settings
    #[serde(default)]
    pub index: IndexConfig,

    /// Search defaults
    #[serde(default)]
    pub search: SearchConfig,

    /// Artifact fetching
    #[serde(default)]
    pub fetch: FetchConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct IndexConfig {
    /// Manifest path or URL used when a command is not given one
    #[serde(default = "default_manifest")]
    pub manifest: String,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct SearchConfig {
    /// Clusters selected by the coarse stage
    #[serde(default = "default_top_m_clusters")]
    pub top_m_clusters: usize,

    /// Members kept per selected cluster
    #[serde(default = "default_top_k_per_cluster")]
    pub top_k_per_cluster: usize,

    /// Results returned after the merge
    #[serde(default = "default_final_top_n")]
    pub final_top_n: usize,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct FetchConfig {
    /// Per-request timeout for HTTP sources (seconds)
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Upper bound on a single downloaded artifact
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: u64,

    /// Clusters fetched concurrently during load
    #[serde(default = "default_max_concurrent_clusters")]
    pub max_concurrent_clusters: usize,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct LoggingConfig {
    /// Default filter when RUST_LOG is not set
    #[serde(default = "default_log_level")]
    pub level: String,
}

// Default value functions
fn default_version() -> u32 {
    1
}
fn default_manifest() -> String {
    "index/manifest.json".to_string()
}
fn default_top_m_clusters() -> usize {
    3
}
fn default_top_k_per_cluster() -> usize {
    10
}
fn default_final_top_n() -> usize {
    5
}
fn default_timeout_secs() -> u64 {
    30
}
fn default_max_body_bytes() -> u64 {
    64 * 1024 * 1024
}
fn default_max_concurrent_clusters() -> usize {
    crate::index::loader::DEFAULT_MAX_CONCURRENT_CLUSTERS
}
fn default_log_level() -> String {
    "warn".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            version: default_version(),
            index: IndexConfig::default(),
            search: SearchConfig::default(),
            fetch: FetchConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            manifest: default_manifest(),
        }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            top_m_clusters: default_top_m_clusters(),
            top_k_per_cluster: default_top_k_per_cluster(),
            final_top_n: default_final_top_n(),
        }
    }
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            max_body_bytes: default_max_body_bytes(),
            max_concurrent_clusters: default_max_concurrent_clusters(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl Settings {
    /// Load configuration from all sources
    pub fn load() -> Result<Self, Box<figment::Error>> {
        let config_path = Self::find_workspace_config()
            .unwrap_or_else(|| PathBuf::from(CONFIG_DIR).join("settings.toml"));
        Self::figment(config_path).extract().map_err(Box::new)
    }

    /// Load configuration from a specific file
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self, Box<figment::Error>> {
        Self::figment(path.as_ref().to_path_buf())
            .extract()
            .map_err(Box::new)
    }

    fn figment(config_path: PathBuf) -> Figment {
        Figment::new()
            .merge(Serialized::defaults(Settings::default()))
            .merge(Toml::file(config_path))
            // Double underscore separates nesting levels; single underscores
            // stay part of the field name.
            .merge(Env::prefixed("SEMDEX_").map(|key| {
                key.as_str()
                    .to_lowercase()
                    .replace("__", ".")
                    .into()
            }))
    }

    /// Find the settings file by looking for a `.semdex` directory
    /// from the current directory up to the root
    fn find_workspace_config() -> Option<PathBuf> {
        let current = std::env::current_dir().ok()?;

        for ancestor in current.ancestors() {
            let config_dir = ancestor.join(CONFIG_DIR);
            if config_dir.is_dir() {
                return Some(config_dir.join("settings.toml"));
            }
        }

        None
    }

    /// Save current configuration to file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), Box<dyn std::error::Error>> {
        let parent = path.as_ref().parent().ok_or("Invalid path")?;
        std::fs::create_dir_all(parent)?;

        let toml_string = toml::to_string_pretty(self)?;
        std::fs::write(path, toml_string)?;

        Ok(())
    }

    /// Create a default settings file with helpful comments
    pub fn init_config_file(force: bool) -> Result<PathBuf, Box<dyn std::error::Error>> {
        let config_path = PathBuf::from(CONFIG_DIR).join("settings.toml");
        Self::write_template(&config_path, force)?;
        Ok(config_path)
    }

    /// Writes the commented settings template to `config_path`.
    pub fn write_template(
        config_path: &Path,
        force: bool,
    ) -> Result<(), Box<dyn std::error::Error>> {
        if !force && config_path.exists() {
            return Err("Configuration file already exists. Use --force to overwrite".into());
        }

        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let defaults = Settings::default();
        let template = format!(
            r#"# semdex configuration file

# Version of the configuration schema
version = {version}

[index]
# Manifest path or http(s) URL; file references inside it are resolved
# relative to its location
manifest = "{manifest}"

[search]
# Clusters scanned per query (coarse stage)
top_m_clusters = {top_m}

# Best members kept from each scanned cluster
top_k_per_cluster = {top_k}

# Results returned to the caller
final_top_n = {top_n}

[fetch]
# HTTP timeout in seconds
timeout_secs = {timeout}

# Largest artifact accepted, in bytes
max_body_bytes = {max_body}

# Clusters loaded concurrently
max_concurrent_clusters = {concurrency}

[logging]
# Default log filter (RUST_LOG takes precedence)
level = "{level}"
"#,
            version = defaults.version,
            manifest = defaults.index.manifest,
            top_m = defaults.search.top_m_clusters,
            top_k = defaults.search.top_k_per_cluster,
            top_n = defaults.search.final_top_n,
            timeout = defaults.fetch.timeout_secs,
            max_body = defaults.fetch.max_body_bytes,
            concurrency = defaults.fetch.max_concurrent_clusters,
            level = defaults.logging.level,
        );

        std::fs::write(config_path, template)?;
        Ok(())
    }
}
