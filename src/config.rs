//! Tool configuration.
//!
//! Handles loading, validating, and merging `rusarchives.toml`. Stock defaults
//! are the base layer; a user file in the config directory (`--config-dir`,
//! default `.`) overrides any subset of keys, and command-line flags override
//! both.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! [archives]
//! heading_level = 2         # Wiki heading level of top sections on a page
//! details_url = "http://cfc.rusarchives.ru/CFC-search/Search/DetailsModal"
//! save_url = false          # Record the details page link on each item
//!
//! [temples]
//! modern_name = "Храмы"
//! old_name = "Храмы (до 1917)"
//! modern_prefix = ""
//! old_prefix = ""
//! temple_prefix = ""
//! strip_in_brackets = true  # "Москва (город)" files under "Москва"
//!
//! [processing]
//! max_processes = 4         # Max parallel workers (omit for auto = CPU cores)
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

pub const CONFIG_FILE: &str = "rusarchives.toml";

/// Deepest top-level heading that still leaves room for item headings two
/// levels below it (wiki headings stop at six `=`).
pub const MAX_HEADING_LEVEL: usize = 4;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Configuration loaded from `rusarchives.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Archive catalog grouping and page generation.
    pub archives: ArchivesConfig,
    /// Temple hierarchy page generation.
    pub temples: TemplesConfig,
    /// Parallel processing settings.
    pub processing: ProcessingConfig,
}

impl Config {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=MAX_HEADING_LEVEL).contains(&self.archives.heading_level) {
            return Err(ConfigError::Validation(format!(
                "archives.heading_level must be 1-{MAX_HEADING_LEVEL}"
            )));
        }
        if self.archives.details_url.is_empty() {
            return Err(ConfigError::Validation(
                "archives.details_url must not be empty".into(),
            ));
        }
        if self.temples.modern_name.is_empty() || self.temples.old_name.is_empty() {
            return Err(ConfigError::Validation(
                "temples.modern_name and temples.old_name must not be empty".into(),
            ));
        }
        if self.processing.max_processes == Some(0) {
            return Err(ConfigError::Validation(
                "processing.max_processes must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ArchivesConfig {
    /// Number of `=` around the top-level headings of generated pages.
    pub heading_level: usize,
    /// Details page of the catalog search; item links are
    /// `<details_url>?ID=<id>&Kind=<kind>`.
    pub details_url: String,
    /// Record the details page link on each grouped item.
    pub save_url: bool,
}

impl Default for ArchivesConfig {
    fn default() -> Self {
        Self {
            heading_level: 2,
            details_url: "http://cfc.rusarchives.ru/CFC-search/Search/DetailsModal".to_string(),
            save_url: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TemplesConfig {
    /// Root of the present-day hierarchy.
    pub modern_name: String,
    /// Root of the pre-1917 hierarchy.
    pub old_name: String,
    /// Prepended to every present-day index page name.
    pub modern_prefix: String,
    /// Prepended to every pre-1917 index page name.
    pub old_prefix: String,
    /// Prepended to every temple page name.
    pub temple_prefix: String,
    /// Drop ` (...)` suffixes from region names before grouping.
    pub strip_in_brackets: bool,
}

impl Default for TemplesConfig {
    fn default() -> Self {
        Self {
            modern_name: "Храмы".to_string(),
            old_name: "Храмы (до 1917)".to_string(),
            modern_prefix: String::new(),
            old_prefix: String::new(),
            temple_prefix: String::new(),
            strip_in_brackets: true,
        }
    }
}

/// Parallel processing settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessingConfig {
    /// Maximum number of parallel workers reading detail files.
    /// When absent, defaults to the number of CPU cores.
    /// Values larger than the core count are clamped down.
    pub max_processes: Option<usize>,
}

/// Resolve the effective thread count from config.
///
/// - `None` → use all available cores
/// - `Some(n)` → use `min(n, cores)` (user can constrain down, not up)
pub fn effective_threads(config: &ProcessingConfig) -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    config.max_processes.map(|n| n.min(cores)).unwrap_or(cores)
}

/// Returns the stock default config as a `toml::Value::Table`.
pub fn stock_defaults_value() -> toml::Value {
    toml::Value::try_from(Config::default()).expect("default config must serialize")
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Load `rusarchives.toml` from a directory as a raw TOML value.
///
/// Returns `Ok(None)` if the directory has no config file.
pub fn load_raw_config(dir: &Path) -> Result<Option<toml::Value>, ConfigError> {
    let config_path = dir.join(CONFIG_FILE);
    if !config_path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(&config_path)?;
    Ok(Some(toml::from_str(&content)?))
}

/// Merge an optional overlay onto a base value, then deserialize and validate.
pub fn resolve_config(
    base: toml::Value,
    overlay: Option<toml::Value>,
) -> Result<Config, ConfigError> {
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: Config = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load config from `rusarchives.toml` in the given directory.
///
/// Merges user values on top of stock defaults, rejects unknown keys,
/// and validates the result.
pub fn load_config(dir: &Path) -> Result<Config, ConfigError> {
    resolve_config(stock_defaults_value(), load_raw_config(dir)?)
}

/// Returns a fully-commented stock `rusarchives.toml`.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# rusarchives configuration
# =========================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults. Unknown keys cause an error.
# Command-line flags take precedence over this file.

# ---------------------------------------------------------------------------
# Archive catalog
# ---------------------------------------------------------------------------
[archives]
# Heading level of the top sections on generated pages (1-4).
# Inventories and items are rendered one and two levels deeper.
heading_level = 2

# Catalog details page. With save_url, each grouped item records
# <details_url>?ID=<id>&Kind=<kind>, taken from its detail file name.
details_url = "http://cfc.rusarchives.ru/CFC-search/Search/DetailsModal"
save_url = false

# ---------------------------------------------------------------------------
# Temple hierarchy pages
# ---------------------------------------------------------------------------
[temples]
# Root index names of the present-day and pre-1917 hierarchies.
modern_name = "Храмы"
old_name = "Храмы (до 1917)"

# Prepended to index page names of each hierarchy, and to temple page names.
modern_prefix = ""
old_prefix = ""
temple_prefix = ""

# Group "Москва (город)" and "Москва" under one region.
strip_in_brackets = true

# ---------------------------------------------------------------------------
# Processing
# ---------------------------------------------------------------------------
[processing]
# Maximum parallel workers reading detail files.
# Omit or comment out to auto-detect (= number of CPU cores).
# max_processes = 4
"##
}
