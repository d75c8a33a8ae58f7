//! Configuration management for annuaire.
//!
//! Provides TOML-based configuration with XDG-compliant paths and
//! environment variable overrides.

use crate::error::{ConfigError, ConfigResult};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

/// File name of the provider cache inside the data directory.
pub const DEFAULT_DATABASE_FILE: &str = "ameli_providers.db";

/// Main application configuration.
///
/// This is loaded from `~/.config/annuaire/config.toml` (or platform equivalent).
/// If the file doesn't exist, default values are used.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Remote portal endpoints and HTTP settings
    pub portal: PortalConfig,
    /// Scraping behavior settings
    pub scraping: ScrapingConfig,
    /// Local cache settings
    pub storage: StorageConfig,
}

impl AppConfig {
    /// Load configuration from the default location, falling back to defaults if not found.
    ///
    /// # Errors
    /// Returns error if:
    /// - Config directory cannot be determined
    /// - File exists but cannot be read
    /// - File contents are not valid TOML
    pub fn load() -> ConfigResult<Self> {
        let config_path = Self::config_path()?;
        Self::load_from(&config_path)
    }

    /// Load configuration from an explicit path, falling back to defaults if not found.
    pub fn load_from(config_path: &Path) -> ConfigResult<Self> {
        if config_path.exists() {
            tracing::debug!("Loading config from {}", config_path.display());
            let contents = fs::read_to_string(config_path)?;
            let config = toml::from_str(&contents)?;
            Ok(config)
        } else {
            tracing::debug!(
                "Config file not found at {}, using defaults",
                config_path.display()
            );
            Ok(Self::default())
        }
    }

    /// Load configuration with environment variable overrides, then validate it.
    ///
    /// Supports the following environment variables:
    /// - `ANNUAIRE_DATABASE_PATH`: Override the `SQLite` cache location
    /// - `ANNUAIRE_PORTAL_URL`: Override the portal base URL (bootstrap page)
    /// - `ANNUAIRE_API_URL`: Override the JSON API base URL
    /// - `ANNUAIRE_MIN_DELAY_MS` / `ANNUAIRE_MAX_DELAY_MS`: Override the politeness delay range
    pub fn load_with_env() -> ConfigResult<Self> {
        let mut config = Self::load()?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Apply overrides from the process environment.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Apply overrides from an arbitrary key lookup.
    ///
    /// Values that fail to parse are ignored with a warning.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(val) = lookup("ANNUAIRE_DATABASE_PATH") {
            tracing::debug!("Override storage.database_path from env: {}", val);
            self.storage.database_path = Some(PathBuf::from(val));
        }

        if let Some(val) = lookup("ANNUAIRE_PORTAL_URL") {
            tracing::debug!("Override portal.portal_url from env: {}", val);
            self.portal.portal_url = val;
        }

        if let Some(val) = lookup("ANNUAIRE_API_URL") {
            tracing::debug!("Override portal.api_url from env: {}", val);
            self.portal.api_url = val;
        }

        if let Some(val) = lookup("ANNUAIRE_MIN_DELAY_MS") {
            match val.parse() {
                Ok(ms) => self.scraping.min_delay_ms = ms,
                Err(e) => tracing::warn!("Ignoring ANNUAIRE_MIN_DELAY_MS={}: {}", val, e),
            }
        }

        if let Some(val) = lookup("ANNUAIRE_MAX_DELAY_MS") {
            match val.parse() {
                Ok(ms) => self.scraping.max_delay_ms = ms,
                Err(e) => tracing::warn!("Ignoring ANNUAIRE_MAX_DELAY_MS={}: {}", val, e),
            }
        }
    }

    /// Check cross-field constraints.
    pub fn validate(&self) -> ConfigResult<()> {
        for (field, value) in [
            ("portal.portal_url", &self.portal.portal_url),
            ("portal.api_url", &self.portal.api_url),
        ] {
            Url::parse(value).map_err(|e| ConfigError::InvalidValue {
                field: field.to_string(),
                reason: format!("not a valid URL ({e})"),
            })?;
        }

        if self.scraping.min_delay_ms > self.scraping.max_delay_ms {
            return Err(ConfigError::InvalidValue {
                field: "scraping.min_delay_ms".to_string(),
                reason: format!(
                    "{} is greater than scraping.max_delay_ms ({})",
                    self.scraping.min_delay_ms, self.scraping.max_delay_ms
                ),
            });
        }

        if self.scraping.default_profession_id == 0 {
            return Err(ConfigError::InvalidValue {
                field: "scraping.default_profession_id".to_string(),
                reason: "must be a positive profession code".to_string(),
            });
        }

        Ok(())
    }

    /// Resolve the `SQLite` cache path: the configured one, or the data directory default.
    pub fn database_path(&self) -> ConfigResult<PathBuf> {
        match &self.storage.database_path {
            Some(path) => Ok(path.clone()),
            None => Ok(Self::data_dir()?.join(DEFAULT_DATABASE_FILE)),
        }
    }

    /// Get the path to the configuration file.
    ///
    /// Uses XDG base directories: `~/.config/annuaire/config.toml`
    pub fn config_path() -> ConfigResult<PathBuf> {
        let dirs =
            ProjectDirs::from("fr", "annuaire", "annuaire").ok_or(ConfigError::NoConfigDir)?;
        Ok(dirs.config_dir().join("config.toml"))
    }

    /// Get the data directory path.
    ///
    /// Uses XDG base directories: `~/.local/share/annuaire`
    pub fn data_dir() -> ConfigResult<PathBuf> {
        let dirs =
            ProjectDirs::from("fr", "annuaire", "annuaire").ok_or(ConfigError::NoConfigDir)?;
        Ok(dirs.data_dir().to_path_buf())
    }
}

/// Remote portal settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PortalConfig {
    /// Portal root, used for the bootstrap page and as `Referer`
    pub portal_url: String,
    /// JSON API root (geocoding and directory search)
    pub api_url: String,
    /// Browser user agent sent on every request
    pub user_agent: String,
    /// Geocoding request timeout in seconds
    pub geocode_timeout_secs: u64,
    /// Bootstrap page request timeout in seconds
    pub bootstrap_timeout_secs: u64,
    /// Directory search request timeout in seconds
    pub search_timeout_secs: u64,
}

impl Default for PortalConfig {
    fn default() -> Self {
        Self {
            portal_url: "https://annuairesante.ameli.fr".to_string(),
            api_url: "https://annuairesante.ameli.fr/ansa-fo-api".to_string(),
            user_agent: "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) \
                         AppleWebKit/537.36 (KHTML, like Gecko) \
                         Chrome/120.0.0.0 Safari/537.36"
                .to_string(),
            geocode_timeout_secs: 10,
            bootstrap_timeout_secs: 10,
            search_timeout_secs: 30,
        }
    }
}

/// Scraping behavior settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScrapingConfig {
    /// Lower bound of the politeness delay before a search, in milliseconds
    pub min_delay_ms: u64,
    /// Upper bound of the politeness delay before a search, in milliseconds
    pub max_delay_ms: u64,
    /// Profession code used when none is given (37 = general practitioner)
    pub default_profession_id: u32,
}

impl ScrapingConfig {
    /// Politeness delay bounds as durations.
    #[must_use]
    pub fn delay_bounds(&self) -> (Duration, Duration) {
        (
            Duration::from_millis(self.min_delay_ms),
            Duration::from_millis(self.max_delay_ms),
        )
    }
}

impl Default for ScrapingConfig {
    fn default() -> Self {
        Self {
            min_delay_ms: 5_000,
            max_delay_ms: 12_000,
            default_profession_id: 37,
        }
    }
}

/// Local cache settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Explicit `SQLite` file; `None` means `<data dir>/ameli_providers.db`
    pub database_path: Option<PathBuf>,
}
