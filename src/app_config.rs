//! Application configuration from file and environment variables
//!
//! Configuration is loaded with the following priority (highest to lowest):
//! 1. Environment variables (prefixed with CLUBHOUSE__, sections split by __)
//! 2. Config file (config.toml)
//! 3. Default values
//!
//! Secrets (database URL, session key) are read from `DATABASE_URL` and
//! `SECRET_KEY` directly and never live in the config file.

use config::{Config, ConfigError, Environment, File};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::sync::RwLock;

/// Global application configuration
pub static APP_CONFIG: Lazy<RwLock<AppConfig>> = Lazy::new(|| {
    RwLock::new(AppConfig::load().unwrap_or_else(|e| {
        log::warn!("Failed to load config file, using defaults: {}", e);
        AppConfig::default()
    }))
});

/// Site configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    pub name: String,
    pub description: String,
    pub base_url: String,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            name: "Clubhouse".to_string(),
            description: "Clubs, polls and proposals".to_string(),
            base_url: "http://localhost:8080".to_string(),
        }
    }
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address the HTTP server binds to
    pub bind_address: String,
    /// Send session cookies only over HTTPS
    pub secure_cookies: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            secure_cookies: false,
        }
    }
}

/// Club search tuning
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Minimum token-sort score (0-100) for a name match
    pub name_threshold: u8,
    /// Minimum token-set score (0-100) for a description match
    pub description_threshold: u8,
    /// Best candidates each pass considers before thresholds apply
    pub candidate_limit: usize,
    /// Queries shorter than this use substring matching only
    pub min_fuzzy_query_len: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            name_threshold: 55,
            description_threshold: 45,
            candidate_limit: 15,
            min_fuzzy_query_len: 3,
        }
    }
}

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub site: SiteConfig,
    pub server: ServerConfig,
    pub search: SearchConfig,
}

impl AppConfig {
    /// Load configuration from file and environment variables
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from_path("config.toml")
    }

    /// Load configuration from a specific path
    pub fn load_from_path(path: &str) -> Result<Self, ConfigError> {
        use config::FileFormat;

        let config = Config::builder()
            .add_source(config::Config::try_from(&AppConfig::default())?)
            .add_source(File::new(path, FileFormat::Toml).required(false))
            // e.g. CLUBHOUSE__SERVER__BIND_ADDRESS, CLUBHOUSE__SEARCH__NAME_THRESHOLD
            .add_source(
                Environment::with_prefix("CLUBHOUSE")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}

/// Initialize application configuration
///
/// This triggers the lazy loading of the config file and logs the result.
/// Should be called early in application startup.
pub fn init() {
    let config = get_config();
    log::info!(
        "Configuration loaded: site.name = {}, server.bind_address = {}",
        config.site.name,
        config.server.bind_address
    );
}

/// Get the current application configuration
pub fn get_config() -> AppConfig {
    APP_CONFIG.read().map(|c| c.clone()).unwrap_or_default()
}

/// Get site configuration
pub fn site() -> SiteConfig {
    get_config().site
}

/// Get server configuration
pub fn server() -> ServerConfig {
    get_config().server
}

/// Get search configuration
pub fn search() -> SearchConfig {
    get_config().search
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.site.name, "Clubhouse");
        assert_eq!(config.server.bind_address, "0.0.0.0:8080");
        assert_eq!(config.search.name_threshold, 55);
        assert_eq!(config.search.description_threshold, 45);
        assert_eq!(config.search.candidate_limit, 15);
        assert_eq!(config.search.min_fuzzy_query_len, 3);
    }

    #[test]
    fn test_load_from_toml_file() {
        let mut temp_file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            temp_file,
            r#"
[site]
name = "Test Clubs"

[server]
bind_address = "127.0.0.1:9000"

[search]
name_threshold = 70
candidate_limit = 5
"#
        )
        .unwrap();

        let config = AppConfig::load_from_path(temp_file.path().to_str().unwrap()).unwrap();

        assert_eq!(config.site.name, "Test Clubs");
        assert_eq!(config.server.bind_address, "127.0.0.1:9000");
        assert_eq!(config.search.name_threshold, 70);
        assert_eq!(config.search.candidate_limit, 5);
        // Defaults should still apply for unspecified values
        assert_eq!(config.search.description_threshold, 45);
        assert_eq!(config.site.base_url, "http://localhost:8080");
    }

    #[test]
    fn test_missing_config_file_uses_defaults() {
        let config = AppConfig::load_from_path("/nonexistent/config.toml").unwrap();
        assert_eq!(config.site.name, "Clubhouse");
        assert_eq!(config.search.name_threshold, 55);
    }
}
