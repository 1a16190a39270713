//! Configuration management
//!
//! This module handles loading and parsing configuration for the Blogicum site.
//! Configuration can be loaded from:
//! - config.yml file
//! - Environment variables (override file settings)
//!
//! Missing optional values are filled with sensible defaults.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,
    /// Database configuration
    #[serde(default)]
    pub database: DatabaseConfig,
    /// Template override configuration
    #[serde(default)]
    pub theme: ThemeConfig,
    /// Upload configuration
    #[serde(default)]
    pub upload: UploadConfig,
    /// Blog behaviour (page size, sessions, site name)
    #[serde(default)]
    pub blog: BlogConfig,
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host address to bind to
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8000
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Database driver (sqlite or mysql)
    #[serde(default)]
    pub driver: DatabaseDriver,
    /// Database connection URL
    #[serde(default = "default_database_url")]
    pub url: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            driver: DatabaseDriver::default(),
            url: default_database_url(),
        }
    }
}

fn default_database_url() -> String {
    "data/blogicum.db".to_string()
}

/// Database driver type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseDriver {
    /// SQLite (default)
    #[default]
    Sqlite,
    /// MySQL
    Mysql,
}

/// Template override configuration.
///
/// The built-in templates are compiled into the binary. When `path` points at
/// an existing directory, any template found there replaces the built-in one
/// with the same name.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ThemeConfig {
    #[serde(default)]
    pub path: Option<PathBuf>,
}

/// Upload configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadConfig {
    /// Media root; post images land in `<path>/posts_images`
    #[serde(default = "default_upload_path")]
    pub path: PathBuf,
    /// Maximum file size in bytes (default: 10MB)
    #[serde(default = "default_max_file_size")]
    pub max_file_size: u64,
    /// Allowed image MIME types
    #[serde(default = "default_allowed_types")]
    pub allowed_types: Vec<String>,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            path: default_upload_path(),
            max_file_size: default_max_file_size(),
            allowed_types: default_allowed_types(),
        }
    }
}

fn default_upload_path() -> PathBuf {
    PathBuf::from("media")
}

fn default_max_file_size() -> u64 {
    10 * 1024 * 1024 // 10MB
}

fn default_allowed_types() -> Vec<String> {
    vec![
        "image/jpeg".to_string(),
        "image/png".to_string(),
        "image/gif".to_string(),
        "image/webp".to_string(),
    ]
}

impl UploadConfig {
    /// Check if a MIME type is allowed
    pub fn is_type_allowed(&self, mime_type: &str) -> bool {
        self.allowed_types.iter().any(|t| t == mime_type)
    }

    /// Get file extension for a MIME type
    pub fn get_extension(&self, mime_type: &str) -> &'static str {
        match mime_type {
            "image/jpeg" => "jpg",
            "image/png" => "png",
            "image/gif" => "gif",
            "image/webp" => "webp",
            "image/bmp" => "bmp",
            _ => "bin",
        }
    }
}

/// Blog behaviour settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlogConfig {
    /// Title shown in the page header
    #[serde(default = "default_site_name")]
    pub site_name: String,
    /// Posts per listing page
    #[serde(default = "default_posts_per_page")]
    pub posts_per_page: i64,
    /// Login session lifetime in days
    #[serde(default = "default_session_days")]
    pub session_days: i64,
}

impl Default for BlogConfig {
    fn default() -> Self {
        Self {
            site_name: default_site_name(),
            posts_per_page: default_posts_per_page(),
            session_days: default_session_days(),
        }
    }
}

fn default_site_name() -> String {
    "Blogicum".to_string()
}

fn default_posts_per_page() -> i64 {
    10
}

fn default_session_days() -> i64 {
    7
}

/// Error type for configuration parsing
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    FileRead {
        path: String,
        source: std::io::Error,
    },
    #[error("Failed to parse config file '{path}': {message}")]
    ParseError { path: String, message: String },
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

impl Config {
    /// Load configuration from file
    ///
    /// If the file doesn't exist, returns default configuration.
    /// If the file exists but is invalid YAML, returns an error with details.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::FileRead {
            path: path.display().to_string(),
            source: e,
        })?;

        if content.trim().is_empty() {
            return Ok(Self::default());
        }

        let config: Config =
            serde_yaml::from_str(&content).map_err(|e| ConfigError::ParseError {
                path: path.display().to_string(),
                message: format_yaml_error(&e),
            })?;

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from file with environment variable overrides
    ///
    /// Environment variables follow the pattern:
    /// - BLOGICUM_SERVER_HOST
    /// - BLOGICUM_SERVER_PORT
    /// - BLOGICUM_DATABASE_DRIVER
    /// - BLOGICUM_DATABASE_URL
    /// - BLOGICUM_UPLOAD_PATH
    /// - BLOGICUM_THEME_PATH
    /// - BLOGICUM_POSTS_PER_PAGE
    pub fn load_with_env(path: &Path) -> anyhow::Result<Self> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Reject values the rest of the application cannot work with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.blog.posts_per_page < 1 {
            return Err(ConfigError::ValidationError(
                "blog.posts_per_page must be at least 1".to_string(),
            ));
        }
        if self.blog.session_days < 1 {
            return Err(ConfigError::ValidationError(
                "blog.session_days must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(host) = std::env::var("BLOGICUM_SERVER_HOST") {
            self.server.host = host;
        }
        if let Ok(port) = std::env::var("BLOGICUM_SERVER_PORT") {
            if let Ok(port) = port.parse::<u16>() {
                self.server.port = port;
            }
        }

        if let Ok(driver) = std::env::var("BLOGICUM_DATABASE_DRIVER") {
            match driver.to_lowercase().as_str() {
                "sqlite" => self.database.driver = DatabaseDriver::Sqlite,
                "mysql" => self.database.driver = DatabaseDriver::Mysql,
                _ => {} // Ignore invalid values
            }
        }
        if let Ok(url) = std::env::var("BLOGICUM_DATABASE_URL") {
            self.database.url = url;
        }

        if let Ok(path) = std::env::var("BLOGICUM_UPLOAD_PATH") {
            self.upload.path = PathBuf::from(path);
        }
        if let Ok(path) = std::env::var("BLOGICUM_THEME_PATH") {
            self.theme.path = Some(PathBuf::from(path));
        }

        if let Ok(per_page) = std::env::var("BLOGICUM_POSTS_PER_PAGE") {
            match per_page.parse::<i64>() {
                Ok(n) if n > 0 => self.blog.posts_per_page = n,
                _ => {}
            }
        }
    }
}

/// Format YAML parsing error with location and context
fn format_yaml_error(e: &serde_yaml::Error) -> String {
    if let Some(location) = e.location() {
        format!(
            "at line {}, column {}: {}",
            location.line(),
            location.column(),
            e
        )
    } else {
        e.to_string()
    }
}

// Shared by `tests` and `property_tests`; both mutate process env.
#[cfg(test)]
static CONFIG_ENV_MUTEX: std::sync::Mutex<()> = std::sync::Mutex::new(());

#[cfg(test)]
const ENV_KEYS: &[&str] = &[
    "BLOGICUM_SERVER_HOST",
    "BLOGICUM_SERVER_PORT",
    "BLOGICUM_DATABASE_DRIVER",
    "BLOGICUM_DATABASE_URL",
    "BLOGICUM_UPLOAD_PATH",
    "BLOGICUM_THEME_PATH",
    "BLOGICUM_POSTS_PER_PAGE",
];

#[cfg(test)]
fn clear_env() {
    for key in ENV_KEYS {
        std::env::remove_var(key);
    }
}


#[cfg(test)]
mod property_tests {
    use super::*;
    use proptest::prelude::*;

    fn lock_env() -> std::sync::MutexGuard<'static, ()> {
        super::CONFIG_ENV_MUTEX
            .lock()
            .unwrap_or_else(|e| e.into_inner())
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(30))]

        /// Any valid port set through the environment wins over the file value
        #[test]
        fn env_port_overrides_default(port in 1u16..=65535) {
            let _guard = lock_env();
            clear_env();
            std::env::set_var("BLOGICUM_SERVER_PORT", port.to_string());

            let config = Config::load_with_env(Path::new("nonexistent_config.yml")).unwrap();
            clear_env();

            prop_assert_eq!(config.server.port, port);
        }

        /// Non-positive page sizes never validate
        #[test]
        fn non_positive_page_size_rejected(per_page in -1000i64..=0) {
            let mut config = Config::default();
            config.blog.posts_per_page = per_page;
            prop_assert!(config.validate().is_err());
        }
    }
}
