use std::path::PathBuf;

use serde::Deserialize;

/// Top-level application configuration.
/// Loaded from environment variables (prefix `SHELF`, separator `__`).
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Server settings
    #[serde(default)]
    pub server: ServerConfig,
    /// Downloads directory settings
    #[serde(default)]
    pub downloads: DownloadsConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host to bind to (default: 0.0.0.0)
    #[serde(default = "default_host")]
    pub host: String,
    /// HTTP port (default: 8080)
    #[serde(default = "default_port")]
    pub port: u16,
    /// Log level (default: info)
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DownloadsConfig {
    /// Root directory holding `<app>/<platform>/<artifact>` trees.
    /// Everything served by the download endpoint is confined to it.
    #[serde(default = "default_downloads_root")]
    pub root: PathBuf,
}

impl AppConfig {
    /// Load config from environment variables.
    pub fn load() -> Result<Self, config::ConfigError> {
        let cfg = config::Config::builder()
            .add_source(
                config::Environment::default()
                    .prefix("SHELF")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        cfg.try_deserialize()
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            log_level: default_log_level(),
        }
    }
}

impl Default for DownloadsConfig {
    fn default() -> Self {
        Self {
            root: default_downloads_root(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    8080
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_downloads_root() -> PathBuf {
    PathBuf::from("./static/downloads")
}
