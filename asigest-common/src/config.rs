//! Bootstrap configuration
//!
//! Settings sources, highest priority first:
//! 1. Command-line arguments (parsed by the binary; clap also reads the
//!    `ASIGEST_*` environment variables for each argument)
//! 2. TOML configuration file
//! 3. Compiled defaults
//!
//! A missing TOML file is not fatal: a warning is logged and defaults apply.
//! A TOML file that exists but does not parse is a configuration error.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Application name reported by `/` and `/health`
pub const APP_NAME: &str = "ASI-GEST";

/// Configuration file name looked up under the platform config directory
const CONFIG_FILE_NAME: &str = "config.toml";

/// Folder name under the platform config/data directories
const APP_DIR_NAME: &str = "asigest";

/// Bootstrap configuration loaded from TOML file
///
/// Every section and field is optional in the file.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct TomlConfig {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub database: DatabaseConfig,

    #[serde(default)]
    pub cors: CorsConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// HTTP listener configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

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

/// Database locations
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct DatabaseConfig {
    /// Operational store (read-write)
    #[serde(default)]
    pub path: Option<PathBuf>,

    /// ASITRON ERP database (opened read-only)
    #[serde(default)]
    pub erp_path: Option<PathBuf>,
}

/// Allowed CORS origins
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CorsConfig {
    #[serde(default = "default_cors_origins")]
    pub origins: Vec<String>,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            origins: default_cors_origins(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_cors_origins() -> Vec<String> {
    vec![
        "http://localhost:5173".to_string(),
        "http://localhost:3000".to_string(),
    ]
}

fn default_log_level() -> String {
    "info".to_string()
}

/// OS-dependent compiled defaults
#[derive(Debug, Clone)]
pub struct CompiledDefaults {
    pub data_folder: PathBuf,
    pub db_path: PathBuf,
    pub erp_db_path: PathBuf,
}

impl CompiledDefaults {
    pub fn for_current_platform() -> Self {
        let data_folder = dirs::data_local_dir()
            .map(|d| d.join(APP_DIR_NAME))
            .unwrap_or_else(|| PathBuf::from("./asigest_data"));

        Self {
            db_path: data_folder.join("asi_gest.db"),
            erp_db_path: data_folder.join("asitron.db"),
            data_folder,
        }
    }
}

/// Values supplied on the command line (or through their environment variables)
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub db_path: Option<PathBuf>,
    pub erp_db_path: Option<PathBuf>,
    pub log_level: Option<String>,
}

/// Fully resolved settings used to start the service
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub host: String,
    pub port: u16,
    pub db_path: PathBuf,
    pub erp_db_path: PathBuf,
    pub cors_origins: Vec<String>,
    pub log_level: String,
}

impl Settings {
    /// Merge command-line overrides, TOML values and compiled defaults
    pub fn resolve(toml: TomlConfig, overrides: Overrides) -> Self {
        let defaults = CompiledDefaults::for_current_platform();

        Self {
            host: overrides.host.unwrap_or(toml.server.host),
            port: overrides.port.unwrap_or(toml.server.port),
            db_path: overrides
                .db_path
                .or(toml.database.path)
                .unwrap_or(defaults.db_path),
            erp_db_path: overrides
                .erp_db_path
                .or(toml.database.erp_path)
                .unwrap_or(defaults.erp_db_path),
            cors_origins: toml.cors.origins,
            log_level: overrides.log_level.unwrap_or(toml.logging.level),
        }
    }

    /// Socket address string for the HTTP listener
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Default configuration file path for the platform
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join(APP_DIR_NAME).join(CONFIG_FILE_NAME))
}

/// Load the TOML configuration
///
/// `explicit` comes from `--config` / `ASIGEST_CONFIG`; when absent the
/// platform default location is used. A missing file yields defaults.
pub fn load_toml_config(explicit: Option<&Path>) -> Result<TomlConfig> {
    let path = match explicit.map(Path::to_path_buf).or_else(default_config_path) {
        Some(path) => path,
        None => {
            warn!("Could not determine config directory, using defaults");
            return Ok(TomlConfig::default());
        }
    };

    if !path.exists() {
        warn!("Config file not found: {} (using defaults)", path.display());
        return Ok(TomlConfig::default());
    }

    let content = std::fs::read_to_string(&path)?;
    let config = parse_toml_config(&content)
        .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;

    info!("Loaded config file: {}", path.display());
    Ok(config)
}

/// Parse TOML text into a configuration
pub fn parse_toml_config(content: &str) -> Result<TomlConfig> {
    toml::from_str(content).map_err(|e| Error::Config(format!("Parse TOML failed: {}", e)))
}
