//! Configuration for the gateway server
//!
//! Configuration is loaded in order of precedence:
//! 1. Environment variables (highest priority)
//! 2. Config file (~/.config/parley/config.toml)
//! 3. Built-in defaults (lowest priority)

use serde::Deserialize;
use std::net::SocketAddr;
use std::path::PathBuf;

use crate::relay::MidStreamPolicy;

// ─────────────────────────────────────────────────────────────────────────────
// Submodules
// ─────────────────────────────────────────────────────────────────────────────

mod serialization;

#[cfg(test)]
mod tests;

// ─────────────────────────────────────────────────────────────────────────────
// Constants
// ─────────────────────────────────────────────────────────────────────────────

/// Version info
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// ─────────────────────────────────────────────────────────────────────────────
// Application Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Address to bind the gateway server to
    pub bind_addr: SocketAddr,

    /// Native provider base URL (no trailing slash)
    pub api_url: String,

    /// OpenAI-compatible upstream base URL (no trailing slash, includes /v1)
    pub openai_api_url: String,

    /// Reject requests without credentials before calling upstream
    pub precheck_api_key: bool,

    /// Answer content-filter blocks with HTTP 400 instead of a pseudo-stream
    pub raise_4xx_when_blocked: bool,

    /// What to do when the provider fails after the first relayed frame
    pub mid_stream_failure: MidStreamPolicy,

    /// Text spliced ahead of a premature terminal event
    pub filler_notice: String,

    /// Rewrite v1 `citation_quality: accurate` to `fast`
    pub coerce_citation_quality: bool,

    /// Log incoming chat messages at debug level
    pub log_incoming: bool,

    /// Logging configuration
    pub logging: LoggingConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:8080".parse().unwrap(),
            api_url: "https://api.cohere.com".to_string(),
            openai_api_url: "https://api.openai.com/v1".to_string(),
            precheck_api_key: false,
            raise_4xx_when_blocked: true,
            mid_stream_failure: MidStreamPolicy::default(),
            filler_notice: "Output blocked by content filter.".to_string(),
            coerce_citation_quality: false,
            log_incoming: false,
            logging: LoggingConfig::default(),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Log Rotation
// ─────────────────────────────────────────────────────────────────────────────

/// Log file rotation strategy
#[derive(Debug, Clone, Default, PartialEq)]
pub enum LogRotation {
    /// Rotate log files hourly
    Hourly,
    /// Rotate log files daily (default)
    #[default]
    Daily,
    /// Never rotate - single log file
    Never,
}

impl LogRotation {
    /// Parse rotation string from config
    pub fn from_str(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "hourly" => Self::Hourly,
            "daily" => Self::Daily,
            "never" => Self::Never,
            _ => Self::Daily, // Default to daily for unknown values
        }
    }

    /// Convert to string for TOML serialization
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Hourly => "hourly",
            Self::Daily => "daily",
            Self::Never => "never",
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Logging Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    pub level: String,
    /// Enable file logging (in addition to stdout)
    pub file_enabled: bool,
    /// Directory for log files
    pub file_dir: PathBuf,
    /// Log file rotation strategy
    pub file_rotation: LogRotation,
    /// Prefix for log file names (e.g., "parley" -> "parley.2024-01-15.log")
    pub file_prefix: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file_enabled: false, // Opt-in feature
            file_dir: PathBuf::from("./logs"),
            file_rotation: LogRotation::Daily,
            file_prefix: "parley".to_string(),
        }
    }
}

/// Logging settings as loaded from config file
#[derive(Debug, Deserialize, Default)]
pub struct FileLogging {
    pub level: Option<String>,
    pub file_enabled: Option<bool>,
    pub file_dir: Option<String>,
    pub file_rotation: Option<String>,
    pub file_prefix: Option<String>,
}

impl LoggingConfig {
    /// Create from file config with defaults
    pub fn from_file(file: Option<FileLogging>) -> Self {
        let file = file.unwrap_or_default();
        let defaults = Self::default();

        Self {
            level: file.level.unwrap_or(defaults.level),
            file_enabled: file.file_enabled.unwrap_or(defaults.file_enabled),
            file_dir: file
                .file_dir
                .map(PathBuf::from)
                .unwrap_or(defaults.file_dir),
            file_rotation: file
                .file_rotation
                .map(|s| LogRotation::from_str(&s))
                .unwrap_or(defaults.file_rotation),
            file_prefix: file.file_prefix.unwrap_or(defaults.file_prefix),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// File Configuration (deserialization layer)
// ─────────────────────────────────────────────────────────────────────────────

/// Config file structure (subset of Config that makes sense to persist)
#[derive(Debug, Deserialize, Default)]
pub(crate) struct FileConfig {
    pub bind_addr: Option<String>,
    pub api_url: Option<String>,
    pub openai_api_url: Option<String>,
    pub precheck_api_key: Option<bool>,
    pub raise_4xx_when_blocked: Option<bool>,

    /// Optional [relay] section
    pub relay: Option<FileRelay>,

    /// Optional [request] section
    pub request: Option<FileRequest>,

    /// Optional [logging] section
    pub logging: Option<FileLogging>,
}

/// Relay settings as loaded from config file
#[derive(Debug, Deserialize, Default)]
pub(crate) struct FileRelay {
    pub mid_stream_failure: Option<String>,
    pub filler_notice: Option<String>,
}

/// Request touch-up settings as loaded from config file
#[derive(Debug, Deserialize, Default)]
pub(crate) struct FileRequest {
    pub coerce_citation_quality: Option<bool>,
    pub log_incoming: Option<bool>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Configuration Loading
// ─────────────────────────────────────────────────────────────────────────────

impl Config {
    /// Get the config file path: ~/.config/parley/config.toml
    /// Uses Unix-style ~/.config on all platforms for consistency
    pub fn config_path() -> Option<PathBuf> {
        dirs::home_dir().map(|p| p.join(".config").join("parley").join("config.toml"))
    }

    /// Create config file with defaults if it doesn't exist
    /// Called during startup to help users discover configuration options
    pub fn ensure_config_exists() {
        let Some(path) = Self::config_path() else {
            return;
        };

        // Don't overwrite existing config
        if path.exists() {
            return;
        }

        // Create parent directory
        if let Some(parent) = path.parent() {
            if std::fs::create_dir_all(parent).is_err() {
                return; // Silently fail - config is optional
            }
        }

        // Use Config::default().to_toml() as single source of truth
        let template = Self::default().to_toml();

        // Write config (ignore errors - config is optional)
        let _ = std::fs::write(&path, template);
    }

    /// Load file config if it exists
    ///
    /// # Panics
    /// If config file exists but cannot be parsed. This is intentional -
    /// a broken config should fail fast with a clear error, not silently
    /// fall back to defaults while the user debugs the wrong thing.
    fn load_file_config() -> FileConfig {
        let Some(path) = Self::config_path() else {
            return FileConfig::default();
        };

        match std::fs::read_to_string(&path) {
            Ok(contents) => match toml::from_str(&contents) {
                Ok(config) => config,
                Err(e) => {
                    // Fatal error - config exists but is invalid
                    eprintln!("\nCONFIG ERROR - Failed to parse configuration file\n");
                    eprintln!("  File: {}\n", path.display());
                    eprintln!("  Error: {}\n", e);
                    eprintln!("  To reset, delete the file and restart parley.\n");
                    std::process::exit(1);
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                // Config file doesn't exist - use defaults
                FileConfig::default()
            }
            Err(e) => {
                // File exists but can't be read (permissions, etc.)
                eprintln!("\nCONFIG ERROR - Cannot read configuration file\n");
                eprintln!("  File: {}\n", path.display());
                eprintln!("  Error: {}\n", e);
                std::process::exit(1);
            }
        }
    }

    /// Load configuration: env vars -> file -> defaults
    pub fn from_env() -> Self {
        let file = Self::load_file_config();
        let defaults = Self::default();

        // Bind address: env > file > default
        let bind_addr = std::env::var("PARLEY_BIND")
            .ok()
            .or(file.bind_addr)
            .map(|s| s.parse().expect("Invalid bind address"))
            .unwrap_or(defaults.bind_addr);

        // Native upstream URL: env > file > default
        let api_url = std::env::var("PARLEY_API_URL")
            .ok()
            .or(file.api_url)
            .map(|s| normalize_url(&s))
            .unwrap_or(defaults.api_url);

        // OpenAI-compatible upstream URL: env > file > default
        let openai_api_url = std::env::var("PARLEY_OPENAI_URL")
            .ok()
            .or(file.openai_api_url)
            .map(|s| normalize_url(&s))
            .unwrap_or(defaults.openai_api_url);

        // Policy flags: env > file > default
        let precheck_api_key = env_flag("PARLEY_PRECHECK_API_KEY")
            .or(file.precheck_api_key)
            .unwrap_or(defaults.precheck_api_key);
        let raise_4xx_when_blocked = env_flag("PARLEY_RAISE_4XX_WHEN_BLOCKED")
            .or(file.raise_4xx_when_blocked)
            .unwrap_or(defaults.raise_4xx_when_blocked);

        // [relay] section
        let relay = file.relay.unwrap_or_default();
        let mid_stream_failure = std::env::var("PARLEY_MID_STREAM_FAILURE")
            .ok()
            .or(relay.mid_stream_failure)
            .map(|s| MidStreamPolicy::from_str(&s))
            .unwrap_or(defaults.mid_stream_failure);
        let filler_notice = relay.filler_notice.unwrap_or(defaults.filler_notice);

        // [request] section
        let request = file.request.unwrap_or_default();
        let coerce_citation_quality = request
            .coerce_citation_quality
            .unwrap_or(defaults.coerce_citation_quality);
        let log_incoming = env_flag("PARLEY_LOG_INCOMING")
            .or(request.log_incoming)
            .unwrap_or(defaults.log_incoming);

        // [logging] section
        let logging = LoggingConfig::from_file(file.logging);

        Self {
            bind_addr,
            api_url,
            openai_api_url,
            precheck_api_key,
            raise_4xx_when_blocked,
            mid_stream_failure,
            filler_notice,
            coerce_citation_quality,
            log_incoming,
            logging,
        }
    }
}

/// Boolean env vars accept yes/true/1, case-insensitive
fn env_flag(name: &str) -> Option<bool> {
    std::env::var(name)
        .ok()
        .map(|v| matches!(v.to_lowercase().as_str(), "yes" | "true" | "1"))
}

/// Store upstream URLs without trailing slashes so path joins are uniform
fn normalize_url(url: &str) -> String {
    url.trim_end_matches('/').to_string()
}
