//! User settings for the expense tracker
//!
//! Manages server binding, logging, upload limits and display preferences.

use serde::{Deserialize, Serialize};

use super::paths::TrackerPaths;
use crate::error::TrackerError;
use crate::storage::file_io::{read_json, write_json_atomic};

/// Persistent settings, stored as `settings.json` in the base directory
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Schema version for migration support
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,

    /// Address the HTTP server binds to
    #[serde(default = "default_host")]
    pub host: String,

    /// Port the HTTP server listens on
    #[serde(default = "default_port")]
    pub port: u16,

    /// `tracing` filter used when `RUST_LOG` is not set
    #[serde(default = "default_log_filter")]
    pub log_filter: String,

    /// Largest accepted invoice upload in bytes
    #[serde(default = "default_max_invoice_bytes")]
    pub max_invoice_bytes: usize,

    /// Default currency symbol
    #[serde(default = "default_currency")]
    pub currency_symbol: String,

    /// Date format preference (strftime format)
    #[serde(default = "default_date_format")]
    pub date_format: String,

    /// Allow any origin on the REST API (the frontend is served separately)
    #[serde(default = "default_cors_allow_any")]
    pub cors_allow_any: bool,
}

fn default_schema_version() -> u32 {
    1
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    2424
}

fn default_log_filter() -> String {
    "expense_tracker=info,tower_http=info".to_string()
}

fn default_max_invoice_bytes() -> usize {
    10 * 1024 * 1024
}

fn default_currency() -> String {
    "$".to_string()
}

fn default_date_format() -> String {
    "%Y-%m-%d".to_string()
}

fn default_cors_allow_any() -> bool {
    true
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            schema_version: default_schema_version(),
            host: default_host(),
            port: default_port(),
            log_filter: default_log_filter(),
            max_invoice_bytes: default_max_invoice_bytes(),
            currency_symbol: default_currency(),
            date_format: default_date_format(),
            cors_allow_any: default_cors_allow_any(),
        }
    }
}

impl Settings {
    /// Load settings from disk, or return defaults if the file doesn't exist
    pub fn load_or_create(paths: &TrackerPaths) -> Result<Self, TrackerError> {
        read_json(paths.settings_file())
            .map_err(|e| TrackerError::Config(format!("Failed to load settings: {}", e)))
    }

    /// Save settings to disk
    pub fn save(&self, paths: &TrackerPaths) -> Result<(), TrackerError> {
        paths.ensure_directories()?;
        write_json_atomic(paths.settings_file(), self)
    }

    /// Address string suitable for `SocketAddr` parsing
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();
        assert_eq!(settings.port, 2424);
        assert_eq!(settings.max_invoice_bytes, 10 * 1024 * 1024);
        assert_eq!(settings.bind_address(), "127.0.0.1:2424");
    }

    #[test]
    fn test_save_and_load() {
        let temp_dir = TempDir::new().unwrap();
        let paths = TrackerPaths::with_base_dir(temp_dir.path().to_path_buf());

        let mut settings = Settings::default();
        settings.port = 8080;
        settings.cors_allow_any = false;
        settings.save(&paths).unwrap();

        let loaded = Settings::load_or_create(&paths).unwrap();
        assert_eq!(loaded.port, 8080);
        assert!(!loaded.cors_allow_any);
    }

    #[test]
    fn test_missing_fields_use_defaults() {
        let settings: Settings = serde_json::from_str(r#"{"port": 9000}"#).unwrap();
        assert_eq!(settings.port, 9000);
        assert_eq!(settings.host, "127.0.0.1");
        assert_eq!(settings.currency_symbol, "$");
    }
}
