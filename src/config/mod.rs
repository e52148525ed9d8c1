//! Configuration module for the tour backend.
//!
//! All configuration is loaded from environment variables with sensible defaults.

use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Path to the SQLite database file. Unset means the remote backend is
    /// not configured and all operations go straight to local storage.
    pub db_path: Option<PathBuf>,
    /// Directory for the local key-value fallback store
    pub data_dir: PathBuf,
    /// Directory for uploaded media files
    pub media_dir: PathBuf,
    /// Address to bind the server to
    pub bind_addr: SocketAddr,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let db_path = env::var("TOUR_DB_PATH").ok().map(PathBuf::from);

        let data_dir = env::var("TOUR_DATA_DIR")
            .unwrap_or_else(|_| "./data/local".to_string())
            .into();

        let media_dir = env::var("TOUR_MEDIA_DIR")
            .unwrap_or_else(|_| "./data/media".to_string())
            .into();

        let bind_addr = env::var("TOUR_BIND_ADDR")
            .unwrap_or_else(|_| "127.0.0.1:8080".to_string())
            .parse()
            .expect("Invalid TOUR_BIND_ADDR format");

        let log_level = env::var("TOUR_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        Self {
            db_path,
            data_dir,
            media_dir,
            bind_addr,
            log_level,
        }
    }
}
