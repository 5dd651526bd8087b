// Server configuration.
//
// Read from environment variables with defaults suited to running locally.

use std::net::SocketAddr;
use std::path::PathBuf;

use crate::store::DEFAULT_DB_PATH;

#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Listen address (host:port).
    pub listen_addr: SocketAddr,
    /// JSON file holding tasks, appointments and settings.
    pub db_path: PathBuf,
    /// Directory served at `/`.
    pub static_dir: PathBuf,
    /// Log filter directive (e.g. `info`, `secretary_scheduler=debug`).
    pub log_filter: String,
}

impl AppConfig {
    /// Parse configuration from environment variables.
    ///
    /// | Variable | Default |
    /// |---|---|
    /// | `SECRETARY_HOST` | `127.0.0.1` |
    /// | `SECRETARY_PORT` | `3000` |
    /// | `SECRETARY_DB_PATH` | `data/db.json` |
    /// | `SECRETARY_STATIC_DIR` | `static` |
    /// | `SECRETARY_LOG_FILTER` | `info` |
    pub fn from_env() -> Self {
        Self::from_env_fn(|key| std::env::var(key))
    }

    fn from_env_fn<F>(env: F) -> Self
    where
        F: Fn(&str) -> Result<String, std::env::VarError>,
    {
        let host = env("SECRETARY_HOST").unwrap_or_else(|_| "127.0.0.1".into());
        let port: u16 = env("SECRETARY_PORT")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(3000);
        let listen_addr = format!("{host}:{port}")
            .parse()
            .unwrap_or_else(|_| SocketAddr::from(([127, 0, 0, 1], port)));

        let db_path = env("SECRETARY_DB_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_DB_PATH));
        let static_dir = env("SECRETARY_STATIC_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("static"));
        let log_filter = env("SECRETARY_LOG_FILTER").unwrap_or_else(|_| "info".into());

        Self {
            listen_addr,
            db_path,
            static_dir,
            log_filter,
        }
    }
}
