//! Server configuration object and environment helpers.

use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use crate::outbound::persistence::PoolConfig;

const DEFAULT_PORT: u16 = 8080;
const DEFAULT_DATABASE_PATH: &str = "iftar.db";
const DEFAULT_UPLOAD_DIR: &str = "uploads";
const DEFAULT_BUSY_TIMEOUT_MS: u64 = 30_000;

/// Builder-style configuration for creating the HTTP server.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub(crate) bind_addr: SocketAddr,
    pub(crate) database_path: PathBuf,
    pub(crate) upload_dir: PathBuf,
    pub(crate) busy_timeout: Duration,
}

impl ServerConfig {
    /// Construct a configuration with explicit values.
    #[must_use]
    pub fn new(bind_addr: SocketAddr, database_path: PathBuf, upload_dir: PathBuf) -> Self {
        Self {
            bind_addr,
            database_path,
            upload_dir,
            busy_timeout: Duration::from_millis(DEFAULT_BUSY_TIMEOUT_MS),
        }
    }

    /// Read configuration from the process environment.
    ///
    /// Recognised variables: `PORT`, `DATABASE_PATH`, `UPLOAD_DIR`, and
    /// `SQLITE_BUSY_TIMEOUT_MS`. Unset or unparseable values fall back to
    /// defaults.
    #[must_use]
    pub fn from_env() -> Self {
        let port = env::var("PORT")
            .ok()
            .and_then(|value| value.parse().ok())
            .unwrap_or(DEFAULT_PORT);
        let database_path = env::var("DATABASE_PATH")
            .unwrap_or_else(|_| DEFAULT_DATABASE_PATH.to_owned())
            .into();
        let upload_dir = env::var("UPLOAD_DIR")
            .unwrap_or_else(|_| DEFAULT_UPLOAD_DIR.to_owned())
            .into();
        let busy_timeout = env::var("SQLITE_BUSY_TIMEOUT_MS")
            .ok()
            .and_then(|value| value.parse().ok())
            .map_or(Duration::from_millis(DEFAULT_BUSY_TIMEOUT_MS), Duration::from_millis);

        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], port)),
            database_path,
            upload_dir,
            busy_timeout,
        }
    }

    /// Override the SQLite busy timeout.
    #[must_use]
    pub fn with_busy_timeout(mut self, busy_timeout: Duration) -> Self {
        self.busy_timeout = busy_timeout;
        self
    }

    /// Return the socket address the server will bind to.
    #[must_use]
    pub fn bind_addr(&self) -> SocketAddr {
        self.bind_addr
    }

    /// Derive the connection pool configuration.
    #[must_use]
    pub fn pool_config(&self) -> PoolConfig {
        PoolConfig::new(self.database_path.to_string_lossy().to_string())
            .with_busy_timeout(self.busy_timeout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn explicit_values_are_kept() {
        let config = ServerConfig::new(
            SocketAddr::from(([127, 0, 0, 1], 9000)),
            PathBuf::from("/tmp/test.db"),
            PathBuf::from("/tmp/uploads"),
        );
        assert_eq!(config.bind_addr().port(), 9000);
        assert_eq!(config.database_path, PathBuf::from("/tmp/test.db"));
        assert_eq!(config.upload_dir, PathBuf::from("/tmp/uploads"));
        assert_eq!(config.busy_timeout, Duration::from_millis(30_000));
    }

    #[rstest]
    fn busy_timeout_override() {
        let config = ServerConfig::new(
            SocketAddr::from(([127, 0, 0, 1], 9000)),
            PathBuf::from("db"),
            PathBuf::from("up"),
        )
        .with_busy_timeout(Duration::from_secs(5));
        assert_eq!(config.pool_config().busy_timeout(), Duration::from_secs(5));
    }
}
