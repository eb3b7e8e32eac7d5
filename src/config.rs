//! # Configuration Management
//!
//! Settings for the reference server and for TCP sessions, loaded from TOML
//! files through the `config` crate. Every field has a default, so a file
//! only needs the values it changes. Environment variables prefixed with
//! `QDB_` override file values (e.g. `QDB_PORT=2900`).
//!
//! ## Example Server Configuration (server.toml)
//! ```toml
//! host = "127.0.0.1"
//! port = 2836
//! engine = "sled"
//! storage_path = "data"
//! disabled_operations = ["get_and_remove"]
//! ```
//!
//! ## Example Session Configuration (session.toml)
//! ```toml
//! address = "127.0.0.1:2836"
//! timeout_ms = 5000
//! ```

use crate::error::{Error, Result};
use crate::operation::OperationKind;
use crate::protocol::MAX_MESSAGE_BYTES;
use config::{Config as ConfigLib, Environment, File};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_PORT: u16 = 2836;

/// Storage engine behind the reference server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EngineKind {
    /// In-memory, lost on restart
    Memory,
    /// Persistent, stored under `storage_path`
    Sled,
}

impl FromStr for EngineKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "memory" => Ok(EngineKind::Memory),
            "sled" => Ok(EngineKind::Sled),
            other => Err(Error::config(format!(
                "unknown engine '{}', expected 'memory' or 'sled'",
                other
            ))),
        }
    }
}

impl fmt::Display for EngineKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineKind::Memory => f.write_str("memory"),
            EngineKind::Sled => f.write_str("sled"),
        }
    }
}

/// Configuration for the reference server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// IP address to bind to (e.g. "127.0.0.1" or "0.0.0.0")
    pub host: String,

    /// Port to listen on; 0 picks a free port
    pub port: u16,

    pub engine: EngineKind,

    /// Directory for the sled engine; unused by the memory engine
    pub storage_path: String,

    /// Operation kinds the server refuses with `OPERATION_DISABLED`
    pub disabled_operations: Vec<OperationKind>,

    /// Longest request line accepted; longer requests end the connection
    pub max_message_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: DEFAULT_PORT,
            engine: EngineKind::Memory,
            storage_path: "data".to_string(),
            disabled_operations: Vec::new(),
            max_message_bytes: MAX_MESSAGE_BYTES,
        }
    }
}

impl ServerConfig {
    /// Load from a TOML file, then apply `QDB_*` environment overrides.
    pub fn load(path: &Path) -> Result<Self> {
        load_with_env(path)
    }

    /// Like [`load`](Self::load), but a missing file yields the defaults.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Configuration for a [`TcpSession`](crate::session::TcpSession).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Server address in "host:port" form
    pub address: String,

    /// Connect, read and write timeout in milliseconds
    pub timeout_ms: u64,

    /// Longest response line accepted
    pub max_message_bytes: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            address: format!("127.0.0.1:{}", DEFAULT_PORT),
            timeout_ms: 30_000,
            max_message_bytes: MAX_MESSAGE_BYTES,
        }
    }
}

impl SessionConfig {
    pub fn load(path: &Path) -> Result<Self> {
        load_with_env(path)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

fn load_with_env<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let settings = ConfigLib::builder()
        .add_source(File::from(path))
        .add_source(Environment::with_prefix("QDB"))
        .build()?;

    Ok(settings.try_deserialize()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::Builder;

    fn toml_file(contents: &str) -> tempfile::NamedTempFile {
        let mut file = Builder::new().suffix(".toml").tempfile().unwrap();
        write!(file, "{}", contents).unwrap();
        file
    }

    #[test]
    fn server_config_load() {
        let file = toml_file(
            r#"
host = "0.0.0.0"
port = 4000
engine = "sled"
storage_path = "/tmp/qdb"
disabled_operations = ["get_and_remove", "remove_if"]
"#,
        );

        let config = ServerConfig::load(file.path()).unwrap();
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 4000);
        assert_eq!(config.engine, EngineKind::Sled);
        assert_eq!(config.storage_path, "/tmp/qdb");
        assert_eq!(
            config.disabled_operations,
            vec![OperationKind::GetAndRemove, OperationKind::RemoveIf]
        );
        assert_eq!(config.bind_addr(), "0.0.0.0:4000");
    }

    #[test]
    fn partial_file_keeps_defaults() {
        let file = toml_file("engine = \"memory\"\n");
        let config = ServerConfig::load(file.path()).unwrap();
        assert_eq!(config.port, DEFAULT_PORT);
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.max_message_bytes, MAX_MESSAGE_BYTES);
    }

    #[test]
    fn missing_file_yields_defaults() {
        let config = ServerConfig::load_or_default(Path::new("/nonexistent/server.toml")).unwrap();
        assert_eq!(config, ServerConfig::default());
    }

    #[test]
    fn session_config_load() {
        let file = toml_file("address = \"db.internal:2836\"\ntimeout_ms = 250\n");
        let config = SessionConfig::load(file.path()).unwrap();
        assert_eq!(config.address, "db.internal:2836");
        assert_eq!(config.timeout(), Duration::from_millis(250));
    }

    #[test]
    fn engine_kind_parses() {
        assert_eq!("SLED".parse::<EngineKind>().unwrap(), EngineKind::Sled);
        assert!(matches!(
            "rocksdb".parse::<EngineKind>(),
            Err(Error::Config { .. })
        ));
    }
}
