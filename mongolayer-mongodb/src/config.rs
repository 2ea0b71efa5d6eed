//! Connection settings for the MongoDB backend.

use serde::Deserialize;
use std::time::Duration;

const DEFAULT_CONNECT_TIMEOUT_MS: u64 = 10_000;
const DEFAULT_PING_TIMEOUT_MS: u64 = 2_000;

/// Where and how to connect.
///
/// Deserializable so it can sit inside an application's own configuration file; the
/// timeouts are optional there.
///
/// ```ignore
/// let config: MongoDbConfig = serde_json::from_str(r#"{
///     "uri": "mongodb://localhost:27017",
///     "database": "app"
/// }"#)?;
/// let store = MongoDbStoreBuilder::from_config(config).build().await?;
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct MongoDbConfig {
    /// Connection string, e.g. `mongodb://localhost:27017`.
    pub uri: String,
    pub database: String,
    /// Upper bound on establishing a connection.
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
    /// Upper bound on the startup ping.
    #[serde(default = "default_ping_timeout_ms")]
    pub ping_timeout_ms: u64,
}

fn default_connect_timeout_ms() -> u64 {
    DEFAULT_CONNECT_TIMEOUT_MS
}

fn default_ping_timeout_ms() -> u64 {
    DEFAULT_PING_TIMEOUT_MS
}

impl MongoDbConfig {
    pub fn new(uri: impl Into<String>, database: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            database: database.into(),
            connect_timeout_ms: DEFAULT_CONNECT_TIMEOUT_MS,
            ping_timeout_ms: DEFAULT_PING_TIMEOUT_MS,
        }
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn ping_timeout(&self) -> Duration {
        Duration::from_millis(self.ping_timeout_ms)
    }
}
