use std::time::Duration;

use serde::Deserialize;

use bloomguard_core::error::{OracleError, Result};
use bloomguard_core::protocol::bloomd::{validate_filter_name, DEFAULT_PORT};
use bloomguard_core::{KeyDeriver, KeyStrategy, DEFAULT_DELIMITER};

use crate::connection::ConnectionSettings;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OracleConfig {
    pub version: u32,

    /// Absent => revocation checks are not configured (no-op rejecter).
    #[serde(default)]
    pub bloomd: Option<BloomdConfig>,
}

impl OracleConfig {
    pub fn validate(&self) -> Result<()> {
        if self.version != 1 {
            return Err(OracleError::Config(format!(
                "unsupported config version: {}",
                self.version
            )));
        }
        if let Some(b) = &self.bloomd {
            b.validate()?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BloomdConfig {
    /// Filter name on the bloomd server.
    pub name: String,

    #[serde(default = "default_server_addr")]
    pub server_addr: String,

    /// Claim fields to probe, in order.
    pub token_keys: Vec<String>,

    #[serde(default)]
    pub key_strategy: KeyStrategy,

    #[serde(default = "default_delimiter")]
    pub delimiter: String,

    #[serde(default = "default_query_timeout_ms")]
    pub query_timeout_ms: u64,

    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,

    #[serde(default = "default_keepalive_secs")]
    pub keepalive_secs: u64,

    #[serde(default = "default_reconnect_backoff_ms")]
    pub reconnect_backoff_ms: u64,

    #[serde(default = "default_eager_connect")]
    pub eager_connect: bool,
}

impl BloomdConfig {
    /// Config with reference defaults for everything but the essentials.
    pub fn new(
        name: impl Into<String>,
        server_addr: impl Into<String>,
        token_keys: Vec<String>,
        key_strategy: KeyStrategy,
    ) -> Self {
        Self {
            name: name.into(),
            server_addr: server_addr.into(),
            token_keys,
            key_strategy,
            delimiter: default_delimiter(),
            query_timeout_ms: default_query_timeout_ms(),
            connect_timeout_ms: default_connect_timeout_ms(),
            keepalive_secs: default_keepalive_secs(),
            reconnect_backoff_ms: default_reconnect_backoff_ms(),
            eager_connect: default_eager_connect(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        validate_filter_name(&self.name)?;
        if self.server_addr.trim().is_empty() {
            return Err(OracleError::Config("bloomd.server_addr must not be empty".into()));
        }
        if !(10..=60000).contains(&self.query_timeout_ms) {
            return Err(OracleError::Config(
                "bloomd.query_timeout_ms must be between 10 and 60000".into(),
            ));
        }
        if !(10..=60000).contains(&self.connect_timeout_ms) {
            return Err(OracleError::Config(
                "bloomd.connect_timeout_ms must be between 10 and 60000".into(),
            ));
        }
        if !(1..=3600).contains(&self.keepalive_secs) {
            return Err(OracleError::Config(
                "bloomd.keepalive_secs must be between 1 and 3600".into(),
            ));
        }
        if self.reconnect_backoff_ms > 600000 {
            return Err(OracleError::Config(
                "bloomd.reconnect_backoff_ms must be at most 600000".into(),
            ));
        }
        // token_keys / delimiter rules live with the deriver.
        self.deriver().map(|_| ())
    }

    pub fn deriver(&self) -> Result<KeyDeriver> {
        KeyDeriver::new(self.token_keys.clone(), self.key_strategy, self.delimiter.clone())
    }

    pub fn settings(&self) -> ConnectionSettings {
        ConnectionSettings {
            query_timeout: Duration::from_millis(self.query_timeout_ms),
            connect_timeout: Duration::from_millis(self.connect_timeout_ms),
            keepalive: Duration::from_secs(self.keepalive_secs),
            reconnect_backoff: Duration::from_millis(self.reconnect_backoff_ms),
        }
    }
}

fn default_server_addr() -> String {
    format!("127.0.0.1:{DEFAULT_PORT}")
}
fn default_delimiter() -> String {
    DEFAULT_DELIMITER.into()
}
fn default_query_timeout_ms() -> u64 {
    1000
}
fn default_connect_timeout_ms() -> u64 {
    1000
}
fn default_keepalive_secs() -> u64 {
    20
}
fn default_reconnect_backoff_ms() -> u64 {
    5000
}
fn default_eager_connect() -> bool {
    true
}
