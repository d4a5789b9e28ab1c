//! Client configuration.
//!
//! [`ClientConfig`] carries the connection parameters and protocol tokens the
//! transport client needs. It can be built in code, loaded from `CLI_*`
//! environment variables, or deserialized from JSON.
//!
//! # Example
//!
//! ```
//! use betwire_client::ClientConfig;
//!
//! let config = ClientConfig::from_json_str(
//!     r#"{ "id": "1", "server_address": "127.0.0.1:12345", "packet_limit": 4 }"#,
//! ).unwrap();
//! assert_eq!(config.packet_limit, 4);
//! assert_eq!(config.server_ack, "PONG");
//! ```

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;

use crate::error::{BetwireError, Result};

/// Default bytes per write chunk (also the read buffer size).
pub const DEFAULT_PACKET_LIMIT: usize = 8 * 1024;

/// Default ACK token.
pub const DEFAULT_SERVER_ACK: &str = "PONG";

/// Default per-record delimiter inside a batch.
pub const DEFAULT_END_MESSAGE_MARKER: &str = "#";

/// Default batch terminator.
pub const DEFAULT_BATCH_MARKER: &str = "PING";

/// Default records per batch.
pub const DEFAULT_BATCH_SIZE: usize = 100;

/// Default upper bound on reads for a single response.
pub const DEFAULT_MAX_RESPONSE_READS: usize = 1024;

/// Default upper bound on PROCESSING answers while polling winners.
pub const DEFAULT_MAX_POLL_ATTEMPTS: u32 = 1000;

/// Environment variable names read by [`ClientConfig::from_env`].
pub mod env {
    pub const ID: &str = "CLI_ID";
    pub const SERVER_ADDRESS: &str = "CLI_SERVER_ADDRESS";
    pub const PACKET_LIMIT: &str = "CLI_PACKET_LIMIT";
    pub const SERVER_ACK: &str = "CLI_SERVER_ACK";
    pub const END_MESSAGE_MARKER: &str = "CLI_END_MESSAGE_MARKER";
    pub const BATCH_SIZE: &str = "CLI_BATCH_SIZE";
    pub const DATASET_DIR: &str = "CLI_DATASET_DIR";
    pub const LOOP_PERIOD_MS: &str = "CLI_LOOP_PERIOD_MS";
    pub const LOOP_LAPSE_MS: &str = "CLI_LOOP_LAPSE_MS";
    pub const READ_TIMEOUT_MS: &str = "CLI_READ_TIMEOUT_MS";
    pub const MAX_POLL_ATTEMPTS: &str = "CLI_MAX_POLL_ATTEMPTS";
}

/// Configuration consumed read-only by the client.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct ClientConfig {
    /// Client / agency identity, used in logs and heartbeat messages.
    pub id: String,
    /// Peer address (`host:port`).
    pub server_address: String,
    /// Maximum bytes per write chunk and read buffer size.
    #[serde(default = "default_packet_limit")]
    pub packet_limit: usize,
    /// ACK token: handshake acknowledgment, FIN sentinel and response terminator.
    #[serde(default = "default_server_ack")]
    pub server_ack: String,
    /// Marker appended after each serialized bet.
    #[serde(default = "default_end_message_marker")]
    pub end_message_marker: String,
    /// Marker appended once after the last bet of a batch.
    #[serde(default = "default_batch_marker")]
    pub batch_marker: String,
    /// Bets per batch in an agency run.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    /// Directory holding `agency-<id>.csv` files.
    #[serde(default = "default_dataset_dir")]
    pub dataset_dir: PathBuf,
    #[serde(default = "default_max_response_reads")]
    pub max_response_reads: usize,
    #[serde(default = "default_read_timeout_ms")]
    pub read_timeout_ms: u64,
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
    #[serde(default = "default_max_poll_attempts")]
    pub max_poll_attempts: u32,
    #[serde(default = "default_poll_backoff_min_ms")]
    pub poll_backoff_min_ms: u64,
    #[serde(default = "default_poll_backoff_max_ms")]
    pub poll_backoff_max_ms: u64,
    /// Heartbeat interval between probes.
    #[serde(default = "default_loop_period_ms")]
    pub loop_period_ms: u64,
    /// Heartbeat total duration.
    #[serde(default = "default_loop_lapse_ms")]
    pub loop_lapse_ms: u64,
}

fn default_packet_limit() -> usize {
    DEFAULT_PACKET_LIMIT
}
fn default_server_ack() -> String {
    DEFAULT_SERVER_ACK.to_string()
}
fn default_end_message_marker() -> String {
    DEFAULT_END_MESSAGE_MARKER.to_string()
}
fn default_batch_marker() -> String {
    DEFAULT_BATCH_MARKER.to_string()
}
fn default_batch_size() -> usize {
    DEFAULT_BATCH_SIZE
}
fn default_dataset_dir() -> PathBuf {
    PathBuf::from("/dataset")
}
fn default_max_response_reads() -> usize {
    DEFAULT_MAX_RESPONSE_READS
}
fn default_read_timeout_ms() -> u64 {
    30_000
}
fn default_connect_timeout_ms() -> u64 {
    10_000
}
fn default_max_poll_attempts() -> u32 {
    DEFAULT_MAX_POLL_ATTEMPTS
}
fn default_poll_backoff_min_ms() -> u64 {
    1
}
fn default_poll_backoff_max_ms() -> u64 {
    100
}
fn default_loop_period_ms() -> u64 {
    1_000
}
fn default_loop_lapse_ms() -> u64 {
    60_000
}

impl ClientConfig {
    /// Create a configuration with defaults for everything but identity and address.
    pub fn new(id: impl Into<String>, server_address: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            server_address: server_address.into(),
            packet_limit: default_packet_limit(),
            server_ack: default_server_ack(),
            end_message_marker: default_end_message_marker(),
            batch_marker: default_batch_marker(),
            batch_size: default_batch_size(),
            dataset_dir: default_dataset_dir(),
            max_response_reads: default_max_response_reads(),
            read_timeout_ms: default_read_timeout_ms(),
            connect_timeout_ms: default_connect_timeout_ms(),
            max_poll_attempts: default_max_poll_attempts(),
            poll_backoff_min_ms: default_poll_backoff_min_ms(),
            poll_backoff_max_ms: default_poll_backoff_max_ms(),
            loop_period_ms: default_loop_period_ms(),
            loop_lapse_ms: default_loop_lapse_ms(),
        }
    }

    /// Parse and validate a JSON configuration document.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from `CLI_*` environment variables.
    ///
    /// `CLI_ID` and `CLI_SERVER_ADDRESS` are required; numeric variables that
    /// are present but not numeric fail with [`BetwireError::Configuration`].
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| {
            lookup(key)
                .filter(|v| !v.is_empty())
                .ok_or_else(|| BetwireError::Configuration(format!("{key} is required")))
        };

        let mut config = Self::new(required(env::ID)?, required(env::SERVER_ADDRESS)?);

        if let Some(v) = numeric(&lookup, env::PACKET_LIMIT)? {
            config.packet_limit = v;
        }
        if let Some(v) = lookup(env::SERVER_ACK) {
            config.server_ack = v;
        }
        if let Some(v) = lookup(env::END_MESSAGE_MARKER) {
            config.end_message_marker = v;
        }
        if let Some(v) = numeric(&lookup, env::BATCH_SIZE)? {
            config.batch_size = v;
        }
        if let Some(v) = lookup(env::DATASET_DIR) {
            config.dataset_dir = PathBuf::from(v);
        }
        if let Some(v) = numeric(&lookup, env::LOOP_PERIOD_MS)? {
            config.loop_period_ms = v;
        }
        if let Some(v) = numeric(&lookup, env::LOOP_LAPSE_MS)? {
            config.loop_lapse_ms = v;
        }
        if let Some(v) = numeric(&lookup, env::READ_TIMEOUT_MS)? {
            config.read_timeout_ms = v;
        }
        if let Some(v) = numeric(&lookup, env::MAX_POLL_ATTEMPTS)? {
            config.max_poll_attempts = v;
        }

        config.validate()?;
        Ok(config)
    }

    /// Check the invariants the protocol relies on.
    pub fn validate(&self) -> Result<()> {
        if self.packet_limit == 0 {
            return Err(BetwireError::Configuration(
                "packet_limit must be at least 1".into(),
            ));
        }
        if self.server_ack.is_empty() {
            return Err(BetwireError::Configuration(
                "server_ack must not be empty".into(),
            ));
        }
        for (name, marker) in [
            ("server_ack", &self.server_ack),
            ("end_message_marker", &self.end_message_marker),
            ("batch_marker", &self.batch_marker),
        ] {
            if marker.contains(',') {
                return Err(BetwireError::Configuration(format!(
                    "{name} must not contain ','"
                )));
            }
        }
        if self.end_message_marker.is_empty() {
            return Err(BetwireError::Configuration(
                "end_message_marker must not be empty".into(),
            ));
        }
        if self.batch_size == 0 {
            return Err(BetwireError::Configuration(
                "batch_size must be at least 1".into(),
            ));
        }
        for (name, value) in [
            ("max_response_reads", self.max_response_reads as u64),
            ("read_timeout_ms", self.read_timeout_ms),
            ("connect_timeout_ms", self.connect_timeout_ms),
            ("max_poll_attempts", u64::from(self.max_poll_attempts)),
        ] {
            if value == 0 {
                return Err(BetwireError::Configuration(format!(
                    "{name} must be at least 1"
                )));
            }
        }
        if self.poll_backoff_min_ms > self.poll_backoff_max_ms {
            return Err(BetwireError::Configuration(format!(
                "poll backoff range is empty ({}ms > {}ms)",
                self.poll_backoff_min_ms, self.poll_backoff_max_ms
            )));
        }
        Ok(())
    }

    #[inline]
    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }

    #[inline]
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    #[inline]
    pub fn loop_period(&self) -> Duration {
        Duration::from_millis(self.loop_period_ms)
    }

    #[inline]
    pub fn loop_lapse(&self) -> Duration {
        Duration::from_millis(self.loop_lapse_ms)
    }

    /// Path of the bets file for an agency: `<dataset_dir>/agency-<id>.csv`.
    pub fn agency_file(&self, agency_id: u32) -> PathBuf {
        self.dataset_dir.join(format!("agency-{agency_id}.csv"))
    }
}

fn numeric<F, T>(lookup: &F, key: &str) -> Result<Option<T>>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        None => Ok(None),
        Some(raw) => raw.trim().parse().map(Some).map_err(|_| {
            BetwireError::Configuration(format!("{key} must be numeric, got {raw:?}"))
        }),
    }
}
