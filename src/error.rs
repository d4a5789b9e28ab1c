//! Error types for betwire-client.

use thiserror::Error;

/// Main error type for all betwire operations.
#[derive(Debug, Error)]
pub enum BetwireError {
    /// Peer unreachable. Fatal for the current run.
    #[error("cannot connect to {addr}: {source}")]
    TransportConnect {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    /// Write failed mid-exchange (error or zero-byte write).
    #[error("transport write failed: {0}")]
    TransportWrite(#[source] std::io::Error),

    /// Read failed mid-exchange, or the peer closed before the ACK token.
    #[error("transport read failed: {0}")]
    TransportRead(#[source] std::io::Error),

    /// The response did not complete before the read deadline.
    #[error("no complete response within {0:?}")]
    ReadTimeout(std::time::Duration),

    /// An input line or wire record could not be turned into a bet.
    #[error("malformed record {line:?}: {reason}")]
    MalformedRecord { line: String, reason: String },

    /// Missing or invalid configuration value.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The server kept answering PROCESSING past the attempt limit.
    #[error("winners still processing after {attempts} attempts")]
    PollingTimeout { attempts: u32 },

    /// Response does not follow the expected shape.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// Operation needs an open connection.
    #[error("no open connection")]
    NotConnected,

    /// Shutdown was requested while waiting on the peer.
    #[error("operation cancelled")]
    Cancelled,

    /// Local I/O error (bet source files).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON configuration error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl BetwireError {
    pub(crate) fn malformed(line: &str, reason: impl Into<String>) -> Self {
        Self::MalformedRecord {
            line: line.to_string(),
            reason: reason.into(),
        }
    }

    /// Whether the error came from the connection rather than local input.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            Self::TransportConnect { .. }
                | Self::TransportWrite(_)
                | Self::TransportRead(_)
                | Self::ReadTimeout(_)
        )
    }
}

/// Result type alias using BetwireError.
pub type Result<T> = std::result::Result<T, BetwireError>;
