//! Classification of complete server responses.
//!
//! ```text
//! <ACK>                         plain acknowledgment
//! PROCESSING|<ACK>              winners not ready yet
//! WINNERS|<id>,<id>,...|<ACK>   terminal answer (id list may be empty)
//! ```

use super::wire_format::{FIELD_DELIMITER, PROCESSING_STATUS, WINNERS_COMMAND};
use crate::codec::FIELD_SEPARATOR;
use crate::error::{BetwireError, Result};

/// A classified server response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerResponse {
    /// The ACK token alone.
    Ack,
    /// The server is still computing winners; ask again later.
    Processing,
    /// Final winners list (document numbers, as sent by the server).
    Winners(Vec<String>),
}

impl ServerResponse {
    /// Classify a complete response terminated by `ack`.
    ///
    /// # Errors
    ///
    /// [`BetwireError::Protocol`] if the response matches none of the known
    /// shapes.
    pub fn parse(response: &str, ack: &str) -> Result<Self> {
        if response == ack {
            return Ok(Self::Ack);
        }

        let mut fields = response.split(FIELD_DELIMITER);
        match fields.next() {
            Some(PROCESSING_STATUS) => Ok(Self::Processing),
            Some(WINNERS_COMMAND) => {
                let ids = fields.next().ok_or_else(|| {
                    BetwireError::Protocol(format!(
                        "winners response without id list: {response:?}"
                    ))
                })?;
                Ok(Self::Winners(split_ids(ids)))
            }
            _ => Err(BetwireError::Protocol(format!(
                "unexpected response: {response:?}"
            ))),
        }
    }
}

fn split_ids(ids: &str) -> Vec<String> {
    ids.split(FIELD_SEPARATOR)
        .filter(|id| !id.is_empty())
        .map(str::to_string)
        .collect()
}
