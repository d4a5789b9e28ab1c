//! Outgoing message layout.
//!
//! ```text
//! bet      = <agency>,<document>,<name>,<surname>,<birth_date>,<number><END>
//! batch    = bet bet ... bet <BATCH>
//! fin      = <ACK>
//! winners  = WINNERS|<agency>|<ACK>
//! ```
//!
//! `<END>`, `<BATCH>` and `<ACK>` come from [`ClientConfig`](crate::ClientConfig).

use bytes::{BufMut, Bytes, BytesMut};

use crate::codec::{Bet, BetCodec};
use crate::error::{BetwireError, Result};

/// Separator between the fields of control messages and responses.
pub const FIELD_DELIMITER: char = '|';

/// Command word of the winners query and of its terminal response.
pub const WINNERS_COMMAND: &str = "WINNERS";

/// Status word the server answers while the draw is not finished.
pub const PROCESSING_STATUS: &str = "PROCESSING";

/// A single bet followed by the end-message marker.
pub fn bet_message(bet: &Bet, end_marker: &str) -> Result<Bytes> {
    let mut buf = BytesMut::new();
    put_bet(&mut buf, bet, end_marker)?;
    Ok(buf.freeze())
}

/// Each bet followed by the end-message marker, then the batch marker once.
///
/// # Errors
///
/// [`BetwireError::MalformedRecord`] if a serialized bet contains either
/// marker, since the peer could not split it back.
pub fn batch_message(bets: &[Bet], end_marker: &str, batch_marker: &str) -> Result<Bytes> {
    let mut buf = BytesMut::with_capacity(bets.len() * 48 + batch_marker.len());
    for bet in bets {
        let line = put_bet(&mut buf, bet, end_marker)?;
        if !batch_marker.is_empty() && line.contains(batch_marker) {
            return Err(BetwireError::malformed(
                &line,
                format!("contains the batch marker {batch_marker:?}"),
            ));
        }
    }
    buf.put_slice(batch_marker.as_bytes());
    Ok(buf.freeze())
}

/// The FIN control message: the ACK token reused as a sentinel.
#[inline]
pub fn fin_message(ack: &str) -> Bytes {
    Bytes::copy_from_slice(ack.as_bytes())
}

/// `WINNERS|<agency>|<ACK>`
pub fn winners_query(agency_id: u32, ack: &str) -> Bytes {
    Bytes::from(format!(
        "{WINNERS_COMMAND}{FIELD_DELIMITER}{agency_id}{FIELD_DELIMITER}{ack}"
    ))
}

fn put_bet(buf: &mut BytesMut, bet: &Bet, end_marker: &str) -> Result<String> {
    let line = BetCodec::serialize(bet);
    if !end_marker.is_empty() && line.contains(end_marker) {
        return Err(BetwireError::malformed(
            &line,
            format!("contains the end-message marker {end_marker:?}"),
        ));
    }
    buf.put_slice(line.as_bytes());
    buf.put_slice(end_marker.as_bytes());
    Ok(line)
}
