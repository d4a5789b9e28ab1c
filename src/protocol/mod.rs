//! Protocol module - message layout, response framing and classification.
//!
//! The betwire protocol is plain text over a byte stream:
//! - outgoing messages are built by the functions in [`wire_format`]
//! - every server response ends with the ACK token; [`ResponseBuffer`]
//!   accumulates reads until that suffix arrives
//! - [`ServerResponse`] classifies a complete response

mod response;
mod response_buffer;
mod wire_format;

pub use response::ServerResponse;
pub use response_buffer::ResponseBuffer;
pub use wire_format::{
    batch_message, bet_message, fin_message, winners_query, FIELD_DELIMITER, PROCESSING_STATUS,
    WINNERS_COMMAND,
};
