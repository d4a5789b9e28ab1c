//! Codec module - conversion between bets and their text form.
//!
//! - [`Bet`] - one immutable bet record
//! - [`BetCodec`] - comma-joined serialization and input-line parsing
//!
//! Codecs are marker structs with static methods rather than trait objects,
//! the same shape the rest of the crate uses for stateless conversions.
//!
//! # Example
//!
//! ```
//! use betwire_client::codec::{Bet, BetCodec};
//!
//! let bet = BetCodec::parse(1, "Ana,Lopez,1001,1990-01-01,42").unwrap();
//! assert_eq!(BetCodec::serialize(&bet), "1,1001,Ana,Lopez,1990-01-01,42");
//! assert_eq!(BetCodec::deserialize(&BetCodec::serialize(&bet)).unwrap(), bet);
//! ```

mod bet;

pub use bet::{Bet, BetCodec, FIELD_SEPARATOR};
