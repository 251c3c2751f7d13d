//! # Streaming structured-value parser and serde framing
//!
//! voxloop signalling travels as structured values (null, booleans,
//! numbers, strings, lists, objects) over byte-stream transports. This
//! crate provides:
//!
//! - [`Value`]: the value model with a canonical textual form,
//! - [`parse`]: an incremental parser that reports [`ParseOutcome::Progress`]
//!   on partial input without consuming anything,
//! - [`Serde`]: the framing trait (`add_raw` / `pop_datum` / `serialize` /
//!   `clear_buffer`) and its [`ValueSerde`] implementation, which turns an
//!   arbitrary chunking of octets into a stream of complete values.
//!
//! Typed decoding converts through `serde_json::Value`, so the envelope
//! layer keeps using derive-based serde while framing stays incremental.

mod parse;
mod serde_frame;
mod value;

pub use parse::{parse, ParseError, ParseOutcome};
pub use serde_frame::{Serde, SerdeState, ValueSerde};
pub use value::Value;
