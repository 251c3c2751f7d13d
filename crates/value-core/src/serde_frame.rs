//! Framing layer: turn arbitrarily chunked octets into complete values.
//!
//! The [`Serde`] trait is the seam between transports and the signalling
//! layer. Implementations accumulate raw octets, hand out fully parsed
//! datums, and serialize datums back onto a writer. The datum type is an
//! associated type, so mismatched pairings fail at compile time.

use std::collections::VecDeque;
use std::io::Write;

use thiserror::Error;
use voxloop_infra_common::{ErrorCode, Outcome};

use crate::parse::{parse, ParseError, ParseOutcome};
use crate::value::Value;

/// State after feeding raw octets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SerdeState {
    /// More octets are required before a datum completes.
    Progress,
    /// At least one datum is ready to be popped.
    End,
}

#[derive(Debug, Error)]
pub enum SerdeError {
    #[error("malformed input: {0}")]
    Malformed(#[from] ParseError),
    #[error("serialization failed: {0}")]
    Io(#[from] std::io::Error),
}

impl SerdeError {
    /// The wire outcome corresponding to this error.
    pub fn to_outcome(&self) -> Outcome {
        match self {
            SerdeError::Malformed(e) => Outcome::error_msg(ErrorCode::JsonDecode, e.to_string()),
            SerdeError::Io(e) => Outcome::error_msg(ErrorCode::JsonEncode, e.to_string()),
        }
    }
}

/// Streaming serializer/deserializer over a byte-stream transport.
pub trait Serde {
    type Datum;

    /// Feed raw octets. Returns [`SerdeState::End`] once at least one
    /// complete datum is available via [`Serde::pop_datum`].
    ///
    /// On a malformed token the internal buffer is kept so the caller can
    /// inspect it; call [`Serde::clear_buffer`] to resynchronize.
    fn add_raw(&mut self, raw: &[u8]) -> Result<SerdeState, SerdeError>;

    /// Pop the next complete datum, if any.
    fn pop_datum(&mut self) -> Option<Self::Datum>;

    /// Drop all buffered octets and parsed datums.
    fn clear_buffer(&mut self);

    /// Write the canonical serialized form of `datum` to `out`.
    fn serialize<W: Write>(&self, out: &mut W, datum: &Self::Datum) -> Result<(), SerdeError>;
}

/// [`Serde`] implementation for [`Value`] datums.
#[derive(Debug, Default)]
pub struct ValueSerde {
    buffer: Vec<u8>,
    ready: VecDeque<Value>,
}

impl ValueSerde {
    pub fn new() -> Self {
        Self::default()
    }

    /// Octets currently buffered and not yet part of a parsed value.
    pub fn buffered_octets(&self) -> usize {
        self.buffer.len()
    }

    fn drain_complete_values(&mut self) -> Result<(), SerdeError> {
        loop {
            match parse(&self.buffer) {
                ParseOutcome::Done { value, consumed } => {
                    self.ready.push_back(value);
                    self.buffer.drain(..consumed);
                }
                ParseOutcome::Progress => return Ok(()),
                ParseOutcome::Failed(e) => return Err(e.into()),
            }
        }
    }
}

impl Serde for ValueSerde {
    type Datum = Value;

    fn add_raw(&mut self, raw: &[u8]) -> Result<SerdeState, SerdeError> {
        self.buffer.extend_from_slice(raw);
        self.drain_complete_values()?;
        if self.ready.is_empty() {
            Ok(SerdeState::Progress)
        } else {
            Ok(SerdeState::End)
        }
    }

    fn pop_datum(&mut self) -> Option<Value> {
        self.ready.pop_front()
    }

    fn clear_buffer(&mut self) {
        self.buffer.clear();
        self.ready.clear();
    }

    fn serialize<W: Write>(&self, out: &mut W, datum: &Value) -> Result<(), SerdeError> {
        datum.write_to(out)?;
        Ok(())
    }
}
