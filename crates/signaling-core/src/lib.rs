//! # Signalling plumbing for voxloop
//!
//! Everything the controller needs to talk to clients, the mixer backend
//! and the ICE frontend:
//!
//! - [`Envelope`]: the request/response/broadcast wire message
//! - [`ClientSocket`]: the typed per-connection key
//! - [`Correlator`]: the pending-request store matching fire-and-forget
//!   requests with their eventual responses, including deadline handling
//! - [`backend`] / [`frontend`]: typed constructors and response decoding
//!   for the mixer-manager and ICE-proxy protocols

pub mod backend;
pub mod correlator;
pub mod envelope;
pub mod frontend;
pub mod socket;

pub use correlator::{Correlator, CorrelatorError, Pending};
pub use envelope::{Envelope, ErrorInfo, MessageType};
pub use socket::ClientSocket;
