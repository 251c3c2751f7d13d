//! # Common infrastructure for the voxloop stack
//!
//! This crate carries the pieces every other voxloop crate leans on:
//!
//! - **Error codes** ([`ErrorCode`]): the stable numeric error surface
//!   shared between server, backend and clients, with canonical
//!   descriptions and the criticality predicate.
//! - **Outcome** ([`Outcome`]): the uniform `(code, message)` result that
//!   travels along asynchronous call paths and round-trips into the
//!   client-visible error envelope.
//! - **Time helpers**: microsecond epoch timestamps used by the session
//!   store and persistence files.

pub mod codes;
pub mod outcome;
pub mod time;

pub use codes::ErrorCode;
pub use outcome::Outcome;
pub use time::now_usecs;
