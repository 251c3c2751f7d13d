//! # Event and recording storage for voxloop
//!
//! Two tables back the platform's audit and replay features:
//!
//! ```sql
//! events     (usr VARCHAR, role VARCHAR, loop VARCHAR, evstate VARCHAR, evtime TIMESTAMP)
//! recordings (id CHAR(36), uri VARCHAR, loop VARCHAR, starttime TIMESTAMP, endtime TIMESTAMP)
//! ```
//!
//! Timestamps are serialized as `YYYY-MM-DD HH:MM:SS` in UTC so they
//! compare lexicographically. Queries are paged with `LIMIT N+1`: a page
//! overflowing the requested maximum returns
//! [`QueryPage::TooManyResults`] instead of a truncated result.

mod db;
mod error;
mod timefmt;

pub use db::{
    Database, ParticipationEvent, ParticipationState, Recording, EventFilter, RecordingFilter,
    QueryPage,
};
pub use error::{Error, Result};
pub use timefmt::{format_timestamp, parse_timestamp};
