//! Storage error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("invalid timestamp {0:?}")]
    InvalidTimestamp(String),
    #[error("invalid participation state {0:?}")]
    InvalidState(String),
    #[error("{0} exceeds the column limit of {1} characters")]
    ValueTooLong(&'static str, usize),
}

pub type Result<T> = std::result::Result<T, Error>;
