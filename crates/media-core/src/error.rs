//! Media error types.

use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum Error {
    #[error("unsupported codec: {0}")]
    UnsupportedCodec(String),
    #[error("codec error: {0}")]
    Codec(String),
    #[error("invalid configuration: {0}")]
    Config(String),
    #[error("buffer error: {0}")]
    Buffer(String),
}

pub type Result<T> = std::result::Result<T, Error>;
