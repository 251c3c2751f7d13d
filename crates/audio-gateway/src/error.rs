//! Gateway error types.

use thiserror::Error;

use crate::device::DeviceError;

#[derive(Debug, Error)]
pub enum Error {
    #[error("device error: {0}")]
    Device(#[from] DeviceError),
    #[error("media error: {0}")]
    Media(#[from] voxloop_media_core::Error),
    #[error("socket error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid configuration: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, Error>;
