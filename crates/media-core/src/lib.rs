//! # Media processing for voxloop
//!
//! The audio-side engine of the platform: RTP frames arriving on a
//! multicast loop are demultiplexed by SSRC into per-stream reorder
//! buffers, decoded, and summed into a single PCM chunk stream on a steady
//! tick.
//!
//! ## Core components
//!
//! - [`RtpMixer`]: the per-channel mixing engine (enqueue side is
//!   thread-safe, the tick side drains into a [`Chunker`])
//! - [`StreamBuffer`]: bounded, idempotent per-SSRC reorder buffer
//! - [`AudioCodec`] with G.711 µ-law/A-law implementations
//! - [`Chunker`]: fixed-size sample hand-out for downstream consumers
//! - comfort-noise generation for loss masking

pub mod chunker;
pub mod codec;
pub mod error;
pub mod mixer;
pub mod noise;
pub mod stream;

pub use chunker::Chunker;
pub use codec::{create_codec, AudioCodec, CodecConfig, CodecKind};
pub use error::{Error, Result};
pub use mixer::{RtpMixer, RtpMixerConfig};
pub use noise::comfort_noise;
pub use stream::StreamBuffer;
