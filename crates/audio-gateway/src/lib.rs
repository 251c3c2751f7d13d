//! # The voxloop audio gateway
//!
//! Bridges local audio hardware onto the multicast media plane without
//! client mediation:
//!
//! - **Playback path**: per output channel, a multicast receiver feeds
//!   RTP into an [`voxloop_media_core::RtpMixer`]; a steady tick mixes
//!   one PCM chunk and feeds the device, inserting comfort noise on
//!   underruns and resetting the device on failure.
//! - **Capture path**: per input channel, a blocking reader accumulates
//!   device periods, encodes RTP frames with monotone sequence numbers
//!   and timestamps, and sends them to the configured multicast group.
//!
//! The concrete device sits behind [`device::AudioBackend`]; the `alsa`
//! backend is compiled in with the `device-alsa` feature on Linux, the
//! mock backend (`device-mock`) drives the test suite.

pub mod app;
pub mod capture;
pub mod config;
pub mod device;
pub mod error;
pub mod playback;

#[cfg(all(feature = "device-alsa", target_os = "linux"))]
pub mod alsa_backend;
#[cfg(feature = "device-mock")]
pub mod mock;

pub use app::{AudioApp, OutChannel};
pub use capture::{start_capture, RecordPipeline, RtpStreamConfig};
pub use config::{ChannelConfig, GatewayConfig};
pub use device::{AudioBackend, CaptureDevice, DeviceError, PlayOutcome, PlaybackDevice};
pub use error::{Error, Result};
pub use playback::PlaybackChannel;
