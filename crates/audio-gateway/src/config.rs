//! Gateway configuration.
//!
//! ```json
//! {
//!   "frame_length_ms": 20,
//!   "sample_rate_hz": 8000,
//!   "codec": { "kind": "pcmu" },
//!   "ssrc_of_first_channel": 4000,
//!   "output": [
//!     { "device": "hw:0,0", "mixer_element": "Speaker",
//!       "loop_group": "239.1.1.1" }
//!   ],
//!   "input": [
//!     { "device": "hw:1,0", "mixer_element": "Mic",
//!       "loop_group": "239.1.1.1" }
//!   ]
//! }
//! ```
//!
//! A channel without `loop_group` stays idle until bound at runtime.

use std::net::Ipv4Addr;
use std::path::Path;

use serde::{Deserialize, Serialize};
use voxloop_media_core::CodecConfig;
use voxloop_rtp_core::{MulticastGroup, DEFAULT_MULTICAST_PORT};

use crate::error::{Error, Result};

pub const DEFAULT_PLAYBACK_VOLUME: f64 = 0.5;
pub const DEFAULT_RECORD_VOLUME: f64 = 0.5;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelConfig {
    pub device: String,
    #[serde(default)]
    pub mixer_element: Option<String>,
    #[serde(default = "default_volume")]
    pub volume: f64,
    /// Static multicast loop binding created at startup.
    #[serde(default)]
    pub loop_group: Option<Ipv4Addr>,
    #[serde(default)]
    pub port: Option<u16>,
}

impl ChannelConfig {
    pub fn multicast_group(&self) -> Option<MulticastGroup> {
        self.loop_group
            .map(|addr| MulticastGroup::new(addr, self.port.unwrap_or(DEFAULT_MULTICAST_PORT)))
    }
}

fn default_volume() -> f64 {
    DEFAULT_PLAYBACK_VOLUME
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_frame_length_ms")]
    pub frame_length_ms: u64,
    #[serde(default = "default_sample_rate")]
    pub sample_rate_hz: u32,
    #[serde(default)]
    pub codec: CodecConfig,
    #[serde(default = "default_noise_amplitude")]
    pub comfort_noise_max_amplitude: u16,
    #[serde(default = "default_buffer_ahead")]
    pub msecs_to_buffer_ahead: u16,
    /// Channel `i` sends (and cancels) SSRC `ssrc_of_first_channel + i`.
    #[serde(default = "default_first_ssrc")]
    pub ssrc_of_first_channel: u32,
    #[serde(default)]
    pub output: Vec<ChannelConfig>,
    #[serde(default)]
    pub input: Vec<ChannelConfig>,
    /// Frames a stream may buffer before old frames fall out.
    #[serde(default = "default_max_frames")]
    pub max_frames_per_stream: usize,
    /// Streams unseen for this long are collected.
    #[serde(default = "default_stream_lifetime")]
    pub max_stream_lifetime_secs: u32,
}

fn default_frame_length_ms() -> u64 {
    20
}

fn default_sample_rate() -> u32 {
    8000
}

fn default_noise_amplitude() -> u16 {
    1
}

fn default_buffer_ahead() -> u16 {
    100
}

fn default_first_ssrc() -> u32 {
    0x4000
}

fn default_max_frames() -> usize {
    10
}

fn default_stream_lifetime() -> u32 {
    5
}

impl Default for GatewayConfig {
    fn default() -> Self {
        serde_json::from_str("{}").expect("defaults deserialize")
    }
}

impl GatewayConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        let data = std::fs::read(path)?;
        serde_json::from_slice(&data)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))
    }

    pub fn samples_per_frame(&self) -> usize {
        (self.frame_length_ms as usize * self.sample_rate_hz as usize) / 1000
    }

    pub fn channel_ssrc(&self, index: usize) -> u32 {
        self.ssrc_of_first_channel.wrapping_add(index as u32)
    }
}
