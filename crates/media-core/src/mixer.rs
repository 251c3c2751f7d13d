//! The RTP mixer: many multicast streams in, one PCM chunk stream out.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Mutex, RwLock};
use voxloop_rtp_core::RtpPacket;

use crate::chunker::Chunker;
use crate::codec::{create_codec, CodecConfig};
use crate::error::Result;
use crate::stream::StreamBuffer;

#[derive(Debug, Clone)]
pub struct RtpMixerConfig {
    /// Reorder-buffer capacity per stream.
    pub max_frames_per_stream: usize,
    /// Own SSRC; frames carrying it are dropped silently (loopback
    /// cancellation on the multicast group).
    pub ssrc_to_cancel: Option<u32>,
    /// Mix cadence; one chunk of this length is produced per tick.
    pub frame_length_ms: u64,
    pub sample_rate_hz: u32,
    pub codec: CodecConfig,
}

impl Default for RtpMixerConfig {
    fn default() -> Self {
        Self {
            max_frames_per_stream: 10,
            ssrc_to_cancel: None,
            frame_length_ms: 20,
            sample_rate_hz: 8000,
            codec: CodecConfig::default(),
        }
    }
}

/// Mixes RTP streams of one loop into a PCM chunk stream.
///
/// The enqueue side ([`RtpMixer::add_packet`]) is called from the network
/// thread, the drain side ([`RtpMixer::mix_into`]) from the tick thread.
/// They synchronize through one lock per stream; the stream table itself
/// is only write-locked when a new SSRC appears or streams are collected.
pub struct RtpMixer {
    config: RtpMixerConfig,
    streams: RwLock<HashMap<u32, Arc<Mutex<StreamBuffer>>>>,
}

impl RtpMixer {
    pub fn new(config: RtpMixerConfig) -> Self {
        Self {
            config,
            streams: RwLock::new(HashMap::new()),
        }
    }

    /// Samples per mixed chunk.
    pub fn samples_per_frame(&self) -> usize {
        (self.config.frame_length_ms as usize * self.config.sample_rate_hz as usize) / 1000
    }

    pub fn active_streams(&self) -> usize {
        self.streams.read().len()
    }

    /// Enqueue one RTP packet. Returns `false` if the packet was dropped
    /// (own SSRC, duplicate, or behind the mix position).
    pub fn add_packet(&self, packet: &RtpPacket) -> Result<bool> {
        if Some(packet.ssrc) == self.config.ssrc_to_cancel {
            tracing::trace!(ssrc = packet.ssrc, "cancelling own loopback frame");
            return Ok(false);
        }

        let stream = {
            let streams = self.streams.read();
            streams.get(&packet.ssrc).cloned()
        };
        let stream = match stream {
            Some(stream) => stream,
            None => {
                let mut streams = self.streams.write();
                streams
                    .entry(packet.ssrc)
                    .or_insert_with(|| {
                        tracing::debug!(ssrc = packet.ssrc, "new RTP stream on loop");
                        Arc::new(Mutex::new(StreamBuffer::new(
                            packet.ssrc,
                            create_codec(self.config.codec),
                            self.config.max_frames_per_stream,
                        )))
                    })
                    .clone()
            }
        };

        let result = stream
            .lock()
            .insert(packet.sequence_number, &packet.payload);
        result
    }

    /// Produce one mixed chunk into `out`.
    ///
    /// Takes one frame (or concealment) per active stream, sums linearly
    /// and saturates once at the end. With no active streams nothing is
    /// emitted and `false` is returned.
    pub fn mix_into(&self, out: &mut Chunker) -> bool {
        let samples = self.samples_per_frame();
        let streams: Vec<_> = {
            let map = self.streams.read();
            map.values().cloned().collect()
        };
        if streams.is_empty() {
            return false;
        }

        let mut sum = vec![0i32; samples];
        for stream in streams {
            let frame = stream.lock().pop_next(samples);
            for (acc, sample) in sum.iter_mut().zip(frame) {
                *acc += sample as i32;
            }
        }

        let mixed: Vec<i16> = sum
            .into_iter()
            .map(|acc| acc.clamp(i16::MIN as i32, i16::MAX as i32) as i16)
            .collect();
        out.add(&mixed);
        true
    }

    /// Drop streams not seen for `max_age`.
    pub fn garbage_collect(&self, max_age: Duration) {
        let mut streams = self.streams.write();
        streams.retain(|ssrc, stream| {
            let keep = stream.lock().last_seen().elapsed() <= max_age;
            if !keep {
                tracing::debug!(ssrc, "collecting idle RTP stream");
            }
            keep
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    fn packet(ssrc: u32, sequence: u16, payload: &[u8]) -> RtpPacket {
        RtpPacket::new(0, sequence, sequence as u32 * 160, ssrc, Bytes::copy_from_slice(payload))
    }

    fn mixer() -> RtpMixer {
        RtpMixer::new(RtpMixerConfig::default())
    }

    #[test]
    fn chunk_length_follows_config() {
        let mixer = mixer();
        assert_eq!(mixer.samples_per_frame(), 160);

        let mut out = Chunker::new();
        mixer.add_packet(&packet(1, 0, &[0x00; 160])).unwrap();
        assert!(mixer.mix_into(&mut out));
        assert_eq!(out.available(), 160);
    }

    #[test]
    fn no_streams_emits_nothing() {
        let mut out = Chunker::new();
        assert!(!mixer().mix_into(&mut out));
        assert_eq!(out.available(), 0);
    }

    #[test]
    fn saturation_is_applied_once() {
        let mixer = mixer();
        // 0x80 is the µ-law top-segment value, decoding near +32124
        for ssrc in 1..=3 {
            mixer.add_packet(&packet(ssrc, 0, &[0x80; 160])).unwrap();
        }
        let mut out = Chunker::new();
        mixer.mix_into(&mut out);
        let chunk = out.next_chunk(160).unwrap();
        assert!(chunk.iter().all(|&s| s == i16::MAX));
    }

    #[test]
    fn garbage_collect_drops_idle_streams() {
        let mixer = mixer();
        mixer.add_packet(&packet(9, 0, &[0x00; 4])).unwrap();
        assert_eq!(mixer.active_streams(), 1);
        mixer.garbage_collect(Duration::from_secs(0));
        assert_eq!(mixer.active_streams(), 0);
    }
}
