//! Per-SSRC reorder buffer of decoded PCM frames.

use std::collections::BTreeMap;
use std::time::Instant;

use voxloop_rtp_core::extend_sequence;

use crate::codec::AudioCodec;
use crate::error::Result;

/// Bounded reorder buffer for one RTP stream.
///
/// Frames are decoded on insert and keyed by the extended sequence
/// number. Inserts are idempotent by sequence; frames older than the
/// current mix position are discarded, and the buffer never holds more
/// than its configured capacity (oldest frames fall out first).
pub struct StreamBuffer {
    ssrc: u32,
    codec: Box<dyn AudioCodec>,
    frames: BTreeMap<u64, Vec<i16>>,
    last_extended: Option<u64>,
    /// Extended sequence number the next mix tick will play.
    position: Option<u64>,
    capacity: usize,
    last_seen: Instant,
}

impl StreamBuffer {
    pub fn new(ssrc: u32, codec: Box<dyn AudioCodec>, capacity: usize) -> Self {
        Self {
            ssrc,
            codec,
            frames: BTreeMap::new(),
            last_extended: None,
            position: None,
            capacity: capacity.max(1),
            last_seen: Instant::now(),
        }
    }

    pub fn ssrc(&self) -> u32 {
        self.ssrc
    }

    pub fn last_seen(&self) -> Instant {
        self.last_seen
    }

    pub fn buffered_frames(&self) -> usize {
        self.frames.len()
    }

    /// Insert one RTP payload. Returns `true` if the frame was kept,
    /// `false` if it was a duplicate or behind the mix position.
    pub fn insert(&mut self, sequence: u16, payload: &[u8]) -> Result<bool> {
        self.last_seen = Instant::now();

        let extended = match self.last_extended {
            Some(last) => extend_sequence(sequence, last),
            None => sequence as u64,
        };
        if self
            .last_extended
            .map(|last| extended > last)
            .unwrap_or(true)
        {
            self.last_extended = Some(extended);
        }

        if let Some(position) = self.position {
            if extended < position {
                tracing::trace!(
                    ssrc = self.ssrc,
                    sequence,
                    "dropping frame behind mix position"
                );
                return Ok(false);
            }
        }
        if self.frames.contains_key(&extended) {
            return Ok(false);
        }

        let pcm = self.codec.decode(payload)?;
        self.frames.insert(extended, pcm);

        while self.frames.len() > self.capacity {
            self.frames.pop_first();
        }
        Ok(true)
    }

    /// Hand out the frame at the mix position, or a concealment frame of
    /// `samples` if it is missing. Advances the position either way.
    pub fn pop_next(&mut self, samples: usize) -> Vec<i16> {
        let position = match self.position {
            Some(p) => p,
            None => match self.frames.keys().next() {
                Some(&first) => {
                    self.position = Some(first);
                    first
                }
                None => return self.codec.conceal(samples),
            },
        };

        self.position = Some(position + 1);
        match self.frames.remove(&position) {
            Some(mut pcm) => {
                pcm.resize(samples, 0);
                pcm
            }
            None => self.codec.conceal(samples),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{create_codec, CodecConfig};

    fn buffer(capacity: usize) -> StreamBuffer {
        StreamBuffer::new(7, create_codec(CodecConfig::default()), capacity)
    }

    /// µ-law payload decoding to non-zero PCM.
    fn payload(len: usize) -> Vec<u8> {
        vec![0x00; len]
    }

    #[test]
    fn duplicate_sequence_is_idempotent() {
        let mut buf = buffer(10);
        assert!(buf.insert(5, &payload(4)).unwrap());
        assert!(!buf.insert(5, &payload(4)).unwrap());
        assert_eq!(buf.buffered_frames(), 1);
    }

    #[test]
    fn frames_behind_mix_position_are_discarded() {
        let mut buf = buffer(10);
        buf.insert(5, &payload(4)).unwrap();
        let first = buf.pop_next(4);
        assert!(first.iter().any(|&s| s != 0));

        // position advanced past 5
        assert!(!buf.insert(5, &payload(4)).unwrap());
        assert!(!buf.insert(4, &payload(4)).unwrap());
        assert!(buf.insert(6, &payload(4)).unwrap());
    }

    #[test]
    fn missing_frames_are_concealed() {
        let mut buf = buffer(10);
        buf.insert(10, &payload(4)).unwrap();
        buf.insert(12, &payload(4)).unwrap();

        assert!(buf.pop_next(4).iter().any(|&s| s != 0)); // frame 10
        assert_eq!(buf.pop_next(4), vec![0; 4]); // frame 11 missing
        assert!(buf.pop_next(4).iter().any(|&s| s != 0)); // frame 12
    }

    #[test]
    fn capacity_is_bounded() {
        let mut buf = buffer(3);
        for seq in 0..8u16 {
            buf.insert(seq, &payload(4)).unwrap();
        }
        assert_eq!(buf.buffered_frames(), 3);
    }

    #[test]
    fn reordered_insert_plays_in_sequence_order() {
        let mut buf = buffer(10);
        buf.insert(21, &[0x00; 2]).unwrap();
        buf.insert(20, &[0xff; 2]).unwrap();

        // 0xff decodes to 0 in µ-law, 0x00 to a large negative value
        assert_eq!(buf.pop_next(2), vec![0; 2]);
        assert!(buf.pop_next(2)[0] != 0);
    }
}
