//! G.711 µ-law and A-law companding.
//!
//! Encoding is segment arithmetic; decoding goes through 256-entry lookup
//! tables built once at first use.

use bytes::Bytes;
use once_cell::sync::Lazy;

use super::AudioCodec;
use crate::error::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum G711Variant {
    /// µ-law (PCMU, payload type 0)
    Pcmu,
    /// A-law (PCMA, payload type 8)
    Pcma,
}

#[derive(Debug, Clone)]
pub struct G711Codec {
    variant: G711Variant,
}

impl G711Codec {
    pub fn new(variant: G711Variant) -> Self {
        Self { variant }
    }

    pub fn variant(&self) -> G711Variant {
        self.variant
    }

    /// G.711 always runs at 8 kHz mono.
    pub fn sample_rate(&self) -> u32 {
        8000
    }
}

impl AudioCodec for G711Codec {
    fn name(&self) -> &'static str {
        match self.variant {
            G711Variant::Pcmu => "PCMU",
            G711Variant::Pcma => "PCMA",
        }
    }

    fn payload_type(&self) -> u8 {
        match self.variant {
            G711Variant::Pcmu => 0,
            G711Variant::Pcma => 8,
        }
    }

    fn encode(&mut self, pcm: &[i16]) -> Result<Bytes> {
        let encode = match self.variant {
            G711Variant::Pcmu => encode_ulaw,
            G711Variant::Pcma => encode_alaw,
        };
        Ok(pcm.iter().map(|&s| encode(s)).collect::<Vec<u8>>().into())
    }

    fn decode(&mut self, payload: &[u8]) -> Result<Vec<i16>> {
        let table: &[i16; 256] = match self.variant {
            G711Variant::Pcmu => &ULAW_DECODE,
            G711Variant::Pcma => &ALAW_DECODE,
        };
        Ok(payload.iter().map(|&b| table[b as usize]).collect())
    }
}

const ULAW_BIAS: i32 = 0x84;
const ULAW_CLIP: i32 = 8159;

static ULAW_DECODE: Lazy<[i16; 256]> = Lazy::new(|| {
    let mut table = [0i16; 256];
    for (i, entry) in table.iter_mut().enumerate() {
        *entry = decode_ulaw(i as u8);
    }
    table
});

static ALAW_DECODE: Lazy<[i16; 256]> = Lazy::new(|| {
    let mut table = [0i16; 256];
    for (i, entry) in table.iter_mut().enumerate() {
        *entry = decode_alaw(i as u8);
    }
    table
});

fn encode_ulaw(sample: i16) -> u8 {
    // 16-bit linear to 14-bit magnitude
    let mut pcm = (sample as i32) >> 2;
    let mask = if pcm < 0 {
        pcm = -pcm;
        0x7f
    } else {
        0xff
    };
    if pcm > ULAW_CLIP {
        pcm = ULAW_CLIP;
    }
    pcm += ULAW_BIAS >> 2;

    let segment = segment_of(pcm, 0x3f);
    if segment >= 8 {
        return 0x7f ^ mask;
    }
    let value = ((segment as i32) << 4) | ((pcm >> (segment + 1)) & 0x0f);
    (value as u8) ^ mask
}

fn decode_ulaw(byte: u8) -> i16 {
    let value = !byte;
    let mut magnitude = (((value & 0x0f) as i32) << 3) + ULAW_BIAS;
    magnitude <<= (value >> 4) & 0x07;
    let sample = if value & 0x80 != 0 {
        ULAW_BIAS - magnitude
    } else {
        magnitude - ULAW_BIAS
    };
    sample as i16
}

fn encode_alaw(sample: i16) -> u8 {
    // 16-bit linear to 13-bit magnitude
    let mut pcm = (sample as i32) >> 3;
    let mask = if pcm >= 0 {
        0xd5
    } else {
        pcm = -pcm - 1;
        0x55
    };

    let segment = segment_of(pcm, 0x1f);
    if segment >= 8 {
        return 0x7f ^ mask;
    }
    let shift = if segment < 2 { 1 } else { segment };
    let value = ((segment as i32) << 4) | ((pcm >> shift) & 0x0f);
    (value as u8) ^ mask
}

fn decode_alaw(byte: u8) -> i16 {
    let value = byte ^ 0x55;
    let mut magnitude = ((value & 0x0f) as i32) << 4;
    let segment = (value >> 4) & 0x07;
    match segment {
        0 => magnitude += 8,
        1 => magnitude += 0x108,
        _ => {
            magnitude += 0x108;
            magnitude <<= segment - 1;
        }
    }
    let sample = if value & 0x80 != 0 { magnitude } else { -magnitude };
    sample as i16
}

/// Segment index of `pcm` against the segment table starting at
/// `first_end` (0x3f for µ-law, 0x1f for A-law).
fn segment_of(pcm: i32, first_end: i32) -> u32 {
    let mut end = first_end;
    for segment in 0..8 {
        if pcm <= end {
            return segment;
        }
        end = (end << 1) | 1;
    }
    8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_anchor_values() {
        assert_eq!(encode_ulaw(0), 0xff);
        assert_eq!(encode_alaw(0), 0xd5);
        assert_eq!(decode_ulaw(0xff), 0);
        // full-scale inputs land in the top segment
        assert_eq!(encode_ulaw(i16::MAX), 0x80);
        assert_eq!(encode_ulaw(i16::MIN), 0x00);
    }

    #[test]
    fn ulaw_round_trip_tolerance() {
        for &sample in &[-24_000i16, -1200, -7, 0, 5, 96, 1200, 24_000, 32_000] {
            let decoded = decode_ulaw(encode_ulaw(sample));
            let err = (decoded as i32 - sample as i32).abs();
            // quantization error grows with the segment, stays below 1/16th
            assert!(
                err <= (sample as i32).abs() / 16 + 36,
                "sample {} decoded to {}",
                sample,
                decoded
            );
        }
    }

    #[test]
    fn alaw_round_trip_tolerance() {
        for &sample in &[-24_000i16, -1200, -16, 0, 16, 1200, 24_000, 32_000] {
            let decoded = decode_alaw(encode_alaw(sample));
            let err = (decoded as i32 - sample as i32).abs();
            assert!(
                err <= (sample as i32).abs() / 16 + 40,
                "sample {} decoded to {}",
                sample,
                decoded
            );
        }
    }

    #[test]
    fn codec_encode_decode_preserves_length() {
        let mut codec = G711Codec::new(G711Variant::Pcmu);
        let pcm: Vec<i16> = (0..160).map(|i| (i * 100) as i16).collect();
        let encoded = codec.encode(&pcm).unwrap();
        assert_eq!(encoded.len(), 160);
        let decoded = codec.decode(&encoded).unwrap();
        assert_eq!(decoded.len(), 160);
    }

    #[test]
    fn decode_is_sign_symmetric() {
        let mut codec = G711Codec::new(G711Variant::Pcma);
        let plus = codec.decode(&[encode_alaw(10_000)]).unwrap()[0];
        let minus = codec.decode(&[encode_alaw(-10_000)]).unwrap()[0];
        assert!((plus as i32 + minus as i32).abs() <= 16);
    }
}
