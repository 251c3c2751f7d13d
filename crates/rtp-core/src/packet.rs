//! RTP packet encoding and decoding (RFC 3550 fixed header).

use bytes::{BufMut, Bytes, BytesMut};
use thiserror::Error;

/// The only RTP version on the wire.
pub const RTP_VERSION: u8 = 2;

/// Fixed header length without CSRC entries.
const MIN_HEADER_LEN: usize = 12;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RtpError {
    #[error("packet too short: {0} octets")]
    PacketTooShort(usize),
    #[error("unsupported RTP version {0}")]
    UnsupportedVersion(u8),
    #[error("padding length {padding} exceeds payload of {available} octets")]
    InvalidPadding { padding: usize, available: usize },
}

/// One RTP packet.
///
/// Header extensions are skipped on decode and never produced on encode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RtpPacket {
    pub payload_type: u8,
    pub marker: bool,
    pub sequence_number: u16,
    pub timestamp: u32,
    pub ssrc: u32,
    pub csrc: Vec<u32>,
    pub payload: Bytes,
}

impl RtpPacket {
    pub fn new(payload_type: u8, sequence_number: u16, timestamp: u32, ssrc: u32, payload: Bytes) -> Self {
        Self {
            payload_type,
            marker: false,
            sequence_number,
            timestamp,
            ssrc,
            csrc: Vec::new(),
            payload,
        }
    }

    /// Decode a packet from wire octets.
    pub fn decode(data: &[u8]) -> Result<Self, RtpError> {
        if data.len() < MIN_HEADER_LEN {
            return Err(RtpError::PacketTooShort(data.len()));
        }

        let version = data[0] >> 6;
        if version != RTP_VERSION {
            return Err(RtpError::UnsupportedVersion(version));
        }
        let has_padding = data[0] & 0x20 != 0;
        let has_extension = data[0] & 0x10 != 0;
        let csrc_count = (data[0] & 0x0f) as usize;

        let marker = data[1] & 0x80 != 0;
        let payload_type = data[1] & 0x7f;
        let sequence_number = u16::from_be_bytes([data[2], data[3]]);
        let timestamp = u32::from_be_bytes([data[4], data[5], data[6], data[7]]);
        let ssrc = u32::from_be_bytes([data[8], data[9], data[10], data[11]]);

        let mut offset = MIN_HEADER_LEN + 4 * csrc_count;
        if data.len() < offset {
            return Err(RtpError::PacketTooShort(data.len()));
        }
        let csrc = (0..csrc_count)
            .map(|i| {
                let at = MIN_HEADER_LEN + 4 * i;
                u32::from_be_bytes([data[at], data[at + 1], data[at + 2], data[at + 3]])
            })
            .collect();

        if has_extension {
            if data.len() < offset + 4 {
                return Err(RtpError::PacketTooShort(data.len()));
            }
            let words = u16::from_be_bytes([data[offset + 2], data[offset + 3]]) as usize;
            offset += 4 + 4 * words;
            if data.len() < offset {
                return Err(RtpError::PacketTooShort(data.len()));
            }
        }

        let mut end = data.len();
        if has_padding {
            let padding = data[end - 1] as usize;
            if padding == 0 || padding > end - offset {
                return Err(RtpError::InvalidPadding {
                    padding,
                    available: end - offset,
                });
            }
            end -= padding;
        }

        Ok(Self {
            payload_type,
            marker,
            sequence_number,
            timestamp,
            ssrc,
            csrc,
            payload: Bytes::copy_from_slice(&data[offset..end]),
        })
    }

    /// Encode into wire octets.
    pub fn encode(&self) -> Bytes {
        let csrc_count = self.csrc.len().min(15);
        let mut out = BytesMut::with_capacity(MIN_HEADER_LEN + 4 * csrc_count + self.payload.len());

        out.put_u8((RTP_VERSION << 6) | csrc_count as u8);
        out.put_u8((if self.marker { 0x80 } else { 0 }) | (self.payload_type & 0x7f));
        out.put_u16(self.sequence_number);
        out.put_u32(self.timestamp);
        out.put_u32(self.ssrc);
        for csrc in self.csrc.iter().take(csrc_count) {
            out.put_u32(*csrc);
        }
        out.put_slice(&self.payload);
        out.freeze()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_decode_round_trip() {
        let packet = RtpPacket {
            payload_type: 100,
            marker: true,
            sequence_number: 4711,
            timestamp: 160_000,
            ssrc: 0xdead_beef,
            csrc: vec![1, 2],
            payload: Bytes::from_static(&[0x11, 0x22, 0x33]),
        };
        let decoded = RtpPacket::decode(&packet.encode()).unwrap();
        assert_eq!(decoded, packet);
    }

    #[test]
    fn rejects_short_and_wrong_version() {
        assert_eq!(RtpPacket::decode(&[0u8; 4]), Err(RtpError::PacketTooShort(4)));

        let mut data = [0u8; 12];
        data[0] = 0x40; // version 1
        assert_eq!(RtpPacket::decode(&data), Err(RtpError::UnsupportedVersion(1)));
    }

    #[test]
    fn skips_header_extension() {
        let packet = RtpPacket::new(0, 1, 2, 3, Bytes::from_static(b"pcm"));
        let mut wire = BytesMut::from(&packet.encode()[..]);
        // splice a one-word extension behind the fixed header
        let mut with_ext = BytesMut::new();
        with_ext.extend_from_slice(&wire.split_to(MIN_HEADER_LEN));
        with_ext[0] |= 0x10;
        with_ext.extend_from_slice(&[0xbe, 0xde, 0x00, 0x01, 0xaa, 0xbb, 0xcc, 0xdd]);
        with_ext.extend_from_slice(&wire);

        let decoded = RtpPacket::decode(&with_ext).unwrap();
        assert_eq!(decoded.payload, Bytes::from_static(b"pcm"));
    }

    #[test]
    fn strips_padding() {
        let packet = RtpPacket::new(0, 1, 2, 3, Bytes::from_static(b"abcd"));
        let mut wire = BytesMut::from(&packet.encode()[..]);
        wire[0] |= 0x20;
        wire.extend_from_slice(&[0x00, 0x00, 0x03]);

        let decoded = RtpPacket::decode(&wire).unwrap();
        assert_eq!(decoded.payload, Bytes::from_static(b"abcd"));
    }
}
