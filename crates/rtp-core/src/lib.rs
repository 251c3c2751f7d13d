//! # RTP packet handling for voxloop
//!
//! Minimal RTP support for the multicast media path: packet
//! encoding/decoding ([`RtpPacket`]), wrap-aware sequence-number ordering,
//! and multicast socket helpers for loop groups.
//!
//! RTCP, header extensions and SRTP are not part of the voxloop media
//! plane and are intentionally absent.

pub mod multicast;
pub mod packet;
pub mod sequence;

pub use multicast::{multicast_receiver, multicast_sender, MulticastGroup, DEFAULT_MULTICAST_PORT};
pub use packet::{RtpError, RtpPacket, RTP_VERSION};
pub use sequence::{extend_sequence, sequence_newer};
