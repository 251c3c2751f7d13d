//! Mixer behaviour against the platform's media invariants.

use bytes::Bytes;
use voxloop_media_core::{Chunker, RtpMixer, RtpMixerConfig};
use voxloop_rtp_core::RtpPacket;

fn packet(ssrc: u32, sequence: u16, payload: &[u8]) -> RtpPacket {
    RtpPacket::new(
        0,
        sequence,
        sequence as u32 * 160,
        ssrc,
        Bytes::copy_from_slice(payload),
    )
}

fn mix_once(mixer: &RtpMixer) -> Vec<i16> {
    let mut out = Chunker::new();
    mixer.mix_into(&mut out);
    out.next_chunk(mixer.samples_per_frame()).unwrap_or_default()
}

#[test]
fn duplicate_frames_do_not_double_count() {
    let payload = [0x23u8; 160];

    let reference = RtpMixer::new(RtpMixerConfig::default());
    reference.add_packet(&packet(42, 7, &payload)).unwrap();
    let single = mix_once(&reference);

    let mixer = RtpMixer::new(RtpMixerConfig::default());
    assert!(mixer.add_packet(&packet(42, 7, &payload)).unwrap());
    assert!(!mixer.add_packet(&packet(42, 7, &payload)).unwrap());
    let doubled = mix_once(&mixer);

    assert_eq!(single, doubled);
    assert!(single.iter().any(|&s| s != 0));
}

#[test]
fn own_ssrc_is_cancelled() {
    let mixer = RtpMixer::new(RtpMixerConfig {
        ssrc_to_cancel: Some(0x5005),
        ..RtpMixerConfig::default()
    });

    for sequence in 0..5 {
        assert!(!mixer
            .add_packet(&packet(0x5005, sequence, &[0x11; 160]))
            .unwrap());
    }
    assert_eq!(mixer.active_streams(), 0);

    let mut out = Chunker::new();
    assert!(!mixer.mix_into(&mut out));
    assert_eq!(out.available(), 0);
}

#[test]
fn two_streams_sum_linearly() {
    let mixer = RtpMixer::new(RtpMixerConfig::default());

    // one stream per SSRC, each mixing its own decoded value
    mixer.add_packet(&packet(1, 0, &[0xfeu8; 160])).unwrap();
    mixer.add_packet(&packet(2, 0, &[0xfeu8; 160])).unwrap();

    let single = {
        let reference = RtpMixer::new(RtpMixerConfig::default());
        reference.add_packet(&packet(1, 0, &[0xfeu8; 160])).unwrap();
        mix_once(&reference)
    };
    let summed = mix_once(&mixer);

    for (one, two) in single.iter().zip(&summed) {
        assert_eq!(*two as i32, 2 * (*one as i32));
    }
}

#[test]
fn late_stream_joins_mid_mix() {
    let mixer = RtpMixer::new(RtpMixerConfig::default());
    mixer.add_packet(&packet(1, 0, &[0x23; 160])).unwrap();
    let first = mix_once(&mixer);
    assert!(first.iter().any(|&s| s != 0));

    // second SSRC appears later and is mixed from the next tick on
    mixer.add_packet(&packet(2, 100, &[0x23; 160])).unwrap();
    mixer.add_packet(&packet(1, 1, &[0x23; 160])).unwrap();
    let second = mix_once(&mixer);

    for (one, two) in first.iter().zip(&second) {
        assert_eq!(*two as i32, 2 * (*one as i32));
    }
}
