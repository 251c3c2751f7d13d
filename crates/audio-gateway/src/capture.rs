//! The capture side of one input channel.
//!
//! A blocking thread reads device periods, chunks them into RTP frame
//! lengths, encodes, and sends to the configured multicast destination.
//! Sequence numbers increase monotonically; the timestamp advances by the
//! samples per frame.

use std::net::UdpSocket;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use voxloop_media_core::{AudioCodec, Chunker};
use voxloop_rtp_core::{MulticastGroup, RtpPacket};

use crate::device::CaptureDevice;

#[derive(Debug, Clone)]
pub struct RtpStreamConfig {
    pub ssrc: u32,
    pub payload_type: u8,
    pub frame_length_ms: u64,
    pub sample_rate_hz: u32,
    pub target: MulticastGroup,
}

impl RtpStreamConfig {
    pub fn samples_per_frame(&self) -> usize {
        (self.frame_length_ms as usize * self.sample_rate_hz as usize) / 1000
    }
}

/// Handle of a running capture thread.
pub struct RecordPipeline {
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
    frames_sent: Arc<AtomicU64>,
}

impl RecordPipeline {
    pub fn frames_sent(&self) -> u64 {
        self.frames_sent.load(Ordering::Relaxed)
    }

    pub fn stop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for RecordPipeline {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Spawn the capture thread. The socket is owned by that thread alone.
pub fn start_capture(
    mut device: Box<dyn CaptureDevice>,
    mut codec: Box<dyn AudioCodec>,
    config: RtpStreamConfig,
    socket: UdpSocket,
) -> RecordPipeline {
    let stop = Arc::new(AtomicBool::new(false));
    let frames_sent = Arc::new(AtomicU64::new(0));

    let stop_flag = stop.clone();
    let counter = frames_sent.clone();
    let handle = std::thread::Builder::new()
        .name(format!("capture-{}", config.target))
        .spawn(move || {
            let samples_per_frame = config.samples_per_frame();
            let destination = config.target.socket_addr();
            let mut chunker = Chunker::new();
            let mut period = vec![0i16; device.samples_per_period().max(samples_per_frame)];
            let mut sequence: u16 = rand::random();
            let mut timestamp: u32 = rand::random();

            while !stop_flag.load(Ordering::Relaxed) {
                let read = match device.read_period(&mut period) {
                    Ok(read) => read,
                    Err(e) => {
                        tracing::error!(error = %e, "capture read failed");
                        std::thread::sleep(Duration::from_millis(config.frame_length_ms));
                        continue;
                    }
                };
                chunker.add(&period[..read]);

                while let Some(frame) = chunker.next_chunk(samples_per_frame) {
                    let payload = match codec.encode(&frame) {
                        Ok(payload) => payload,
                        Err(e) => {
                            tracing::error!(error = %e, "could not encode PCM frame");
                            continue;
                        }
                    };
                    let packet = RtpPacket::new(
                        config.payload_type,
                        sequence,
                        timestamp,
                        config.ssrc,
                        payload,
                    );
                    sequence = sequence.wrapping_add(1);
                    timestamp = timestamp.wrapping_add(samples_per_frame as u32);

                    match socket.send_to(&packet.encode(), destination) {
                        Ok(_) => {
                            counter.fetch_add(1, Ordering::Relaxed);
                        }
                        Err(e) => tracing::error!(error = %e, "could not send RTP frame"),
                    }
                }
            }
        })
        .expect("spawn capture thread");

    RecordPipeline {
        stop,
        handle: Some(handle),
        frames_sent,
    }
}
