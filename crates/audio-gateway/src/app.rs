//! Channel wiring and the mix-and-replay cadence.

use std::net::UdpSocket;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use voxloop_media_core::{create_codec, Chunker, RtpMixer, RtpMixerConfig};
use voxloop_rtp_core::{multicast_receiver, multicast_sender, MulticastGroup, RtpPacket};

use crate::capture::{start_capture, RecordPipeline, RtpStreamConfig};
use crate::config::GatewayConfig;
use crate::device::{AudioBackend, PlayOutcome};
use crate::error::{Error, Result};
use crate::playback::PlaybackChannel;

/// One output channel: multicast loop in, audio device out.
pub struct OutChannel {
    pub index: usize,
    mixer: Arc<RtpMixer>,
    chunker: Chunker,
    playback: PlaybackChannel,
    group: Option<MulticastGroup>,
    receiver: Option<ReceiverThread>,
}

struct ReceiverThread {
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl Drop for ReceiverThread {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl OutChannel {
    /// The mixer fed by this channel's multicast receiver. Exposed so
    /// tests and runtime bindings can enqueue frames directly.
    pub fn mixer(&self) -> &Arc<RtpMixer> {
        &self.mixer
    }

    pub fn playback(&self) -> &PlaybackChannel {
        &self.playback
    }

    pub fn group(&self) -> Option<MulticastGroup> {
        self.group
    }

    pub fn buffered_samples(&self) -> usize {
        self.chunker.available()
    }

    /// Bind this channel to a multicast loop, spawning the receive
    /// thread.
    pub fn bind(&mut self, group: MulticastGroup) -> Result<()> {
        if self.receiver.is_some() {
            return Err(Error::Config(format!(
                "output channel {} already bound",
                self.index
            )));
        }
        let socket = multicast_receiver(group)?;
        socket.set_read_timeout(Some(Duration::from_millis(100)))?;

        let stop = Arc::new(AtomicBool::new(false));
        let stop_flag = stop.clone();
        let mixer = self.mixer.clone();
        let handle = std::thread::Builder::new()
            .name(format!("rtp-recv-{}", group))
            .spawn(move || {
                let mut buf = [0u8; 2048];
                while !stop_flag.load(Ordering::Relaxed) {
                    let len = match socket.recv_from(&mut buf) {
                        Ok((len, _)) => len,
                        Err(e)
                            if e.kind() == std::io::ErrorKind::WouldBlock
                                || e.kind() == std::io::ErrorKind::TimedOut =>
                        {
                            continue
                        }
                        Err(e) => {
                            tracing::error!(error = %e, "multicast receive failed");
                            break;
                        }
                    };
                    match RtpPacket::decode(&buf[..len]) {
                        Ok(packet) => {
                            if let Err(e) = mixer.add_packet(&packet) {
                                tracing::warn!(error = %e, "dropping undecodable frame");
                            }
                        }
                        Err(e) => tracing::debug!(error = %e, "ignoring non-RTP datagram"),
                    }
                }
            })
            .expect("spawn receive thread");

        self.group = Some(group);
        self.receiver = Some(ReceiverThread {
            stop,
            handle: Some(handle),
        });
        tracing::info!(channel = self.index, %group, "static playback bound");
        Ok(())
    }

    /// Replay pending PCM, masking shortage with comfort noise.
    pub fn replay(&mut self) {
        match self.playback.play(&mut self.chunker) {
            PlayOutcome::Ok => {}
            PlayOutcome::Insufficient => {
                self.playback.play_comfort_noise();
            }
            PlayOutcome::Failed => {
                tracing::error!(channel = self.index, "replay failed, resetting device");
                self.playback.reset();
            }
        }
    }

    /// Mix one chunk out of the per-stream buffers.
    pub fn mix(&mut self) {
        self.mixer.mix_into(&mut self.chunker);
    }
}

/// The assembled gateway: output channels with their mixers, capture
/// pipelines, and the steady mix-and-replay tick.
pub struct AudioApp {
    config: GatewayConfig,
    channels: Vec<OutChannel>,
    captures: Vec<RecordPipeline>,
    ticks: u64,
}

impl AudioApp {
    /// Build all configured channels and start the statically bound
    /// pipelines.
    pub fn from_config(config: GatewayConfig, backend: &dyn AudioBackend) -> Result<Self> {
        let mut channels = Vec::new();
        for (index, channel_config) in config.output.iter().enumerate() {
            if let Some(element) = &channel_config.mixer_element {
                backend.set_volume(&channel_config.device, element, true, channel_config.volume)?;
            }
            let device = backend.open_playback(
                &channel_config.device,
                config.sample_rate_hz,
                config.samples_per_frame(),
            )?;
            let mixer = Arc::new(RtpMixer::new(RtpMixerConfig {
                max_frames_per_stream: config.max_frames_per_stream,
                ssrc_to_cancel: Some(config.channel_ssrc(index)),
                frame_length_ms: config.frame_length_ms,
                sample_rate_hz: config.sample_rate_hz,
                codec: config.codec,
            }));
            let mut channel = OutChannel {
                index,
                mixer,
                chunker: Chunker::new(),
                playback: PlaybackChannel::new(device, config.comfort_noise_max_amplitude),
                group: None,
                receiver: None,
            };
            if let Some(group) = channel_config.multicast_group() {
                channel.bind(group)?;
            }
            channels.push(channel);
        }

        let mut captures = Vec::new();
        for (index, channel_config) in config.input.iter().enumerate() {
            let Some(group) = channel_config.multicast_group() else {
                tracing::info!(channel = index, "input channel has no static loop, idle");
                continue;
            };
            if let Some(element) = &channel_config.mixer_element {
                backend.set_volume(&channel_config.device, element, false, channel_config.volume)?;
            }
            let device = backend.open_capture(
                &channel_config.device,
                config.sample_rate_hz,
                config.samples_per_frame(),
            )?;
            let codec = create_codec(config.codec);
            let payload_type = codec.payload_type();
            let pipeline = start_capture(
                device,
                codec,
                RtpStreamConfig {
                    ssrc: config.channel_ssrc(index),
                    payload_type,
                    frame_length_ms: config.frame_length_ms,
                    sample_rate_hz: config.sample_rate_hz,
                    target: group,
                },
                multicast_sender()?,
            );
            tracing::info!(channel = index, %group, "static recording bound");
            captures.push(pipeline);
        }

        Ok(Self {
            config,
            channels,
            captures,
            ticks: 0,
        })
    }

    pub fn channels(&self) -> &[OutChannel] {
        &self.channels
    }

    pub fn channels_mut(&mut self) -> &mut [OutChannel] {
        &mut self.channels
    }

    /// One mix-and-replay cycle: replay buffered PCM first, then mix the
    /// next chunk, collecting idle streams every second.
    pub fn tick(&mut self) {
        for channel in &mut self.channels {
            channel.replay();
        }
        for channel in &mut self.channels {
            channel.mix();
        }
        self.ticks += 1;
        let ticks_per_second = (1000 / self.config.frame_length_ms.max(1)).max(1);
        if self.ticks % ticks_per_second == 0 {
            let max_age = Duration::from_secs(self.config.max_stream_lifetime_secs as u64);
            for channel in &self.channels {
                channel.mixer.garbage_collect(max_age);
            }
        }
    }

    /// Run the tick loop at the configured frame cadence until `stop`.
    pub fn run(&mut self, stop: &AtomicBool) {
        let cadence = Duration::from_millis(self.config.frame_length_ms);
        let mut next = Instant::now() + cadence;
        while !stop.load(Ordering::Relaxed) {
            self.tick();
            let now = Instant::now();
            if next > now {
                std::thread::sleep(next - now);
            }
            next += cadence;
        }
    }

    /// Counters for the status surface.
    pub fn status(&self) -> serde_json::Value {
        serde_json::json!({
            "output": self
                .channels
                .iter()
                .map(|c| {
                    serde_json::json!({
                        "channel": c.index,
                        "loop": c.group.map(|g| g.to_string()),
                        "streams": c.mixer.active_streams(),
                        "periods_played": c.playback.periods_played(),
                        "comfort_noise_periods": c.playback.comfort_noise_periods(),
                        "buffered_samples": c.buffered_samples(),
                    })
                })
                .collect::<Vec<_>>(),
            "input": self
                .captures
                .iter()
                .map(|p| serde_json::json!({ "frames_sent": p.frames_sent() }))
                .collect::<Vec<_>>(),
        })
    }
}
