//! The playback side of one output channel.

use voxloop_media_core::{comfort_noise, Chunker};

use crate::device::{DeviceError, PlayOutcome, PlaybackDevice};

/// Feeds one device from a PCM chunk stream, tied to the hardware clock:
/// each tick writes as many periods as the device reports writeable.
///
/// After an underrun the channel enters a rebuffer state and only resumes
/// once two frames of PCM are available again; the gap is masked with
/// comfort noise by the caller.
pub struct PlaybackChannel {
    device: Box<dyn PlaybackDevice>,
    comfort_noise_amplitude: u16,
    buffer_after_interrupt: bool,
    periods_played: u64,
    comfort_noise_periods: u64,
}

impl PlaybackChannel {
    pub fn new(device: Box<dyn PlaybackDevice>, comfort_noise_amplitude: u16) -> Self {
        Self {
            device,
            comfort_noise_amplitude,
            buffer_after_interrupt: false,
            periods_played: 0,
            comfort_noise_periods: 0,
        }
    }

    pub fn samples_per_period(&self) -> usize {
        self.device.samples_per_period()
    }

    pub fn periods_played(&self) -> u64 {
        self.periods_played
    }

    pub fn comfort_noise_periods(&self) -> u64 {
        self.comfort_noise_periods
    }

    pub fn is_rebuffering(&self) -> bool {
        self.buffer_after_interrupt
    }

    /// One playback tick against the device's writeable window.
    pub fn play(&mut self, pcm: &mut Chunker) -> PlayOutcome {
        let bufsize = self.device.buffer_size_samples();
        let samples_per_period = self.device.samples_per_period();

        let writeable = match self.device.writeable_samples() {
            Ok(writeable) => writeable,
            Err(e) => {
                tracing::warn!(error = %e, "cannot query writeable window");
                return PlayOutcome::Ok;
            }
        };
        let writeable = if writeable > bufsize {
            tracing::error!("device reports more writeable samples than its buffer holds");
            bufsize
        } else {
            writeable
        };
        let remaining_in_device = bufsize - writeable;

        if !self.buffer_after_interrupt && remaining_in_device == 0 {
            tracing::warn!("probable device buffer underflow");
            self.buffer_after_interrupt = true;
            return PlayOutcome::Insufficient;
        }
        if self.buffer_after_interrupt && pcm.available() < 2 * samples_per_period {
            tracing::debug!(
                available = pcm.available(),
                required = 2 * samples_per_period,
                "still rebuffering"
            );
            return PlayOutcome::Insufficient;
        }
        self.buffer_after_interrupt = false;

        let result = self.feed_periods(pcm, writeable / samples_per_period);
        self.buffer_after_interrupt = result == PlayOutcome::Insufficient;
        result
    }

    fn feed_periods(&mut self, pcm: &mut Chunker, max_periods: usize) -> PlayOutcome {
        let samples_per_period = self.device.samples_per_period();
        let mut period = vec![0i16; samples_per_period];
        let mut fed = 0usize;

        while fed < max_periods {
            if !pcm.next_chunk_into(&mut period) {
                break;
            }
            match self.write(&period) {
                PlayOutcome::Ok => fed += 1,
                other => return other,
            }
        }

        if fed == 0 {
            PlayOutcome::Insufficient
        } else {
            self.periods_played += fed as u64;
            PlayOutcome::Ok
        }
    }

    fn write(&mut self, period: &[i16]) -> PlayOutcome {
        match self.device.write_period(period) {
            Ok(()) => PlayOutcome::Ok,
            Err(e) => {
                tracing::error!(error = %e, "could not replay PCM period");
                if let Err(reset) = self.device.reset() {
                    tracing::error!(error = %reset, "device reset failed");
                }
                match e {
                    DeviceError::Underrun => PlayOutcome::Insufficient,
                    _ => PlayOutcome::Failed,
                }
            }
        }
    }

    /// Mask one period with comfort noise.
    pub fn play_comfort_noise(&mut self) -> bool {
        let noise = comfort_noise(
            self.device.samples_per_period(),
            self.comfort_noise_amplitude,
        );
        let played = self.write(&noise) == PlayOutcome::Ok;
        if played {
            self.comfort_noise_periods += 1;
        }
        played
    }

    pub fn reset(&mut self) -> bool {
        self.device.reset().is_ok()
    }
}
