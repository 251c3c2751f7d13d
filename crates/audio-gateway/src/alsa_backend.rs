//! ALSA-backed devices (Linux, feature `device-alsa`).

use alsa::pcm::{Access, Format, HwParams, PCM};
use alsa::{Direction, ValueOr};

use crate::device::{AudioBackend, CaptureDevice, DeviceError, PlaybackDevice};

fn map_alsa_error(e: alsa::Error) -> DeviceError {
    // -EPIPE on a PCM write is the underrun case
    if e.errno() == 32 {
        DeviceError::Underrun
    } else {
        DeviceError::Io(e.to_string())
    }
}

fn open_pcm(
    device: &str,
    direction: Direction,
    sample_rate_hz: u32,
    samples_per_period: usize,
) -> Result<(PCM, usize, usize), DeviceError> {
    let pcm = PCM::new(device, direction, false)
        .map_err(|e| DeviceError::Unavailable(format!("{}: {}", device, e)))?;
    let (period, buffer) = {
        let hwp = HwParams::any(&pcm).map_err(map_alsa_error)?;
        hwp.set_channels(1).map_err(map_alsa_error)?;
        hwp.set_rate(sample_rate_hz, ValueOr::Nearest)
            .map_err(map_alsa_error)?;
        hwp.set_format(Format::s16()).map_err(map_alsa_error)?;
        hwp.set_access(Access::RWInterleaved).map_err(map_alsa_error)?;
        hwp.set_period_size_near(samples_per_period as i64, ValueOr::Nearest)
            .map_err(map_alsa_error)?;
        pcm.hw_params(&hwp).map_err(map_alsa_error)?;
        let period = hwp.get_period_size().map_err(map_alsa_error)? as usize;
        let buffer = hwp.get_buffer_size().map_err(map_alsa_error)? as usize;
        (period, buffer)
    };
    pcm.prepare().map_err(map_alsa_error)?;
    Ok((pcm, period, buffer))
}

pub struct AlsaPlayback {
    pcm: PCM,
    samples_per_period: usize,
    buffer_size: usize,
}

impl PlaybackDevice for AlsaPlayback {
    fn samples_per_period(&self) -> usize {
        self.samples_per_period
    }

    fn buffer_size_samples(&self) -> usize {
        self.buffer_size
    }

    fn writeable_samples(&mut self) -> Result<usize, DeviceError> {
        match self.pcm.avail_update() {
            Ok(avail) if avail >= 0 => Ok(avail as usize),
            Ok(_) => Ok(0),
            Err(e) => Err(map_alsa_error(e)),
        }
    }

    fn write_period(&mut self, pcm: &[i16]) -> Result<(), DeviceError> {
        let io = self.pcm.io_i16().map_err(map_alsa_error)?;
        match io.writei(pcm) {
            Ok(_) => Ok(()),
            Err(e) => Err(map_alsa_error(e)),
        }
    }

    fn reset(&mut self) -> Result<(), DeviceError> {
        self.pcm.prepare().map_err(map_alsa_error)
    }
}

pub struct AlsaCapture {
    pcm: PCM,
    samples_per_period: usize,
}

impl CaptureDevice for AlsaCapture {
    fn samples_per_period(&self) -> usize {
        self.samples_per_period
    }

    fn read_period(&mut self, pcm: &mut [i16]) -> Result<usize, DeviceError> {
        let io = self.pcm.io_i16().map_err(map_alsa_error)?;
        let want = self.samples_per_period.min(pcm.len());
        match io.readi(&mut pcm[..want]) {
            Ok(read) => Ok(read),
            Err(e) => {
                // recover overruns in place, surface everything else
                if self.pcm.try_recover(e, true).is_ok() {
                    Ok(0)
                } else {
                    Err(map_alsa_error(e))
                }
            }
        }
    }
}

/// The ALSA backend.
pub struct AlsaAudioBackend;

impl AudioBackend for AlsaAudioBackend {
    fn open_playback(
        &self,
        device: &str,
        sample_rate_hz: u32,
        samples_per_period: usize,
    ) -> Result<Box<dyn PlaybackDevice>, DeviceError> {
        let (pcm, period, buffer) =
            open_pcm(device, Direction::Playback, sample_rate_hz, samples_per_period)?;
        tracing::info!(device, period, buffer, "ALSA playback opened");
        Ok(Box::new(AlsaPlayback {
            pcm,
            samples_per_period: period,
            buffer_size: buffer,
        }))
    }

    fn open_capture(
        &self,
        device: &str,
        sample_rate_hz: u32,
        samples_per_period: usize,
    ) -> Result<Box<dyn CaptureDevice>, DeviceError> {
        let (pcm, period, _) =
            open_pcm(device, Direction::Capture, sample_rate_hz, samples_per_period)?;
        pcm.start().map_err(map_alsa_error)?;
        tracing::info!(device, period, "ALSA capture opened");
        Ok(Box::new(AlsaCapture {
            pcm,
            samples_per_period: period,
        }))
    }

    fn set_volume(
        &self,
        device: &str,
        element: &str,
        playback: bool,
        volume: f64,
    ) -> Result<(), DeviceError> {
        use alsa::mixer::{Mixer, SelemChannelId, SelemId};

        let mixer = Mixer::new(device, false).map_err(map_alsa_error)?;
        let selem_id = SelemId::new(element, 0);
        let Some(selem) = mixer.find_selem(&selem_id) else {
            return Err(DeviceError::Unavailable(format!(
                "mixer element {} not found on {}",
                element, device
            )));
        };
        let (min, max) = if playback {
            selem.get_playback_volume_range()
        } else {
            selem.get_capture_volume_range()
        };
        let value = min + ((max - min) as f64 * volume.clamp(0.0, 1.0)) as i64;
        let result = if playback {
            selem.set_playback_volume_all(value)
        } else {
            selem.set_capture_volume(SelemChannelId::mono(), value)
        };
        result.map_err(map_alsa_error)
    }
}
