//! The audio device seam.
//!
//! One playback or capture device is owned by exactly one thread: the
//! playback ticker or the capture reader. The backend opens devices and
//! sets mixer-element volumes; everything else goes through the device
//! traits.

use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum DeviceError {
    /// The hardware ring buffer ran dry.
    #[error("audio hardware buffer underflow")]
    Underrun,
    #[error("audio device unavailable: {0}")]
    Unavailable(String),
    #[error("audio I/O error: {0}")]
    Io(String),
}

/// Outcome of one playback tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayOutcome {
    /// At least one period was written.
    Ok,
    /// Not enough PCM; the caller masks with comfort noise and the
    /// channel pre-buffers before resuming.
    Insufficient,
    /// Device error; the device was reset.
    Failed,
}

pub trait PlaybackDevice: Send {
    fn samples_per_period(&self) -> usize;

    /// Total hardware buffer size in samples.
    fn buffer_size_samples(&self) -> usize;

    /// Samples writeable right now without blocking.
    fn writeable_samples(&mut self) -> Result<usize, DeviceError>;

    /// Write exactly one period.
    fn write_period(&mut self, pcm: &[i16]) -> Result<(), DeviceError>;

    /// Recover the device after an error.
    fn reset(&mut self) -> Result<(), DeviceError>;
}

pub trait CaptureDevice: Send {
    fn samples_per_period(&self) -> usize;

    /// Blocking read of up to one period; returns the samples read.
    fn read_period(&mut self, pcm: &mut [i16]) -> Result<usize, DeviceError>;
}

/// Opens devices and controls mixer-element volumes.
pub trait AudioBackend: Send + Sync {
    fn open_playback(
        &self,
        device: &str,
        sample_rate_hz: u32,
        samples_per_period: usize,
    ) -> Result<Box<dyn PlaybackDevice>, DeviceError>;

    fn open_capture(
        &self,
        device: &str,
        sample_rate_hz: u32,
        samples_per_period: usize,
    ) -> Result<Box<dyn CaptureDevice>, DeviceError>;

    /// Set a mixer element's volume, 0.0..=1.0.
    fn set_volume(
        &self,
        device: &str,
        element: &str,
        playback: bool,
        volume: f64,
    ) -> Result<(), DeviceError>;
}
