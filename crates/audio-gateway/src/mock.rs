//! Mock audio devices for tests and hardware-free deployments.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::device::{
    AudioBackend, CaptureDevice, DeviceError, PlaybackDevice,
};

/// Shared view into a mock playback device.
#[derive(Default)]
pub struct PlaybackProbe {
    pub written: Mutex<Vec<Vec<i16>>>,
    pub resets: AtomicU64,
    /// Scripted answers for `writeable_samples`; empty means "whole
    /// buffer writeable".
    pub writeable_script: Mutex<VecDeque<usize>>,
    /// Scripted errors for the next writes.
    pub write_errors: Mutex<VecDeque<DeviceError>>,
}

pub struct MockPlayback {
    samples_per_period: usize,
    buffer_size: usize,
    probe: Arc<PlaybackProbe>,
}

impl MockPlayback {
    pub fn new(samples_per_period: usize, periods_in_buffer: usize) -> (Self, Arc<PlaybackProbe>) {
        let probe = Arc::new(PlaybackProbe::default());
        (
            Self {
                samples_per_period,
                buffer_size: samples_per_period * periods_in_buffer,
                probe: probe.clone(),
            },
            probe,
        )
    }
}

impl PlaybackDevice for MockPlayback {
    fn samples_per_period(&self) -> usize {
        self.samples_per_period
    }

    fn buffer_size_samples(&self) -> usize {
        self.buffer_size
    }

    fn writeable_samples(&mut self) -> Result<usize, DeviceError> {
        Ok(self
            .probe
            .writeable_script
            .lock()
            .pop_front()
            .unwrap_or(self.buffer_size - self.samples_per_period))
    }

    fn write_period(&mut self, pcm: &[i16]) -> Result<(), DeviceError> {
        if let Some(error) = self.probe.write_errors.lock().pop_front() {
            return Err(error);
        }
        self.probe.written.lock().push(pcm.to_vec());
        Ok(())
    }

    fn reset(&mut self) -> Result<(), DeviceError> {
        self.probe.resets.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}

/// Capture device producing a repeating sample ramp.
pub struct MockCapture {
    samples_per_period: usize,
    next: i16,
    /// Stop producing after this many periods (then report unavailable).
    periods_left: Option<u64>,
}

impl MockCapture {
    pub fn new(samples_per_period: usize) -> Self {
        Self {
            samples_per_period,
            next: 0,
            periods_left: None,
        }
    }

    pub fn limited(samples_per_period: usize, periods: u64) -> Self {
        Self {
            samples_per_period,
            next: 0,
            periods_left: Some(periods),
        }
    }
}

impl CaptureDevice for MockCapture {
    fn samples_per_period(&self) -> usize {
        self.samples_per_period
    }

    fn read_period(&mut self, pcm: &mut [i16]) -> Result<usize, DeviceError> {
        if let Some(left) = &mut self.periods_left {
            if *left == 0 {
                // emulate a stalled card rather than a hard error
                std::thread::sleep(std::time::Duration::from_millis(5));
                return Ok(0);
            }
            *left -= 1;
        }
        let count = self.samples_per_period.min(pcm.len());
        for slot in pcm.iter_mut().take(count) {
            *slot = self.next;
            self.next = self.next.wrapping_add(1);
        }
        Ok(count)
    }
}

/// Backend handing out mock devices and remembering volume calls.
#[derive(Default)]
pub struct MockBackend {
    pub playbacks: Mutex<Vec<Arc<PlaybackProbe>>>,
    pub volume_calls: Mutex<Vec<(String, String, bool, f64)>>,
}

impl AudioBackend for MockBackend {
    fn open_playback(
        &self,
        _device: &str,
        _sample_rate_hz: u32,
        samples_per_period: usize,
    ) -> Result<Box<dyn PlaybackDevice>, DeviceError> {
        let (playback, probe) = MockPlayback::new(samples_per_period, 8);
        self.playbacks.lock().push(probe);
        Ok(Box::new(playback))
    }

    fn open_capture(
        &self,
        _device: &str,
        _sample_rate_hz: u32,
        samples_per_period: usize,
    ) -> Result<Box<dyn CaptureDevice>, DeviceError> {
        Ok(Box::new(MockCapture::new(samples_per_period)))
    }

    fn set_volume(
        &self,
        device: &str,
        element: &str,
        playback: bool,
        volume: f64,
    ) -> Result<(), DeviceError> {
        self.volume_calls
            .lock()
            .push((device.to_string(), element.to_string(), playback, volume));
        Ok(())
    }
}
