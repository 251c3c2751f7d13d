//! Comfort-noise generation.
//!
//! Media loss is masked with low-amplitude white noise instead of hard
//! silence, which listeners perceive as a dead line.

use rand::Rng;

/// Generate `samples` of white noise bounded by `max_amplitude`.
///
/// `max_amplitude == 0` yields silence.
pub fn comfort_noise(samples: usize, max_amplitude: u16) -> Vec<i16> {
    if max_amplitude == 0 {
        return vec![0; samples];
    }
    let amplitude = max_amplitude.min(i16::MAX as u16) as i16;
    let mut rng = rand::thread_rng();
    (0..samples)
        .map(|_| rng.gen_range(-amplitude..=amplitude))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn respects_amplitude_bound() {
        let noise = comfort_noise(4000, 12);
        assert_eq!(noise.len(), 4000);
        assert!(noise.iter().all(|&s| (-12..=12).contains(&s)));
        // white noise is not all zero
        assert!(noise.iter().any(|&s| s != 0));
    }

    #[test]
    fn zero_amplitude_is_silence() {
        assert!(comfort_noise(100, 0).iter().all(|&s| s == 0));
    }
}
