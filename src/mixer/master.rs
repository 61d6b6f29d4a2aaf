// Master bus - Shared output stage: gain followed by a soft limiter
// All channels feed this bus; no per-channel hardware routing exists

use super::params::AtomicF32;

/// Flush denormal values to zero. Tiny residual envelope tails can
/// otherwise stall some CPUs inside the audio callback.
#[inline]
pub fn flush_denormals_to_zero(x: f32) -> f32 {
    if x.abs() < 1e-15 { 0.0 } else { x }
}

/// Soft limiter: tanh compresses toward [-1, 1] without hard edges
#[inline]
pub fn soft_clip(x: f32) -> f32 {
    x.tanh()
}

/// The single shared output bus
#[derive(Debug, Clone)]
pub struct MasterBus {
    gain: AtomicF32,
}

impl MasterBus {
    pub fn new() -> Self {
        Self {
            gain: AtomicF32::new(0.8),
        }
    }

    pub fn set_gain(&self, gain: f32) {
        self.gain.set(gain.clamp(0.0, 1.0));
    }

    pub fn gain(&self) -> f32 {
        self.gain.get()
    }

    /// Apply gain and the limiter to one stereo frame
    #[inline]
    pub fn process(&self, left: f32, right: f32) -> (f32, f32) {
        let gain = self.gain.get();
        (
            soft_clip(flush_denormals_to_zero(left * gain)),
            soft_clip(flush_denormals_to_zero(right * gain)),
        )
    }
}

impl Default for MasterBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_limiter_bounds_output() {
        let master = MasterBus::new();
        master.set_gain(1.0);
        let (l, r) = master.process(10.0, -10.0);
        assert!(l <= 1.0 && l > 0.9);
        assert!(r >= -1.0 && r < -0.9);
    }

    #[test]
    fn test_gain_clamped() {
        let master = MasterBus::new();
        master.set_gain(3.0);
        assert_eq!(master.gain(), 1.0);
        master.set_gain(-1.0);
        assert_eq!(master.gain(), 0.0);
    }

    #[test]
    fn test_denormals_flushed() {
        assert_eq!(flush_denormals_to_zero(1e-20), 0.0);
        assert_eq!(flush_denormals_to_zero(0.5), 0.5);
    }
}
