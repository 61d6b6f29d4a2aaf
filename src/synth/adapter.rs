// Voice adapter - Normalized trigger interface over the voice families
// Hides the differences between polyphonic, monophonic, and sample playback

use super::voice::{MonoVoice, VoicePool};
use crate::sampler::SamplerKit;

/// Closed set of voice families behind one four-operation trigger contract:
/// `attack`, `release`, `attack_release`, `release_all`.
///
/// - Poly: independent attack/release per pitch, many simultaneous pitches
/// - Mono: a new attack cuts the previous pitch; `release_all` degrades to
///   a single release
/// - Sampler: one-shot playback keyed by pitch; `release` is a no-op and
///   triggering waits for sample-load completion
#[derive(Debug, Clone)]
pub enum VoiceAdapter {
    Poly(VoicePool),
    Mono(MonoVoice),
    Sampler(SamplerKit),
}

impl VoiceAdapter {
    pub fn attack(&mut self, pitch: u8, velocity: u8) {
        match self {
            VoiceAdapter::Poly(pool) => {
                pool.attack(pitch, velocity);
            }
            VoiceAdapter::Mono(voice) => {
                voice.attack(pitch, velocity);
            }
            VoiceAdapter::Sampler(kit) => kit.attack(pitch, velocity),
        }
    }

    pub fn release(&mut self, pitch: u8) {
        match self {
            VoiceAdapter::Poly(pool) => pool.release(pitch),
            VoiceAdapter::Mono(voice) => voice.release(pitch),
            VoiceAdapter::Sampler(kit) => kit.release(pitch),
        }
    }

    /// Trigger with an explicit duration; the voice releases itself after
    /// `duration_samples` rendered samples. Sample shots ignore the
    /// duration and simply play through.
    pub fn attack_release(&mut self, pitch: u8, velocity: u8, duration_samples: u64) {
        match self {
            VoiceAdapter::Poly(pool) => {
                pool.attack(pitch, velocity).release_after(duration_samples);
            }
            VoiceAdapter::Mono(voice) => {
                voice.attack(pitch, velocity).release_after(duration_samples);
            }
            VoiceAdapter::Sampler(kit) => kit.attack(pitch, velocity),
        }
    }

    pub fn release_all(&mut self) {
        match self {
            VoiceAdapter::Poly(pool) => pool.release_all(),
            VoiceAdapter::Mono(voice) => voice.release_all(),
            VoiceAdapter::Sampler(kit) => kit.release_all(),
        }
    }

    /// Number of currently sounding voices
    pub fn active_count(&self) -> usize {
        match self {
            VoiceAdapter::Poly(pool) => pool.active_count(),
            VoiceAdapter::Mono(voice) => voice.active_count(),
            VoiceAdapter::Sampler(kit) => kit.active_count(),
        }
    }

    /// Whether the adapter can trigger at all (sample kits wait for load)
    pub fn is_ready(&self) -> bool {
        match self {
            VoiceAdapter::Sampler(kit) => kit.is_ready(),
            _ => true,
        }
    }

    pub fn next_sample(&mut self) -> f32 {
        match self {
            VoiceAdapter::Poly(pool) => pool.next_sample(),
            VoiceAdapter::Mono(voice) => voice.next_sample(),
            VoiceAdapter::Sampler(kit) => kit.next_sample(),
        }
    }
}
