// Synthesis - voices, envelopes, presets, and the normalized trigger surface

pub mod adapter;
pub mod envelope;
pub mod oscillator;
pub mod preset;
pub mod voice;

pub use adapter::VoiceAdapter;
pub use envelope::AdsrParams;
pub use oscillator::{Oscillator, WaveformType, midi_to_frequency};
pub use preset::{DEFAULT_PRESET, KitMapping, PresetError, PresetKind, PresetResolver, PresetSpec};
pub use voice::{MonoVoice, Voice, VoicePool};
