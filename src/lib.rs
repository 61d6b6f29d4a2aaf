// groovecore - Library exports for tests and the standalone binary

pub mod audio;
pub mod engine;
pub mod messaging;
pub mod midi;
pub mod mixer;
pub mod model;
pub mod sampler;
pub mod sequencer;
pub mod synth;

// Re-export commonly used types for convenience
pub use audio::{AudioError, AudioOutput};
pub use engine::Engine;
pub use messaging::{LiveEvent, create_live_channel};
pub use midi::MidiInput;
pub use mixer::{ChannelRack, MasterBus, ScheduledEvent};
pub use model::types::{Clip, Note, NoteSeed, Project, Track, TrackId, TrackType};
pub use sequencer::{
    ClipScheduler, LiveCapture, Tempo, TimeSignature, Transport, TransportState, quantize_clip,
};
pub use synth::preset::{DEFAULT_PRESET, PresetResolver};
