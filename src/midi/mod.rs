// MIDI - hardware input and message parsing

pub mod event;
pub mod input;

pub use event::parse_midi_bytes;
pub use input::{MidiError, MidiInput};
