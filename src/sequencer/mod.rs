// Sequencer - the musical clock, scheduling, capture, and grid edits

pub mod capture;
pub mod quantize;
pub mod scheduler;
pub mod timeline;
pub mod transport;

pub use capture::LiveCapture;
pub use quantize::quantize_clip;
pub use scheduler::ClipScheduler;
pub use timeline::{Tempo, TimeSignature};
pub use transport::{Advance, SharedTransportState, Transport, TransportState};
