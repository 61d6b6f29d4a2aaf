// Audio - device output and the realtime render callback

pub mod output;

pub use output::{AudioError, AudioOutput, preferred_sample_rate};
