// Oscillator - Basic waveform generation
// Phase-accumulator oscillator, one per voice

use serde::{Deserialize, Serialize};
use std::f32::consts::TAU;

/// Available waveforms
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WaveformType {
    Sine,
    Square,
    Saw,
    Triangle,
}

/// Simple phase-accumulator oscillator
#[derive(Debug, Clone)]
pub struct Oscillator {
    waveform: WaveformType,
    phase: f32,
    phase_increment: f32,
    sample_rate: f32,
}

impl Oscillator {
    pub fn new(waveform: WaveformType, sample_rate: f32) -> Self {
        Self {
            waveform,
            phase: 0.0,
            phase_increment: 0.0,
            sample_rate,
        }
    }

    pub fn set_frequency(&mut self, frequency: f32) {
        self.phase_increment = frequency / self.sample_rate;
    }

    pub fn set_waveform(&mut self, waveform: WaveformType) {
        self.waveform = waveform;
    }

    pub fn reset_phase(&mut self) {
        self.phase = 0.0;
    }

    /// Generate the next sample in [-1, 1]
    pub fn next_sample(&mut self) -> f32 {
        let value = match self.waveform {
            WaveformType::Sine => (self.phase * TAU).sin(),
            WaveformType::Square => {
                if self.phase < 0.5 {
                    1.0
                } else {
                    -1.0
                }
            }
            WaveformType::Saw => 2.0 * self.phase - 1.0,
            WaveformType::Triangle => {
                if self.phase < 0.5 {
                    4.0 * self.phase - 1.0
                } else {
                    3.0 - 4.0 * self.phase
                }
            }
        };

        self.phase += self.phase_increment;
        if self.phase >= 1.0 {
            self.phase -= 1.0;
        }

        value
    }
}

/// Convert a MIDI note number to its frequency in Hz (A4 = 440 Hz)
pub fn midi_to_frequency(pitch: u8) -> f32 {
    440.0 * 2.0_f32.powf((pitch as f32 - 69.0) / 12.0)
}
