// Voices - Oscillator + envelope units and the polyphonic voice pool
// Voice stealing prefers releasing voices, then the oldest one

use super::envelope::{AdsrEnvelope, AdsrParams};
use super::oscillator::{Oscillator, WaveformType, midi_to_frequency};

/// One melodic voice: oscillator shaped by an ADSR envelope.
///
/// A voice can carry a scheduled release (`auto_release_in`), counted down
/// in the render loop; this is how attack-release triggers with an explicit
/// duration are honored without a second scheduling pass.
#[derive(Debug, Clone)]
pub struct Voice {
    oscillator: Oscillator,
    envelope: AdsrEnvelope,
    pitch: u8,
    velocity: f32,
    age: u64,
    auto_release_in: Option<u64>,
}

impl Voice {
    pub fn new(waveform: WaveformType, adsr: AdsrParams, sample_rate: f32) -> Self {
        Self {
            oscillator: Oscillator::new(waveform, sample_rate),
            envelope: AdsrEnvelope::new(adsr, sample_rate),
            pitch: 0,
            velocity: 0.0,
            age: 0,
            auto_release_in: None,
        }
    }

    pub fn note_on(&mut self, pitch: u8, velocity: u8, age: u64) {
        self.pitch = pitch;
        self.velocity = velocity as f32 / 127.0;
        self.age = age;
        self.auto_release_in = None;
        self.oscillator.set_frequency(midi_to_frequency(pitch));
        self.oscillator.reset_phase();
        self.envelope.note_on();
    }

    pub fn note_off(&mut self) {
        self.auto_release_in = None;
        self.envelope.note_off();
    }

    pub fn force_stop(&mut self) {
        self.auto_release_in = None;
        self.envelope.reset();
    }

    /// Schedule a release after the given number of rendered samples
    pub fn release_after(&mut self, samples: u64) {
        self.auto_release_in = Some(samples.max(1));
    }

    pub fn is_active(&self) -> bool {
        self.envelope.is_active()
    }

    pub fn is_releasing(&self) -> bool {
        self.envelope.is_releasing()
    }

    pub fn pitch(&self) -> u8 {
        self.pitch
    }

    pub fn age(&self) -> u64 {
        self.age
    }

    pub fn next_sample(&mut self) -> f32 {
        if !self.envelope.is_active() {
            return 0.0;
        }

        if let Some(remaining) = self.auto_release_in {
            if remaining <= 1 {
                self.note_off();
            } else {
                self.auto_release_in = Some(remaining - 1);
            }
        }

        self.oscillator.next_sample() * self.envelope.next_level() * self.velocity
    }
}

/// Polyphonic voice pool with voice stealing.
///
/// Steal priority (best victim first): a voice already in its release
/// phase, then the voice with the lowest age counter.
#[derive(Debug, Clone)]
pub struct VoicePool {
    voices: Vec<Voice>,
    age_counter: u64,
}

impl VoicePool {
    pub fn new(voice_count: usize, waveform: WaveformType, adsr: AdsrParams, sample_rate: f32) -> Self {
        let voices = (0..voice_count.max(1))
            .map(|_| Voice::new(waveform, adsr, sample_rate))
            .collect();
        Self {
            voices,
            age_counter: 0,
        }
    }

    pub fn attack(&mut self, pitch: u8, velocity: u8) -> &mut Voice {
        self.age_counter = self.age_counter.wrapping_add(1);
        let age = self.age_counter;

        let index = match self.voices.iter().position(|v| !v.is_active()) {
            Some(i) => i,
            None => self.find_voice_to_steal(),
        };
        self.voices[index].note_on(pitch, velocity, age);
        &mut self.voices[index]
    }

    fn find_voice_to_steal(&self) -> usize {
        let mut best_index = 0;
        let mut best = (false, u64::MAX);

        for (i, voice) in self.voices.iter().enumerate() {
            let candidate = (voice.is_releasing(), voice.age());
            let better = if candidate.0 != best.0 {
                candidate.0
            } else {
                candidate.1 < best.1
            };
            if better {
                best = candidate;
                best_index = i;
            }
        }

        best_index
    }

    /// Release every sounding instance of the pitch
    pub fn release(&mut self, pitch: u8) {
        for voice in &mut self.voices {
            if voice.is_active() && !voice.is_releasing() && voice.pitch() == pitch {
                voice.note_off();
            }
        }
    }

    pub fn release_all(&mut self) {
        for voice in &mut self.voices {
            if voice.is_active() {
                voice.note_off();
            }
        }
    }

    pub fn force_stop_all(&mut self) {
        for voice in &mut self.voices {
            voice.force_stop();
        }
    }

    pub fn active_count(&self) -> usize {
        self.voices.iter().filter(|v| v.is_active()).count()
    }

    pub fn next_sample(&mut self) -> f32 {
        // Fixed headroom divisor; the master limiter catches the rest
        self.voices
            .iter_mut()
            .map(|v| v.next_sample())
            .sum::<f32>()
            / 4.0
    }
}

/// Monophonic voice: a new attack cuts whatever was sounding
#[derive(Debug, Clone)]
pub struct MonoVoice {
    voice: Voice,
    age_counter: u64,
}

impl MonoVoice {
    pub fn new(waveform: WaveformType, adsr: AdsrParams, sample_rate: f32) -> Self {
        Self {
            voice: Voice::new(waveform, adsr, sample_rate),
            age_counter: 0,
        }
    }

    pub fn attack(&mut self, pitch: u8, velocity: u8) -> &mut Voice {
        self.age_counter = self.age_counter.wrapping_add(1);
        self.voice.note_on(pitch, velocity, self.age_counter);
        &mut self.voice
    }

    /// Release only honours the pitch that is actually sounding
    pub fn release(&mut self, pitch: u8) {
        if self.voice.is_active() && !self.voice.is_releasing() && self.voice.pitch() == pitch {
            self.voice.note_off();
        }
    }

    /// Degrades to a single release call
    pub fn release_all(&mut self) {
        if self.voice.is_active() {
            self.voice.note_off();
        }
    }

    pub fn force_stop(&mut self) {
        self.voice.force_stop();
    }

    pub fn active_count(&self) -> usize {
        if self.voice.is_active() { 1 } else { 0 }
    }

    pub fn next_sample(&mut self) -> f32 {
        self.voice.next_sample()
    }
}
