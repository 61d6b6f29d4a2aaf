// Transport - Playback control and state management
// Controls play/pause/stop/record state and the playhead position

use super::timeline::{Tempo, TimeSignature};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

/// Transport state (play/stop/record)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransportState {
    #[default]
    Stopped,
    Playing,
    Recording,
    Paused,
}

impl TransportState {
    /// Check if transport is in a playing state (Playing or Recording)
    pub fn is_playing(&self) -> bool {
        matches!(self, TransportState::Playing | TransportState::Recording)
    }

    /// Check if transport is recording
    pub fn is_recording(&self) -> bool {
        matches!(self, TransportState::Recording)
    }

    /// Check if transport is stopped or paused
    pub fn is_stopped(&self) -> bool {
        matches!(self, TransportState::Stopped | TransportState::Paused)
    }
}

/// Result of advancing the playhead by one audio buffer.
///
/// The callback must fire scheduled events for `first` and, when the loop
/// wrapped inside the buffer, for `second` as well. Evaluating the wrap
/// here, at clock granularity, means short loop regions cannot be skipped
/// no matter how irregular the UI frame rate is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Advance {
    /// Sample range [start, end) processed before any wrap
    pub first: (u64, u64),
    /// Sample range [loop_start, pos) processed after the wrap, if one occurred
    pub second: Option<(u64, u64)>,
}

impl Advance {
    pub fn wrapped(&self) -> bool {
        self.second.is_some()
    }
}

/// Shared transport state
/// Thread-safe via atomics for communication with the audio thread.
/// The sample counter is the canonical playback position; every beat
/// readout is derived from it, never incremented independently.
#[derive(Debug)]
pub struct SharedTransportState {
    playing: AtomicBool,
    recording: AtomicBool,
    paused: AtomicBool,
    position_samples: AtomicU64,
    loop_enabled: AtomicBool,
    loop_start_samples: AtomicU64,
    loop_end_samples: AtomicU64,
}

impl SharedTransportState {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Get current transport state
    pub fn state(&self) -> TransportState {
        if self.recording.load(Ordering::Relaxed) {
            TransportState::Recording
        } else if self.playing.load(Ordering::Relaxed) {
            TransportState::Playing
        } else if self.paused.load(Ordering::Relaxed) {
            TransportState::Paused
        } else {
            TransportState::Stopped
        }
    }

    pub fn position_samples(&self) -> u64 {
        self.position_samples.load(Ordering::Relaxed)
    }

    pub fn set_position_samples(&self, samples: u64) {
        self.position_samples.store(samples, Ordering::Relaxed);
    }

    /// Advance the playhead by `delta_samples`, evaluating the loop wrap in
    /// the sample domain. Only the audio callback calls this.
    pub fn advance(&self, delta_samples: u64) -> Advance {
        let current = self.position_samples.load(Ordering::Relaxed);
        let target = current + delta_samples;

        if self.loop_enabled.load(Ordering::Relaxed) {
            let loop_start = self.loop_start_samples.load(Ordering::Relaxed);
            let loop_end = self.loop_end_samples.load(Ordering::Relaxed);

            if loop_end > loop_start && target >= loop_end {
                let loop_length = loop_end - loop_start;
                let overflow = (target - loop_end) % loop_length;
                let new_pos = loop_start + overflow;
                self.position_samples.store(new_pos, Ordering::Relaxed);
                // A seek can land at or past loop_end; the pre-wrap range is
                // then empty and only the wrapped range fires
                return Advance {
                    first: (current, loop_end.max(current)),
                    second: Some((loop_start, new_pos)),
                };
            }
        }

        self.position_samples.store(target, Ordering::Relaxed);
        Advance {
            first: (current, target),
            second: None,
        }
    }

    pub fn is_loop_enabled(&self) -> bool {
        self.loop_enabled.load(Ordering::Relaxed)
    }

    /// Get loop region (start, end) in samples
    pub fn loop_region(&self) -> (u64, u64) {
        (
            self.loop_start_samples.load(Ordering::Relaxed),
            self.loop_end_samples.load(Ordering::Relaxed),
        )
    }

    pub fn set_loop_region(&self, start_samples: u64, end_samples: u64) {
        self.loop_start_samples
            .store(start_samples, Ordering::Relaxed);
        self.loop_end_samples.store(end_samples, Ordering::Relaxed);
    }

    pub fn set_loop_enabled(&self, enabled: bool) {
        self.loop_enabled.store(enabled, Ordering::Relaxed);
    }
}

impl Default for SharedTransportState {
    fn default() -> Self {
        Self {
            playing: AtomicBool::new(false),
            recording: AtomicBool::new(false),
            paused: AtomicBool::new(false),
            position_samples: AtomicU64::new(0),
            loop_enabled: AtomicBool::new(false),
            loop_start_samples: AtomicU64::new(0),
            loop_end_samples: AtomicU64::new(0),
        }
    }
}

/// Transport controller
///
/// Owns the musical time context (tempo, time signature) and the shared
/// sample-domain playhead. Beat positions handed to the outside world are
/// always derived from the sampled clock position. Tempo changes re-map
/// beats to seconds immediately; events already scheduled in the sample
/// domain keep their wall-clock times until the next schedule pass.
pub struct Transport {
    shared_state: Arc<SharedTransportState>,
    tempo: Tempo,
    time_signature: TimeSignature,
    sample_rate: f64,
}

impl Transport {
    pub fn new(sample_rate: f64) -> Self {
        Self {
            shared_state: SharedTransportState::new(),
            tempo: Tempo::default(),
            time_signature: TimeSignature::default(),
            sample_rate,
        }
    }

    /// Get shared state (for passing to the audio thread)
    pub fn shared_state(&self) -> Arc<SharedTransportState> {
        Arc::clone(&self.shared_state)
    }

    pub fn state(&self) -> TransportState {
        self.shared_state.state()
    }

    pub fn is_playing(&self) -> bool {
        self.state().is_playing()
    }

    pub fn is_recording(&self) -> bool {
        self.state().is_recording()
    }

    /// Current playhead position in beats, derived from the sample clock
    pub fn current_beat(&self) -> f64 {
        self.tempo
            .samples_to_beats(self.shared_state.position_samples(), self.sample_rate)
    }

    /// Current playhead position in samples
    pub fn position_samples(&self) -> u64 {
        self.shared_state.position_samples()
    }

    /// Seek to an absolute beat position
    pub fn seek(&mut self, beat: f64) {
        let samples = self.tempo.beats_to_samples(beat.max(0.0), self.sample_rate);
        self.shared_state.set_position_samples(samples);
    }

    pub fn play(&mut self) {
        self.set_flags(true, false, false);
    }

    /// Stop playback and reset the playhead to 0
    pub fn stop(&mut self) {
        self.set_flags(false, false, false);
        self.shared_state.set_position_samples(0);
    }

    /// Pause, keeping the current position for resume
    pub fn pause(&mut self) {
        self.set_flags(false, false, true);
    }

    /// Enter recording (playing + recording flags)
    pub fn record(&mut self) {
        self.set_flags(true, true, false);
    }

    /// Leave recording but keep playing
    pub fn end_record(&mut self) {
        self.set_flags(true, false, false);
    }

    pub fn toggle_play(&mut self) {
        if self.is_playing() {
            self.pause();
        } else {
            self.play();
        }
    }

    fn set_flags(&self, playing: bool, recording: bool, paused: bool) {
        self.shared_state.playing.store(playing, Ordering::Relaxed);
        self.shared_state
            .recording
            .store(recording, Ordering::Relaxed);
        self.shared_state.paused.store(paused, Ordering::Relaxed);
    }

    pub fn tempo(&self) -> &Tempo {
        &self.tempo
    }

    /// Change the tempo. Takes effect immediately for the beat <-> time
    /// mapping; the playhead keeps its sample position.
    pub fn set_tempo(&mut self, bpm: f64) {
        self.tempo.set_bpm(bpm);
    }

    pub fn time_signature(&self) -> &TimeSignature {
        &self.time_signature
    }

    pub fn set_time_signature(&mut self, time_signature: TimeSignature) {
        self.time_signature = time_signature;
    }

    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    /// Set the loop region in beats and enable/disable looping.
    /// A region with end <= start disables looping.
    pub fn set_loop(&mut self, start_beat: f64, end_beat: f64, enabled: bool) {
        if end_beat <= start_beat {
            self.shared_state.set_loop_enabled(false);
            return;
        }
        let start = self.tempo.beats_to_samples(start_beat, self.sample_rate);
        let end = self.tempo.beats_to_samples(end_beat, self.sample_rate);
        self.shared_state.set_loop_region(start, end);
        self.shared_state.set_loop_enabled(enabled);
    }

    pub fn is_loop_enabled(&self) -> bool {
        self.shared_state.is_loop_enabled()
    }

    /// Loop region as (start_beat, end_beat)
    pub fn loop_region_beats(&self) -> (f64, f64) {
        let (start, end) = self.shared_state.loop_region();
        (
            self.tempo.samples_to_beats(start, self.sample_rate),
            self.tempo.samples_to_beats(end, self.sample_rate),
        )
    }
}
