// ADSR envelope - Per-voice amplitude shaping
// Linear segments; good enough for trigger-accurate gating

use serde::{Deserialize, Serialize};

/// ADSR parameters, times in seconds, sustain as a level in [0, 1]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AdsrParams {
    pub attack: f32,
    pub decay: f32,
    pub sustain: f32,
    pub release: f32,
}

impl AdsrParams {
    pub fn new(attack: f32, decay: f32, sustain: f32, release: f32) -> Self {
        Self {
            attack: attack.max(0.0),
            decay: decay.max(0.0),
            sustain: sustain.clamp(0.0, 1.0),
            release: release.max(0.0),
        }
    }
}

impl Default for AdsrParams {
    fn default() -> Self {
        Self::new(0.01, 0.1, 0.7, 0.2)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    Idle,
    Attack,
    Decay,
    Sustain,
    Release,
}

/// ADSR envelope generator
#[derive(Debug, Clone)]
pub struct AdsrEnvelope {
    params: AdsrParams,
    sample_rate: f32,
    stage: Stage,
    level: f32,
}

impl AdsrEnvelope {
    pub fn new(params: AdsrParams, sample_rate: f32) -> Self {
        Self {
            params,
            sample_rate,
            stage: Stage::Idle,
            level: 0.0,
        }
    }

    pub fn set_params(&mut self, params: AdsrParams) {
        self.params = params;
    }

    pub fn note_on(&mut self) {
        self.stage = Stage::Attack;
    }

    pub fn note_off(&mut self) {
        if self.stage != Stage::Idle {
            self.stage = Stage::Release;
        }
    }

    pub fn reset(&mut self) {
        self.stage = Stage::Idle;
        self.level = 0.0;
    }

    /// Whether the envelope is still producing signal (any non-idle stage)
    pub fn is_active(&self) -> bool {
        self.stage != Stage::Idle
    }

    pub fn is_releasing(&self) -> bool {
        self.stage == Stage::Release
    }

    // Per-sample linear step for a segment of `seconds` duration
    fn step(&self, seconds: f32) -> f32 {
        if seconds <= 0.0 {
            1.0
        } else {
            1.0 / (seconds * self.sample_rate)
        }
    }

    /// Advance one sample and return the envelope level in [0, 1]
    pub fn next_level(&mut self) -> f32 {
        match self.stage {
            Stage::Idle => {}
            Stage::Attack => {
                self.level += self.step(self.params.attack);
                if self.level >= 1.0 {
                    self.level = 1.0;
                    self.stage = Stage::Decay;
                }
            }
            Stage::Decay => {
                self.level -= self.step(self.params.decay) * (1.0 - self.params.sustain);
                if self.level <= self.params.sustain {
                    self.level = self.params.sustain;
                    self.stage = Stage::Sustain;
                }
            }
            Stage::Sustain => {
                // Zero-sustain voices (percussive) end here
                if self.params.sustain <= 0.0 {
                    self.stage = Stage::Idle;
                    self.level = 0.0;
                }
            }
            Stage::Release => {
                self.level -= self.step(self.params.release);
                if self.level <= 0.0 {
                    self.level = 0.0;
                    self.stage = Stage::Idle;
                }
            }
        }
        self.level
    }
}
