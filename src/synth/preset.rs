// Preset resolver - Maps preset identifiers to voice specifications
// Unknown ids fall back to a fixed default; resolution never fails

use super::adapter::VoiceAdapter;
use super::envelope::AdsrParams;
use super::oscillator::WaveformType;
use super::voice::{MonoVoice, VoicePool};
use crate::sampler::{SampleLoadError, SamplerKit, load_wav};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

/// Preset id of the fixed fallback voice
pub const DEFAULT_PRESET: &str = "classic-poly";

/// Errors while building a voice adapter from a preset.
/// A build failure is fatal to the requesting channel only.
#[derive(Debug, thiserror::Error)]
pub enum PresetError {
    #[error("sample load failed: {0}")]
    Sample(#[from] SampleLoadError),
}

/// Pitch -> sample file mapping inside a kit preset
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KitMapping {
    pub pitch: u8,
    pub path: PathBuf,
}

/// The synthesis recipe behind a preset id
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum PresetKind {
    Poly {
        waveform: WaveformType,
        adsr: AdsrParams,
        voices: usize,
    },
    Mono {
        waveform: WaveformType,
        adsr: AdsrParams,
    },
    Kit {
        mappings: Vec<KitMapping>,
    },
}

/// A named voice specification
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PresetSpec {
    pub id: String,
    pub name: String,
    pub kind: PresetKind,
}

/// Registry of known presets.
///
/// Resolution is total: unknown ids resolve to [`DEFAULT_PRESET`], which is
/// always registered. Building an adapter can still fail (a kit's sample
/// files may be unreadable); that failure stays local to the caller.
pub struct PresetResolver {
    presets: HashMap<String, PresetSpec>,
}

impl PresetResolver {
    /// Registry with the built-in synth presets
    pub fn builtin() -> Self {
        let mut resolver = Self {
            presets: HashMap::new(),
        };

        resolver.register(PresetSpec {
            id: DEFAULT_PRESET.to_string(),
            name: "Classic Poly".to_string(),
            kind: PresetKind::Poly {
                waveform: WaveformType::Saw,
                adsr: AdsrParams::default(),
                voices: 16,
            },
        });
        resolver.register(PresetSpec {
            id: "warm-pad".to_string(),
            name: "Warm Pad".to_string(),
            kind: PresetKind::Poly {
                waveform: WaveformType::Sine,
                adsr: AdsrParams::new(0.25, 0.3, 0.8, 0.8),
                voices: 16,
            },
        });
        resolver.register(PresetSpec {
            id: "bright-keys".to_string(),
            name: "Bright Keys".to_string(),
            kind: PresetKind::Poly {
                waveform: WaveformType::Triangle,
                adsr: AdsrParams::new(0.005, 0.2, 0.5, 0.3),
                voices: 16,
            },
        });
        resolver.register(PresetSpec {
            id: "mono-lead".to_string(),
            name: "Mono Lead".to_string(),
            kind: PresetKind::Mono {
                waveform: WaveformType::Square,
                adsr: AdsrParams::new(0.005, 0.1, 0.7, 0.15),
            },
        });
        resolver.register(PresetSpec {
            id: "pluck-bass".to_string(),
            name: "Pluck Bass".to_string(),
            kind: PresetKind::Mono {
                waveform: WaveformType::Saw,
                adsr: AdsrParams::new(0.002, 0.25, 0.2, 0.1),
            },
        });

        resolver
    }

    /// Register or replace a preset (kits are registered at runtime)
    pub fn register(&mut self, spec: PresetSpec) {
        self.presets.insert(spec.id.clone(), spec);
    }

    pub fn contains(&self, preset_id: &str) -> bool {
        self.presets.contains_key(preset_id)
    }

    pub fn known_ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.presets.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }

    /// Resolve a preset id, falling back to the default for unknown ids
    pub fn resolve(&self, preset_id: &str) -> &PresetSpec {
        if let Some(spec) = self.presets.get(preset_id) {
            return spec;
        }
        log::debug!("unknown preset '{}', using '{}'", preset_id, DEFAULT_PRESET);
        &self.presets[DEFAULT_PRESET]
    }

    /// Validate an externally supplied preset id against the known set,
    /// falling back to a role-appropriate default. Used when consuming
    /// composition-assist arrangements.
    pub fn resolve_for_role<'a>(&'a self, role: &str, requested: Option<&'a str>) -> &'a str {
        if let Some(id) = requested {
            if self.contains(id) {
                return id;
            }
        }
        match role.to_ascii_lowercase().as_str() {
            "bass" => "pluck-bass",
            "lead" | "melody" => "mono-lead",
            "pad" | "chords" => "warm-pad",
            "keys" => "bright-keys",
            _ => DEFAULT_PRESET,
        }
    }

    /// Build a voice adapter for the preset id at the given sample rate
    pub fn build(&self, preset_id: &str, sample_rate: f64) -> Result<VoiceAdapter, PresetError> {
        let spec = self.resolve(preset_id);
        match &spec.kind {
            PresetKind::Poly {
                waveform,
                adsr,
                voices,
            } => Ok(VoiceAdapter::Poly(VoicePool::new(
                *voices,
                *waveform,
                *adsr,
                sample_rate as f32,
            ))),
            PresetKind::Mono { waveform, adsr } => Ok(VoiceAdapter::Mono(MonoVoice::new(
                *waveform,
                *adsr,
                sample_rate as f32,
            ))),
            PresetKind::Kit { mappings } => {
                let mut kit = SamplerKit::new(sample_rate);
                for mapping in mappings {
                    let sample = load_wav(&mapping.path)?;
                    kit.insert_sample(mapping.pitch, sample);
                }
                Ok(VoiceAdapter::Sampler(kit))
            }
        }
    }
}

impl Default for PresetResolver {
    fn default() -> Self {
        Self::builtin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_preset_falls_back() {
        let resolver = PresetResolver::builtin();
        let spec = resolver.resolve("does-not-exist");
        assert_eq!(spec.id, DEFAULT_PRESET);
    }

    #[test]
    fn test_known_ids_contains_builtins() {
        let resolver = PresetResolver::builtin();
        let ids = resolver.known_ids();
        assert!(ids.contains(&DEFAULT_PRESET));
        assert!(ids.contains(&"mono-lead"));
    }

    #[test]
    fn test_resolve_for_role() {
        let resolver = PresetResolver::builtin();

        // Known id passes through
        assert_eq!(
            resolver.resolve_for_role("bass", Some("warm-pad")),
            "warm-pad"
        );
        // Unknown id falls back to the role default
        assert_eq!(
            resolver.resolve_for_role("bass", Some("fm-mega-bass")),
            "pluck-bass"
        );
        assert_eq!(resolver.resolve_for_role("pad", None), "warm-pad");
        assert_eq!(resolver.resolve_for_role("anything", None), DEFAULT_PRESET);
    }

    #[test]
    fn test_build_synth_presets() {
        let resolver = PresetResolver::builtin();
        for id in [DEFAULT_PRESET, "warm-pad", "mono-lead", "pluck-bass"] {
            let adapter = resolver.build(id, 48000.0).unwrap();
            assert!(adapter.is_ready());
        }
    }

    #[test]
    fn test_build_kit_with_missing_file_fails() {
        let mut resolver = PresetResolver::builtin();
        resolver.register(PresetSpec {
            id: "broken-kit".to_string(),
            name: "Broken Kit".to_string(),
            kind: PresetKind::Kit {
                mappings: vec![KitMapping {
                    pitch: 36,
                    path: PathBuf::from("/nonexistent/kick.wav"),
                }],
            },
        });

        assert!(resolver.build("broken-kit", 48000.0).is_err());
        // The rest of the registry is unaffected
        assert!(resolver.build(DEFAULT_PRESET, 48000.0).is_ok());
    }
}
