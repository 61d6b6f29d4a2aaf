// Sampler - One-shot sample playback keyed by pitch
// Used for drum-kit voices; samples are loaded eagerly from WAV files

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

/// Sample loading error types
#[derive(Debug, thiserror::Error)]
pub enum SampleLoadError {
    #[error("WAV error: {0}")]
    Wav(#[from] hound::Error),

    #[error("empty sample file: {0}")]
    Empty(String),
}

/// An in-memory mono sample
#[derive(Debug, Clone)]
pub struct Sample {
    pub name: String,
    pub data: Vec<f32>,
    pub source_rate: u32,
}

/// Load a WAV file and mix it down to mono f32
pub fn load_wav<P: AsRef<Path>>(path: P) -> Result<Sample, SampleLoadError> {
    let path = path.as_ref();
    let mut reader = hound::WavReader::open(path)?;
    let spec = reader.spec();
    let channels = spec.channels.max(1) as usize;

    let raw: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Float => reader.samples::<f32>().collect::<Result<_, _>>()?,
        hound::SampleFormat::Int => {
            let scale = 1.0 / (1i64 << (spec.bits_per_sample - 1)) as f32;
            reader
                .samples::<i32>()
                .map(|s| s.map(|v| v as f32 * scale))
                .collect::<Result<_, _>>()?
        }
    };

    if raw.is_empty() {
        return Err(SampleLoadError::Empty(path.display().to_string()));
    }

    let mut data = Vec::with_capacity(raw.len() / channels);
    for frame in raw.chunks(channels) {
        data.push(frame.iter().sum::<f32>() / channels as f32);
    }

    Ok(Sample {
        name: path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default(),
        data,
        source_rate: spec.sample_rate,
    })
}

/// One playing instance of a sample
#[derive(Debug, Clone)]
struct KitVoice {
    sample: Arc<Sample>,
    position: f64,
    step: f64,
    gain: f32,
    active: bool,
}

impl KitVoice {
    fn next_sample(&mut self) -> f32 {
        if !self.active {
            return 0.0;
        }

        let index = self.position as usize;
        if index + 1 >= self.sample.data.len() {
            self.active = false;
            return 0.0;
        }

        // Linear interpolation between adjacent source frames
        let frac = self.position.fract() as f32;
        let a = self.sample.data[index];
        let b = self.sample.data[index + 1];
        self.position += self.step;
        (a + (b - a) * frac) * self.gain
    }
}

/// A drum kit: pitch -> sample map plus a small pool of one-shot voices.
///
/// Trigger semantics: `attack` fires one-shot playback for a mapped pitch
/// (unmapped pitches are ignored), `release` is a no-op, `release_all`
/// cuts every playing shot so a transport stop actually silences the kit.
#[derive(Debug, Clone)]
pub struct SamplerKit {
    samples: HashMap<u8, Arc<Sample>>,
    voices: Vec<KitVoice>,
    sample_rate: f64,
    max_voices: usize,
}

impl SamplerKit {
    pub fn new(sample_rate: f64) -> Self {
        Self {
            samples: HashMap::new(),
            voices: Vec::new(),
            sample_rate,
            max_voices: 16,
        }
    }

    pub fn insert_sample(&mut self, pitch: u8, sample: Sample) {
        self.samples.insert(pitch, Arc::new(sample));
    }

    /// A kit is ready to trigger once it carries at least one sample.
    /// Previews must not fire before load completion.
    pub fn is_ready(&self) -> bool {
        !self.samples.is_empty()
    }

    pub fn mapped_pitches(&self) -> Vec<u8> {
        let mut pitches: Vec<u8> = self.samples.keys().copied().collect();
        pitches.sort_unstable();
        pitches
    }

    pub fn attack(&mut self, pitch: u8, velocity: u8) {
        if !self.is_ready() {
            return;
        }
        let Some(sample) = self.samples.get(&pitch) else {
            return; // unmapped pitch, silently ignored
        };

        let voice = KitVoice {
            sample: Arc::clone(sample),
            position: 0.0,
            step: sample.source_rate as f64 / self.sample_rate,
            gain: velocity as f32 / 127.0,
            active: true,
        };

        if let Some(slot) = self.voices.iter_mut().find(|v| !v.active) {
            *slot = voice;
        } else if self.voices.len() < self.max_voices {
            self.voices.push(voice);
        } else {
            // Steal the shot closest to its end
            if let Some(slot) = self
                .voices
                .iter_mut()
                .max_by(|a, b| a.position.total_cmp(&b.position))
            {
                *slot = voice;
            }
        }
    }

    /// One-shots have no sustain to release
    pub fn release(&mut self, _pitch: u8) {}

    /// Cut every playing shot
    pub fn release_all(&mut self) {
        for voice in &mut self.voices {
            voice.active = false;
        }
    }

    pub fn active_count(&self) -> usize {
        self.voices.iter().filter(|v| v.active).count()
    }

    pub fn next_sample(&mut self) -> f32 {
        self.voices.iter_mut().map(|v| v.next_sample()).sum::<f32>() / 4.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_sample(len: usize) -> Sample {
        Sample {
            name: "click".to_string(),
            data: (0..len).map(|i| if i % 2 == 0 { 0.5 } else { -0.5 }).collect(),
            source_rate: 48000,
        }
    }

    fn write_test_wav(path: &Path, frames: usize) {
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: 48000,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(path, spec).unwrap();
        for i in 0..frames {
            let v = if i % 2 == 0 { 8000i16 } else { -8000i16 };
            writer.write_sample(v).unwrap();
        }
        writer.finalize().unwrap();
    }

    #[test]
    fn test_load_wav_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("kick.wav");
        write_test_wav(&path, 64);

        let sample = load_wav(&path).unwrap();
        assert_eq!(sample.name, "kick");
        assert_eq!(sample.data.len(), 64);
        assert_eq!(sample.source_rate, 48000);
        assert!(sample.data[0] > 0.2 && sample.data[0] < 0.3);
    }

    #[test]
    fn test_load_missing_file() {
        assert!(load_wav("/nonexistent/kick.wav").is_err());
    }

    #[test]
    fn test_kit_not_ready_until_loaded() {
        let mut kit = SamplerKit::new(48000.0);
        assert!(!kit.is_ready());

        kit.attack(36, 127);
        assert_eq!(kit.active_count(), 0);

        kit.insert_sample(36, test_sample(32));
        assert!(kit.is_ready());
        kit.attack(36, 127);
        assert_eq!(kit.active_count(), 1);
    }

    #[test]
    fn test_unmapped_pitch_is_ignored() {
        let mut kit = SamplerKit::new(48000.0);
        kit.insert_sample(36, test_sample(32));
        kit.attack(40, 127);
        assert_eq!(kit.active_count(), 0);
    }

    #[test]
    fn test_one_shot_plays_to_end() {
        let mut kit = SamplerKit::new(48000.0);
        kit.insert_sample(36, test_sample(32));
        kit.attack(36, 127);
        kit.release(36); // no-op

        let mut heard = false;
        for _ in 0..64 {
            if kit.next_sample().abs() > 0.0 {
                heard = true;
            }
        }
        assert!(heard);
        assert_eq!(kit.active_count(), 0);
    }

    #[test]
    fn test_release_all_cuts_shots() {
        let mut kit = SamplerKit::new(48000.0);
        kit.insert_sample(36, test_sample(4096));
        kit.attack(36, 127);
        kit.release_all();
        assert_eq!(kit.active_count(), 0);
        assert_eq!(kit.next_sample(), 0.0);
    }
}
