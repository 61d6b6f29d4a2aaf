// Audio output - cpal stream feeding the channel rack into the device
// The callback advances the shared clock one sample at a time, fires due
// events, and renders the mix. No allocation, no I/O, no blocking locks.

use crate::mixer::ChannelRack;
use crate::sequencer::SharedTransportState;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{FromSample, SampleFormat, SizedSample};
use std::sync::{Arc, Mutex};

/// Errors while opening the output stream
#[derive(Debug, thiserror::Error)]
pub enum AudioError {
    #[error("no audio output device available")]
    NoDevice,
    #[error("default stream config unavailable: {0}")]
    Config(#[from] cpal::DefaultStreamConfigError),
    #[error("stream build failed: {0}")]
    Build(#[from] cpal::BuildStreamError),
    #[error("stream start failed: {0}")]
    Play(#[from] cpal::PlayStreamError),
    #[error("unsupported sample format: {0:?}")]
    Format(SampleFormat),
}

/// Sample rate of the default output device, for sizing the project's
/// clock before the stream exists
pub fn preferred_sample_rate() -> Option<f64> {
    let host = cpal::default_host();
    let device = host.default_output_device()?;
    let config = device.default_output_config().ok()?;
    Some(config.sample_rate().0 as f64)
}

/// A running output stream. Dropping this stops audio.
pub struct AudioOutput {
    _stream: cpal::Stream,
    sample_rate: f64,
    channels: usize,
}

impl AudioOutput {
    /// Open the default output device and start rendering the rack
    pub fn start(
        rack: Arc<Mutex<ChannelRack>>,
        transport: Arc<SharedTransportState>,
    ) -> Result<Self, AudioError> {
        let host = cpal::default_host();
        let device = host.default_output_device().ok_or(AudioError::NoDevice)?;
        let supported = device.default_output_config()?;
        let sample_format = supported.sample_format();
        let config: cpal::StreamConfig = supported.into();
        let sample_rate = config.sample_rate.0 as f64;
        let channels = config.channels as usize;

        log::info!(
            "audio output: {} Hz, {} channels, {:?}",
            sample_rate,
            channels,
            sample_format
        );

        let stream = match sample_format {
            SampleFormat::F32 => {
                Self::build_stream::<f32>(&device, &config, channels, rack, transport)
            }
            SampleFormat::I16 => {
                Self::build_stream::<i16>(&device, &config, channels, rack, transport)
            }
            SampleFormat::U16 => {
                Self::build_stream::<u16>(&device, &config, channels, rack, transport)
            }
            other => return Err(AudioError::Format(other)),
        }?;

        stream.play()?;

        Ok(Self {
            _stream: stream,
            sample_rate,
            channels,
        })
    }

    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    fn build_stream<T>(
        device: &cpal::Device,
        config: &cpal::StreamConfig,
        channels: usize,
        rack: Arc<Mutex<ChannelRack>>,
        transport: Arc<SharedTransportState>,
    ) -> Result<cpal::Stream, cpal::BuildStreamError>
    where
        T: SizedSample + FromSample<f32>,
    {
        let stream = device.build_output_stream(
            config,
            move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
                let Ok(mut rack) = rack.try_lock() else {
                    // Control thread holds the rack; output silence this buffer
                    for sample in data.iter_mut() {
                        *sample = T::from_sample(0.0);
                    }
                    return;
                };

                let playing = transport.state().is_playing();
                for frame in data.chunks_mut(channels) {
                    if playing {
                        // Per-sample clock step: triggers stay sample-accurate
                        // and a loop wrap can never be stepped over
                        let adv = transport.advance(1);
                        rack.fire_due(adv.first.0, adv.first.1);
                        if let Some((start, end)) = adv.second {
                            rack.seek_all(start);
                            rack.fire_due(start, end);
                        }
                    }

                    // Voice tails keep rendering while stopped
                    let (left, right) = rack.render_frame();
                    write_frame(frame, left, right);
                }
            },
            move |err| {
                log::error!("audio stream error: {}", err);
            },
            None,
        )?;
        Ok(stream)
    }
}

/// Spread a stereo frame over however many channels the device has
fn write_frame<T: SizedSample + FromSample<f32>>(frame: &mut [T], left: f32, right: f32) {
    match frame.len() {
        0 => {}
        1 => frame[0] = T::from_sample((left + right) * 0.5),
        _ => {
            frame[0] = T::from_sample(left);
            frame[1] = T::from_sample(right);
            for extra in frame.iter_mut().skip(2) {
                *extra = T::from_sample(0.0);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_frame_stereo() {
        let mut frame = [0.0f32; 2];
        write_frame(&mut frame, 0.5, -0.5);
        assert_eq!(frame, [0.5, -0.5]);
    }

    #[test]
    fn test_write_frame_mono_mixes_down() {
        let mut frame = [0.0f32; 1];
        write_frame(&mut frame, 1.0, 0.0);
        assert_eq!(frame, [0.5]);
    }

    #[test]
    fn test_write_frame_surround_zeroes_extras() {
        let mut frame = [1.0f32; 4];
        write_frame(&mut frame, 0.25, 0.75);
        assert_eq!(frame, [0.25, 0.75, 0.0, 0.0]);
    }
}
