// Channel rack - One signal chain per track, feeding the master bus
// Channels are runtime-only: created lazily, torn down with their track

use super::master::MasterBus;
use super::params::AtomicF32;
use crate::model::types::{TrackId, TrackType};
use crate::synth::adapter::VoiceAdapter;
use crate::synth::preset::{DEFAULT_PRESET, PresetError, PresetResolver};
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::f32::consts::FRAC_PI_4;
use std::sync::atomic::{AtomicBool, Ordering};

/// One trigger armed on a channel's timeline, in absolute sample time.
/// `time_seconds` is the wall-clock time implied by the tempo in effect at
/// schedule time; tempo changes never move events already armed here.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScheduledEvent {
    pub pitch: u8,
    pub velocity: u8,
    pub start_sample: u64,
    pub duration_samples: u64,
    pub time_seconds: f64,
}

/// A track's runtime signal chain: voice adapter -> gain/pan -> master.
///
/// Audio tracks get a voiceless channel (gain/pan only); trigger calls on
/// them are no-ops.
pub struct Channel {
    track_id: TrackId,
    track_type: TrackType,
    preset_id: Option<String>,
    adapter: Option<VoiceAdapter>,
    gain: AtomicF32,
    pan: AtomicF32,
    muted: AtomicBool,
    events: Vec<ScheduledEvent>,
    cursor: usize,
}

impl Channel {
    fn new(
        track_id: TrackId,
        track_type: TrackType,
        preset_id: Option<String>,
        adapter: Option<VoiceAdapter>,
    ) -> Self {
        Self {
            track_id,
            track_type,
            preset_id,
            adapter,
            gain: AtomicF32::new(0.8),
            pan: AtomicF32::new(0.0),
            muted: AtomicBool::new(false),
            events: Vec::new(),
            cursor: 0,
        }
    }

    pub fn track_id(&self) -> TrackId {
        self.track_id
    }

    pub fn track_type(&self) -> TrackType {
        self.track_type
    }

    pub fn preset_id(&self) -> Option<&str> {
        self.preset_id.as_deref()
    }

    pub fn set_gain(&self, gain: f32) {
        self.gain.set(gain.clamp(0.0, 1.0));
    }

    pub fn set_pan(&self, pan: f32) {
        self.pan.set(pan.clamp(-1.0, 1.0));
    }

    pub fn set_muted(&self, muted: bool) {
        self.muted.store(muted, Ordering::Relaxed);
    }

    pub fn is_muted(&self) -> bool {
        self.muted.load(Ordering::Relaxed)
    }

    /// Replace the armed event list. Events are kept sorted by start; the
    /// fire cursor resets, so callers re-seek to the playhead afterwards.
    pub fn set_schedule(&mut self, mut events: Vec<ScheduledEvent>) {
        events.sort_by_key(|e| e.start_sample);
        self.events = events;
        self.cursor = 0;
    }

    pub fn clear_schedule(&mut self) {
        self.events.clear();
        self.cursor = 0;
    }

    pub fn scheduled_events(&self) -> &[ScheduledEvent] {
        &self.events
    }

    /// Fire every armed event whose start falls in [from, to).
    /// Events the cursor passes that started before `from` were missed
    /// (e.g. while paused) and are skipped rather than fired late.
    pub fn fire_due(&mut self, from: u64, to: u64) {
        while let Some(event) = self.events.get(self.cursor) {
            if event.start_sample >= to {
                break;
            }
            if event.start_sample >= from {
                if let Some(adapter) = &mut self.adapter {
                    adapter.attack_release(event.pitch, event.velocity, event.duration_samples);
                }
            }
            self.cursor += 1;
        }
    }

    /// Move the fire cursor to an absolute sample position, releasing
    /// anything still sounding from before the jump
    pub fn seek(&mut self, sample: u64) {
        self.release_all();
        self.cursor = self.events.partition_point(|e| e.start_sample < sample);
    }

    pub fn attack(&mut self, pitch: u8, velocity: u8) {
        if let Some(adapter) = &mut self.adapter {
            adapter.attack(pitch, velocity);
        }
    }

    pub fn release(&mut self, pitch: u8) {
        if let Some(adapter) = &mut self.adapter {
            adapter.release(pitch);
        }
    }

    pub fn release_all(&mut self) {
        if let Some(adapter) = &mut self.adapter {
            adapter.release_all();
        }
    }

    pub fn active_voice_count(&self) -> usize {
        self.adapter.as_ref().map_or(0, |a| a.active_count())
    }

    /// Render one stereo frame. Voices keep advancing while muted so
    /// release tails do not freeze; only the output is silenced.
    pub fn render_frame(&mut self) -> (f32, f32) {
        let Some(adapter) = &mut self.adapter else {
            return (0.0, 0.0);
        };
        let sample = adapter.next_sample();
        if self.muted.load(Ordering::Relaxed) {
            return (0.0, 0.0);
        }

        let gained = sample * self.gain.get();
        // Equal-power pan
        let angle = (self.pan.get() + 1.0) * FRAC_PI_4;
        (gained * angle.cos(), gained * angle.sin())
    }

    // Build a fresh adapter first so a failure leaves the old one sounding
    fn swap_adapter(
        &mut self,
        preset_id: &str,
        resolver: &PresetResolver,
        sample_rate: f64,
    ) -> Result<(), PresetError> {
        let next = resolver.build(preset_id, sample_rate)?;
        if let Some(old) = &mut self.adapter {
            old.release_all();
        }
        self.adapter = Some(next);
        self.preset_id = Some(preset_id.to_string());
        Ok(())
    }
}

/// Owns every live channel plus the master bus. Guarantees exactly one
/// channel per live track id.
pub struct ChannelRack {
    channels: HashMap<TrackId, Channel>,
    master: MasterBus,
    sample_rate: f64,
}

impl ChannelRack {
    pub fn new(sample_rate: f64) -> Self {
        Self {
            channels: HashMap::new(),
            master: MasterBus::new(),
            sample_rate,
        }
    }

    pub fn master(&self) -> &MasterBus {
        &self.master
    }

    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    pub fn channel(&self, track_id: TrackId) -> Option<&Channel> {
        self.channels.get(&track_id)
    }

    pub fn channel_mut(&mut self, track_id: TrackId) -> Option<&mut Channel> {
        self.channels.get_mut(&track_id)
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    /// Idempotent: returns the existing channel or builds one
    /// (resolve preset -> build adapter -> connect gain/pan -> master)
    pub fn ensure_channel(
        &mut self,
        track_id: TrackId,
        track_type: TrackType,
        preset_id: Option<&str>,
    ) -> Result<&mut Channel, PresetError> {
        let resolver = PresetResolver::builtin();
        self.ensure_channel_with(track_id, track_type, preset_id, &resolver)
    }

    /// Same as [`ensure_channel`] but with a caller-supplied resolver
    /// (needed for runtime-registered kit presets)
    pub fn ensure_channel_with(
        &mut self,
        track_id: TrackId,
        track_type: TrackType,
        preset_id: Option<&str>,
        resolver: &PresetResolver,
    ) -> Result<&mut Channel, PresetError> {
        match self.channels.entry(track_id) {
            Entry::Occupied(entry) => Ok(entry.into_mut()),
            Entry::Vacant(entry) => {
                let channel = Self::build_channel(
                    track_id,
                    track_type,
                    preset_id,
                    resolver,
                    self.sample_rate,
                )?;
                Ok(entry.insert(channel))
            }
        }
    }

    fn build_channel(
        track_id: TrackId,
        track_type: TrackType,
        preset_id: Option<&str>,
        resolver: &PresetResolver,
        sample_rate: f64,
    ) -> Result<Channel, PresetError> {
        let (resolved_id, adapter) = if track_type.has_notes() {
            let id = preset_id.unwrap_or(DEFAULT_PRESET);
            (
                Some(id.to_string()),
                Some(resolver.build(id, sample_rate)?),
            )
        } else {
            (None, None)
        };
        log::debug!(
            "channel created for track {:?} (preset {:?})",
            track_id,
            resolved_id
        );
        Ok(Channel::new(track_id, track_type, resolved_id, adapter))
    }

    /// Swap a channel's instrument. No-op when the preset already matches
    /// or the track has no channel yet; on success the old voices are
    /// released and the adapter replaced in place.
    pub fn set_track_instrument(
        &mut self,
        track_id: TrackId,
        preset_id: &str,
        resolver: &PresetResolver,
    ) -> Result<bool, PresetError> {
        let sample_rate = self.sample_rate;
        let Some(channel) = self.channels.get_mut(&track_id) else {
            return Ok(false); // not yet audible
        };
        if channel.preset_id() == Some(preset_id) {
            return Ok(false);
        }
        channel.swap_adapter(preset_id, resolver, sample_rate)?;
        log::info!("track {:?} instrument -> {}", track_id, preset_id);
        Ok(true)
    }

    pub fn set_track_volume(&mut self, track_id: TrackId, volume: f32) {
        if let Some(channel) = self.channels.get(&track_id) {
            channel.set_gain(volume);
        }
    }

    pub fn set_track_pan(&mut self, track_id: TrackId, pan: f32) {
        if let Some(channel) = self.channels.get(&track_id) {
            channel.set_pan(pan);
        }
    }

    pub fn set_track_muted(&mut self, track_id: TrackId, muted: bool) {
        if let Some(channel) = self.channels.get(&track_id) {
            channel.set_muted(muted);
        }
    }

    /// Stop and drop a track's channel; idempotent if already removed
    pub fn remove_channel(&mut self, track_id: TrackId) {
        if let Some(mut channel) = self.channels.remove(&track_id) {
            channel.release_all();
            channel.clear_schedule();
            log::debug!("channel removed for track {:?}", track_id);
        }
    }

    /// Drop channels whose tracks are no longer present
    pub fn retain_tracks(&mut self, live: &[TrackId]) {
        let stale: Vec<TrackId> = self
            .channels
            .keys()
            .filter(|id| !live.contains(id))
            .copied()
            .collect();
        for track_id in stale {
            self.remove_channel(track_id);
        }
    }

    /// Live-path trigger; channel absence means "track not yet audible"
    pub fn attack(&mut self, track_id: TrackId, pitch: u8, velocity: u8) {
        if let Some(channel) = self.channels.get_mut(&track_id) {
            channel.attack(pitch, velocity);
        }
    }

    pub fn release(&mut self, track_id: TrackId, pitch: u8) {
        if let Some(channel) = self.channels.get_mut(&track_id) {
            channel.release(pitch);
        }
    }

    pub fn release_all(&mut self) {
        for channel in self.channels.values_mut() {
            channel.release_all();
        }
    }

    /// Full cancellation: silence every voice and drop all armed events
    pub fn stop_all(&mut self) {
        for channel in self.channels.values_mut() {
            channel.release_all();
            channel.clear_schedule();
        }
    }

    pub fn fire_due(&mut self, from: u64, to: u64) {
        for channel in self.channels.values_mut() {
            channel.fire_due(from, to);
        }
    }

    pub fn seek_all(&mut self, sample: u64) {
        for channel in self.channels.values_mut() {
            channel.seek(sample);
        }
    }

    /// Mix one stereo frame from every channel through the master bus
    pub fn render_frame(&mut self) -> (f32, f32) {
        let mut left = 0.0;
        let mut right = 0.0;
        for channel in self.channels.values_mut() {
            let (l, r) = channel.render_frame();
            left += l;
            right += r;
        }
        self.master.process(left, right)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SR: f64 = 48000.0;

    fn event(pitch: u8, start_sample: u64) -> ScheduledEvent {
        ScheduledEvent {
            pitch,
            velocity: 100,
            start_sample,
            duration_samples: 1000,
            time_seconds: start_sample as f64 / SR,
        }
    }

    #[test]
    fn test_ensure_channel_idempotent() {
        let mut rack = ChannelRack::new(SR);
        let track_id = TrackId::new();

        rack.ensure_channel(track_id, TrackType::Instrument, Some("mono-lead"))
            .unwrap();
        rack.ensure_channel(track_id, TrackType::Instrument, Some("mono-lead"))
            .unwrap();
        assert_eq!(rack.channel_count(), 1);
        assert_eq!(
            rack.channel(track_id).unwrap().preset_id(),
            Some("mono-lead")
        );
    }

    #[test]
    fn test_audio_track_gets_voiceless_channel() {
        let mut rack = ChannelRack::new(SR);
        let track_id = TrackId::new();
        rack.ensure_channel(track_id, TrackType::Audio, None).unwrap();

        // Triggers are no-ops, not errors
        rack.attack(track_id, 60, 100);
        assert_eq!(rack.channel(track_id).unwrap().active_voice_count(), 0);
    }

    #[test]
    fn test_set_instrument_noop_on_same_preset() {
        let mut rack = ChannelRack::new(SR);
        let resolver = PresetResolver::builtin();
        let track_id = TrackId::new();
        rack.ensure_channel(track_id, TrackType::Instrument, Some("warm-pad"))
            .unwrap();

        let changed = rack
            .set_track_instrument(track_id, "warm-pad", &resolver)
            .unwrap();
        assert!(!changed);

        let changed = rack
            .set_track_instrument(track_id, "mono-lead", &resolver)
            .unwrap();
        assert!(changed);
        assert_eq!(
            rack.channel(track_id).unwrap().preset_id(),
            Some("mono-lead")
        );

        // Second call with the same id is a no-op again
        let changed = rack
            .set_track_instrument(track_id, "mono-lead", &resolver)
            .unwrap();
        assert!(!changed);
    }

    #[test]
    fn test_failed_swap_keeps_old_adapter() {
        use crate::synth::preset::{KitMapping, PresetKind, PresetSpec};

        let mut rack = ChannelRack::new(SR);
        let mut resolver = PresetResolver::builtin();
        resolver.register(PresetSpec {
            id: "broken-kit".to_string(),
            name: "Broken".to_string(),
            kind: PresetKind::Kit {
                mappings: vec![KitMapping {
                    pitch: 36,
                    path: "/nonexistent/kick.wav".into(),
                }],
            },
        });

        let track_id = TrackId::new();
        rack.ensure_channel(track_id, TrackType::Instrument, Some("warm-pad"))
            .unwrap();

        assert!(
            rack.set_track_instrument(track_id, "broken-kit", &resolver)
                .is_err()
        );
        // The old preset survives the failed swap
        assert_eq!(
            rack.channel(track_id).unwrap().preset_id(),
            Some("warm-pad")
        );
    }

    #[test]
    fn test_remove_channel_idempotent() {
        let mut rack = ChannelRack::new(SR);
        let track_id = TrackId::new();
        rack.ensure_channel(track_id, TrackType::Instrument, None)
            .unwrap();

        rack.remove_channel(track_id);
        rack.remove_channel(track_id);
        assert_eq!(rack.channel_count(), 0);
    }

    #[test]
    fn test_retain_tracks_drops_stale_channels() {
        let mut rack = ChannelRack::new(SR);
        let keep = TrackId::new();
        let drop = TrackId::new();
        rack.ensure_channel(keep, TrackType::Instrument, None).unwrap();
        rack.ensure_channel(drop, TrackType::Instrument, None).unwrap();

        rack.retain_tracks(&[keep]);
        assert_eq!(rack.channel_count(), 1);
        assert!(rack.channel(keep).is_some());
        assert!(rack.channel(drop).is_none());
    }

    #[test]
    fn test_fire_due_triggers_in_window_only() {
        let mut rack = ChannelRack::new(SR);
        let track_id = TrackId::new();
        let channel = rack
            .ensure_channel(track_id, TrackType::Instrument, None)
            .unwrap();
        channel.set_schedule(vec![event(60, 100), event(64, 600), event(67, 5000)]);

        channel.fire_due(0, 512);
        assert_eq!(channel.active_voice_count(), 1);

        channel.fire_due(512, 1024);
        assert_eq!(channel.active_voice_count(), 2);
    }

    #[test]
    fn test_seek_skips_past_events() {
        let mut rack = ChannelRack::new(SR);
        let track_id = TrackId::new();
        let channel = rack
            .ensure_channel(track_id, TrackType::Instrument, None)
            .unwrap();
        channel.set_schedule(vec![event(60, 100), event(64, 10_000)]);

        channel.seek(5000);
        channel.fire_due(5000, 20_000);
        // Only the event at 10_000 fires
        assert_eq!(channel.active_voice_count(), 1);
    }

    #[test]
    fn test_stop_all_clears_events_and_voices() {
        let mut rack = ChannelRack::new(SR);
        let track_id = TrackId::new();
        let channel = rack
            .ensure_channel(track_id, TrackType::Instrument, None)
            .unwrap();
        channel.set_schedule(vec![event(60, 0)]);
        channel.fire_due(0, 10);

        rack.stop_all();
        let channel = rack.channel(track_id).unwrap();
        assert!(channel.scheduled_events().is_empty());
    }

    #[test]
    fn test_muted_channel_renders_silence() {
        let mut rack = ChannelRack::new(SR);
        let track_id = TrackId::new();
        let channel = rack
            .ensure_channel(track_id, TrackType::Instrument, None)
            .unwrap();
        channel.attack(60, 127);
        channel.set_muted(true);

        for _ in 0..256 {
            let (l, r) = channel.render_frame();
            assert_eq!((l, r), (0.0, 0.0));
        }
    }
}
