// Live capture - Routes incoming note events to a channel and, while
// recording, commits them to a clip on the armed track
// Notes sound immediately on the way in; recording is bookkeeping on top

use crate::mixer::ChannelRack;
use crate::model::types::{Clip, ClipId, Note, Project, TrackId, generate_note_id};
use crate::synth::preset::PresetResolver;
use std::collections::HashMap;

/// Shortest note a performance can produce, in beats. A key tapped and
/// released inside one audio buffer still lands as a 32nd at 4/4.
pub const MIN_CAPTURE_BEATS: f64 = 0.125;

struct HeldNote {
    start_beat: f64,
    velocity: u8,
}

/// Live input state: which pitches are down and where they are being
/// recorded to. One capture clip at a time.
pub struct LiveCapture {
    held: HashMap<u8, HeldNote>,
    target_clip: Option<ClipId>,
}

impl LiveCapture {
    pub fn new() -> Self {
        Self {
            held: HashMap::new(),
            target_clip: None,
        }
    }

    pub fn is_recording(&self) -> bool {
        self.target_clip.is_some()
    }

    pub fn target_clip(&self) -> Option<ClipId> {
        self.target_clip
    }

    /// The track live input plays through: the armed track, else the first
    /// track that can carry notes
    pub fn target_track(project: &Project) -> Option<TrackId> {
        project
            .armed_track()
            .map(|t| t.id)
            .or_else(|| {
                project
                    .tracks
                    .iter()
                    .find(|t| t.track_type.has_notes())
                    .map(|t| t.id)
            })
    }

    /// Handle a live note-on: sound it now, and remember it if recording.
    /// Returns the track that played it, if any.
    pub fn note_on(
        &mut self,
        project: &Project,
        rack: &mut ChannelRack,
        resolver: &PresetResolver,
        current_beat: f64,
        pitch: u8,
        velocity: u8,
    ) -> Option<TrackId> {
        let track_id = Self::target_track(project)?;
        let track = project.track(track_id)?;

        match rack.ensure_channel_with(track_id, track.track_type, track.preset_id(), resolver) {
            Ok(channel) => channel.attack(pitch, velocity),
            Err(e) => {
                log::warn!("live input channel build failed: {}", e);
                return None;
            }
        }

        if self.target_clip.is_some() {
            self.held.insert(
                pitch,
                HeldNote {
                    start_beat: current_beat,
                    velocity,
                },
            );
        }
        Some(track_id)
    }

    /// Handle a live note-off: stop the voice and, if recording, commit the
    /// captured note to the target clip
    pub fn note_off(
        &mut self,
        project: &mut Project,
        rack: &mut ChannelRack,
        current_beat: f64,
        pitch: u8,
    ) {
        if let Some(track_id) = Self::target_track(project) {
            rack.release(track_id, pitch);
        }
        if let Some(held) = self.held.remove(&pitch) {
            self.commit(project, pitch, &held, current_beat);
        }
    }

    fn commit(&self, project: &mut Project, pitch: u8, held: &HeldNote, end_beat: f64) {
        let Some(clip_id) = self.target_clip else {
            return;
        };
        let Some(clip) = project.clip_mut(clip_id) else {
            return;
        };
        let start = (held.start_beat - clip.start_beat).max(0.0);
        let duration = (end_beat - held.start_beat).max(MIN_CAPTURE_BEATS);
        clip.add_note(Note::new(
            generate_note_id(),
            pitch,
            start,
            duration,
            held.velocity,
        ));
        project.touch_modified();
    }

    /// Start recording into a fresh clip on the armed track at the current
    /// playhead. No armed track means recording silently does not begin.
    pub fn start_recording(&mut self, project: &mut Project, current_beat: f64) -> Option<ClipId> {
        let track = project.armed_track()?;
        let track_id = track.id;
        let take = track
            .clips
            .iter()
            .filter(|c| c.name.starts_with("Take"))
            .count()
            + 1;

        let clip = Clip::new(track_id, format!("Take {}", take), current_beat, 0.0);
        let clip_id = clip.id;
        if let Some(track) = project.track_mut(track_id) {
            track.clips.push(clip);
        }
        self.target_clip = Some(clip_id);
        self.held.clear();
        log::info!("recording into clip {:?} at beat {:.3}", clip_id, current_beat);
        Some(clip_id)
    }

    /// Stop recording: finalize pitches still held, then size the clip to a
    /// whole number of bars (at least one). Returns the finished clip id.
    pub fn stop_recording(&mut self, project: &mut Project, current_beat: f64) -> Option<ClipId> {
        let clip_id = self.target_clip?;

        let held: Vec<(u8, HeldNote)> = self.held.drain().collect();
        for (pitch, note) in &held {
            self.commit(project, *pitch, note, current_beat);
        }

        let beats_per_bar = project.time_signature.beats_per_bar();
        if let Some(clip) = project.clip_mut(clip_id) {
            let elapsed = (current_beat - clip.start_beat).max(0.0);
            let bars = (elapsed / beats_per_bar).ceil().max(1.0);
            clip.duration_beats = bars * beats_per_bar;
        }
        project.touch_modified();

        self.target_clip = None;
        log::info!("recording stopped, clip {:?} finalized", clip_id);
        Some(clip_id)
    }
}

impl Default for LiveCapture {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::types::{Track, TrackType};

    const SR: f64 = 48000.0;

    fn project_with_armed_track() -> (Project, TrackId) {
        let mut project = Project::new("Demo");
        let mut track = Track::new("Keys", TrackType::Instrument).with_instrument("classic-poly");
        track.armed = true;
        let track_id = track.id;
        project.tracks.push(track);
        (project, track_id)
    }

    #[test]
    fn test_note_on_routes_to_armed_track() {
        let (project, track_id) = project_with_armed_track();
        let mut rack = ChannelRack::new(SR);
        let resolver = PresetResolver::builtin();
        let mut capture = LiveCapture::new();

        let played = capture.note_on(&project, &mut rack, &resolver, 0.0, 60, 100);
        assert_eq!(played, Some(track_id));
        assert_eq!(rack.channel(track_id).unwrap().active_voice_count(), 1);
    }

    #[test]
    fn test_note_on_falls_back_to_first_note_track() {
        let mut project = Project::new("Demo");
        project.tracks.push(Track::new("Drums", TrackType::Audio));
        let track = Track::new("Keys", TrackType::Instrument);
        let expected = track.id;
        project.tracks.push(track);

        assert_eq!(LiveCapture::target_track(&project), Some(expected));
    }

    #[test]
    fn test_recorded_note_positions() {
        // Record on at beat 2.0, note on at 2.0 and off at 2.5
        let (mut project, track_id) = project_with_armed_track();
        let mut rack = ChannelRack::new(SR);
        let resolver = PresetResolver::builtin();
        let mut capture = LiveCapture::new();

        capture.start_recording(&mut project, 2.0).unwrap();
        capture.note_on(&project, &mut rack, &resolver, 2.0, 60, 100);
        capture.note_off(&mut project, &mut rack, 2.5, 60);
        let clip_id = capture.stop_recording(&mut project, 4.0).unwrap();

        let track = project.track(track_id).unwrap();
        let clip = track.clip(clip_id).unwrap();
        let note = clip.notes()[0];
        assert!((note.start_beat - 0.0).abs() < 1e-9);
        assert!((note.duration_beats - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_held_note_finalized_on_stop() {
        let (mut project, _) = project_with_armed_track();
        let mut rack = ChannelRack::new(SR);
        let resolver = PresetResolver::builtin();
        let mut capture = LiveCapture::new();

        capture.start_recording(&mut project, 0.0).unwrap();
        capture.note_on(&project, &mut rack, &resolver, 1.0, 64, 90);
        // Key still down when recording stops
        let clip_id = capture.stop_recording(&mut project, 3.0).unwrap();

        let clip = project.clip_mut(clip_id).unwrap();
        let note = clip.notes()[0];
        assert_eq!(note.pitch, 64);
        assert!((note.duration_beats - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_clip_rounded_up_to_full_bars() {
        let (mut project, _) = project_with_armed_track();
        let mut capture = LiveCapture::new();

        capture.start_recording(&mut project, 0.0).unwrap();
        let clip_id = capture.stop_recording(&mut project, 5.5).unwrap();

        // 5.5 beats elapsed in 4/4 rounds up to 2 bars
        let clip = project.clip_mut(clip_id).unwrap();
        assert_eq!(clip.duration_beats, 8.0);
    }

    #[test]
    fn test_empty_take_still_one_bar() {
        let (mut project, _) = project_with_armed_track();
        let mut capture = LiveCapture::new();

        capture.start_recording(&mut project, 4.0).unwrap();
        let clip_id = capture.stop_recording(&mut project, 4.0).unwrap();

        let clip = project.clip_mut(clip_id).unwrap();
        assert_eq!(clip.duration_beats, 4.0);
    }

    #[test]
    fn test_very_short_tap_clamped() {
        let (mut project, _) = project_with_armed_track();
        let mut rack = ChannelRack::new(SR);
        let resolver = PresetResolver::builtin();
        let mut capture = LiveCapture::new();

        capture.start_recording(&mut project, 0.0).unwrap();
        capture.note_on(&project, &mut rack, &resolver, 1.0, 60, 100);
        capture.note_off(&mut project, &mut rack, 1.0001, 60);
        let clip_id = capture.stop_recording(&mut project, 4.0).unwrap();

        let clip = project.clip_mut(clip_id).unwrap();
        assert!(clip.notes()[0].duration_beats >= MIN_CAPTURE_BEATS);
    }

    #[test]
    fn test_no_armed_track_no_recording() {
        let mut project = Project::new("Demo");
        project.tracks.push(Track::new("Keys", TrackType::Instrument));
        let mut capture = LiveCapture::new();

        assert!(capture.start_recording(&mut project, 0.0).is_none());
        assert!(!capture.is_recording());
    }

    #[test]
    fn test_notes_not_recorded_when_stopped() {
        let (mut project, track_id) = project_with_armed_track();
        let mut rack = ChannelRack::new(SR);
        let resolver = PresetResolver::builtin();
        let mut capture = LiveCapture::new();

        capture.note_on(&project, &mut rack, &resolver, 0.0, 60, 100);
        capture.note_off(&mut project, &mut rack, 0.5, 60);

        assert!(project.track(track_id).unwrap().clips.is_empty());
    }
}
