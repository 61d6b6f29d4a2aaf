// Engine - The control-thread facade over the whole runtime
// Owns the project, the transport, and the channel rack shared with the
// audio callback. Every public operation here is safe to call from a UI
// or control loop; nothing blocks the audio thread.

use crate::messaging::{LiveEvent, LiveEventConsumer};
use crate::mixer::ChannelRack;
use crate::model::store::{self, StoreError};
use crate::model::types::{ClipId, NoteSeed, Project, Track, TrackId};
use crate::sequencer::{ClipScheduler, LiveCapture, Transport, TransportState, quantize_clip};
use crate::synth::preset::PresetResolver;
use ringbuf::traits::Consumer;
use std::path::Path;
use std::sync::{Arc, Mutex};

/// MIDI CC 7 (channel volume), mapped to the master bus
const CC_VOLUME: u8 = 7;

pub struct Engine {
    project: Project,
    transport: Transport,
    rack: Arc<Mutex<ChannelRack>>,
    resolver: PresetResolver,
    capture: LiveCapture,
}

impl Engine {
    pub fn new(project: Project) -> Self {
        let mut transport = Transport::new(project.sample_rate);
        transport.set_tempo(project.tempo);
        transport.set_time_signature(project.time_signature);
        let rack = Arc::new(Mutex::new(ChannelRack::new(project.sample_rate)));

        Self {
            project,
            transport,
            rack,
            resolver: PresetResolver::builtin(),
            capture: LiveCapture::new(),
        }
    }

    /// The rack handle to hand to the audio callback
    pub fn rack(&self) -> Arc<Mutex<ChannelRack>> {
        Arc::clone(&self.rack)
    }

    pub fn project(&self) -> &Project {
        &self.project
    }

    pub fn project_mut(&mut self) -> &mut Project {
        &mut self.project
    }

    pub fn transport(&self) -> &Transport {
        &self.transport
    }

    pub fn resolver(&self) -> &PresetResolver {
        &self.resolver
    }

    pub fn resolver_mut(&mut self) -> &mut PresetResolver {
        &mut self.resolver
    }

    pub fn state(&self) -> TransportState {
        self.transport.state()
    }

    pub fn current_beat(&self) -> f64 {
        self.transport.current_beat()
    }

    // ---- Transport ----

    /// Arm every channel from the project and start the clock
    pub fn play(&mut self) {
        self.reschedule();
        self.transport.play();
    }

    /// Pause in place: voices release, armed events stay put for resume
    pub fn pause(&mut self) {
        self.transport.pause();
        if let Ok(mut rack) = self.rack.lock() {
            rack.release_all();
        }
    }

    /// Stop everything and rewind to the start
    pub fn stop(&mut self) {
        if self.capture.is_recording() {
            let beat = self.transport.current_beat();
            self.capture.stop_recording(&mut self.project, beat);
        }
        self.transport.stop();
        if let Ok(mut rack) = self.rack.lock() {
            rack.stop_all();
        }
    }

    pub fn seek(&mut self, beat: f64) {
        self.transport.seek(beat);
        let position = self.transport.position_samples();
        if let Ok(mut rack) = self.rack.lock() {
            rack.seek_all(position);
        }
    }

    /// Change tempo now. Beat readouts re-map immediately; armed events
    /// keep their times until the next schedule pass, which happens right
    /// away if the transport is running.
    pub fn set_tempo(&mut self, bpm: f64) {
        self.transport.set_tempo(bpm);
        self.project.tempo = self.transport.tempo().bpm();
        self.project.touch_modified();
        if self.transport.is_playing() {
            self.reschedule();
        }
    }

    pub fn set_loop(&mut self, start_beat: f64, end_beat: f64, enabled: bool) {
        self.transport.set_loop(start_beat, end_beat, enabled);
    }

    /// Re-arm all channels at the current position (after model edits)
    pub fn reschedule(&mut self) {
        let position = self.transport.position_samples();
        if let Ok(mut rack) = self.rack.lock() {
            let skip = self.capture.target_clip().and(self.armed_track_id());
            ClipScheduler::schedule_tracks(&self.project, &mut rack, &self.resolver, skip);
            rack.seek_all(position);
        }
    }

    // ---- Recording ----

    /// Begin capturing live input into a new clip on the armed track.
    /// Playback continues for every other track. Without an armed track
    /// this plays without recording.
    pub fn start_recording(&mut self) -> Option<ClipId> {
        let beat = self.transport.current_beat();
        let clip_id = self.capture.start_recording(&mut self.project, beat);
        if clip_id.is_some() {
            self.transport.record();
        } else {
            self.transport.play();
        }
        self.reschedule();
        clip_id
    }

    /// Finish the take; the new clip is armed for playback from now on
    pub fn stop_recording(&mut self) -> Option<ClipId> {
        let beat = self.transport.current_beat();
        let clip_id = self.capture.stop_recording(&mut self.project, beat);
        self.transport.end_record();
        self.reschedule();
        clip_id
    }

    pub fn is_recording(&self) -> bool {
        self.capture.is_recording()
    }

    // ---- Live input ----

    /// A note played right now, from any source (MIDI, UI keyboard)
    pub fn note_on(&mut self, pitch: u8, velocity: u8) {
        let beat = self.transport.current_beat();
        if let Ok(mut rack) = self.rack.lock() {
            self.capture.note_on(
                &self.project,
                &mut rack,
                &self.resolver,
                beat,
                pitch,
                velocity,
            );
        }
    }

    pub fn note_off(&mut self, pitch: u8) {
        let beat = self.transport.current_beat();
        if let Ok(mut rack) = self.rack.lock() {
            self.capture
                .note_off(&mut self.project, &mut rack, beat, pitch);
        }
    }

    /// Drain pending events from the input ringbuffer into the engine.
    /// Called from the control loop, typically once per tick.
    pub fn pump_live_input(&mut self, rx: &mut LiveEventConsumer) -> usize {
        let mut handled = 0;
        while let Some(event) = rx.try_pop() {
            match event {
                LiveEvent::NoteOn { pitch, velocity } => self.note_on(pitch, velocity),
                LiveEvent::NoteOff { pitch } => self.note_off(pitch),
                LiveEvent::Control { controller, value } => {
                    if controller == CC_VOLUME {
                        if let Ok(rack) = self.rack.lock() {
                            rack.master().set_gain(value as f32 / 127.0);
                        }
                    } else {
                        log::debug!("unmapped CC {} = {}", controller, value);
                    }
                }
            }
            handled += 1;
        }
        handled
    }

    // ---- Tracks ----

    pub fn add_track(&mut self, track: Track) -> TrackId {
        let track_id = track.id;
        self.project.tracks.push(track);
        self.project.touch_modified();
        track_id
    }

    /// Remove a track and its channel. Safe while playing.
    pub fn remove_track(&mut self, track_id: TrackId) {
        self.project.tracks.retain(|t| t.id != track_id);
        self.project.touch_modified();
        if let Ok(mut rack) = self.rack.lock() {
            rack.remove_channel(track_id);
        }
    }

    pub fn set_track_volume(&mut self, track_id: TrackId, volume: f32) {
        if let Some(track) = self.project.track_mut(track_id) {
            track.volume = volume.clamp(0.0, 1.0);
        }
        if let Ok(mut rack) = self.rack.lock() {
            rack.set_track_volume(track_id, volume);
        }
    }

    pub fn set_track_pan(&mut self, track_id: TrackId, pan: f32) {
        if let Some(track) = self.project.track_mut(track_id) {
            track.pan = pan.clamp(-1.0, 1.0);
        }
        if let Ok(mut rack) = self.rack.lock() {
            rack.set_track_pan(track_id, pan);
        }
    }

    pub fn set_track_muted(&mut self, track_id: TrackId, muted: bool) {
        if let Some(track) = self.project.track_mut(track_id) {
            track.muted = muted;
        }
        if self.transport.is_playing() {
            self.reschedule();
        } else if let Ok(mut rack) = self.rack.lock() {
            rack.set_track_muted(track_id, muted);
        }
    }

    /// Solo state changes audibility across the whole project, so the
    /// schedule is rebuilt when running
    pub fn set_track_solo(&mut self, track_id: TrackId, solo: bool) {
        if let Some(track) = self.project.track_mut(track_id) {
            track.solo = solo;
        }
        if self.transport.is_playing() {
            self.reschedule();
        }
    }

    pub fn set_track_armed(&mut self, track_id: TrackId, armed: bool) {
        for track in &mut self.project.tracks {
            track.armed = armed && track.id == track_id;
        }
    }

    /// Assign an instrument preset to a track. A repeated assignment of
    /// the current preset changes nothing; a failed build keeps the old
    /// instrument sounding.
    pub fn set_track_instrument(&mut self, track_id: TrackId, preset_id: &str) {
        let resolved = self.resolver.resolve(preset_id).id.clone();
        let already = self
            .project
            .track(track_id)
            .and_then(|t| t.preset_id())
            .map(|id| id == resolved)
            .unwrap_or(false);
        if already {
            return;
        }

        if let Ok(mut rack) = self.rack.lock() {
            match rack.set_track_instrument(track_id, &resolved, &self.resolver) {
                Ok(_) => {}
                Err(e) => {
                    log::warn!("instrument swap for track {:?} failed: {}", track_id, e);
                    return;
                }
            }
        }
        if let Some(track) = self.project.track_mut(track_id) {
            track.instrument = Some(crate::model::types::InstrumentSettings {
                preset_id: resolved,
            });
            self.project.touch_modified();
        }
    }

    // ---- Clip edits ----

    /// Snap a clip's notes to a grid and re-arm playback
    pub fn quantize(&mut self, clip_id: ClipId, division: f64) {
        if let Some(clip) = self.project.clip_mut(clip_id) {
            quantize_clip(clip, division);
            self.project.touch_modified();
        }
        if self.transport.is_playing() {
            self.reschedule();
        }
    }

    /// Insert externally produced notes (suggestions, arrangements) into a
    /// new clip on the given track. Out-of-range fields are clamped on the
    /// way in. Returns the new clip's id.
    pub fn import_notes(
        &mut self,
        track_id: TrackId,
        name: &str,
        start_beat: f64,
        duration_beats: f64,
        seeds: &[NoteSeed],
    ) -> Option<ClipId> {
        let track = self.project.track_mut(track_id)?;
        let mut clip =
            crate::model::types::Clip::new(track_id, name.to_string(), start_beat, duration_beats);
        for seed in seeds {
            clip.add_seed(*seed);
        }
        let clip_id = clip.id;
        track.clips.push(clip);
        self.project.touch_modified();
        if self.transport.is_playing() {
            self.reschedule();
        }
        Some(clip_id)
    }

    // ---- Persistence ----

    pub fn save(&self, path: &Path) -> Result<(), StoreError> {
        store::save_project(path, &self.project)
    }

    pub fn load(&mut self, path: &Path) -> Result<(), StoreError> {
        self.stop();
        let project = store::load_project(path)?;
        self.transport.set_tempo(project.tempo);
        self.transport.set_time_signature(project.time_signature);
        self.project = project;
        Ok(())
    }

    fn armed_track_id(&self) -> Option<TrackId> {
        self.project.armed_track().map(|t| t.id)
    }
}
