// Data model - Project / Track / Clip / Note
// Persisted by the store module, mutated by UI actions and live capture

use crate::sequencer::timeline::TimeSignature;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use uuid::Uuid;

/// Unique identifier for notes
pub type NoteId = u64;

// Global note ID generator (atomic for thread-safety)
static NEXT_NOTE_ID: AtomicU64 = AtomicU64::new(1);

/// Generate a unique note ID
pub fn generate_note_id() -> NoteId {
    NEXT_NOTE_ID.fetch_add(1, Ordering::Relaxed)
}

/// Advance the note ID generator past ids seen in a loaded project, so
/// freshly captured notes never collide with persisted ones.
pub fn reserve_note_ids(max_seen: NoteId) {
    NEXT_NOTE_ID.fetch_max(max_seen + 1, Ordering::Relaxed);
}

/// Unique track identifier, stable across save/load
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TrackId(pub Uuid);

impl TrackId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for TrackId {
    fn default() -> Self {
        Self::new()
    }
}

/// Unique clip identifier, stable across save/load
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ClipId(pub Uuid);

impl ClipId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ClipId {
    fn default() -> Self {
        Self::new()
    }
}

/// Track type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TrackType {
    /// Plays back an audio region
    Audio,
    /// MIDI-like note clips routed to an instrument
    Midi,
    /// Note clips with an owned instrument preset
    Instrument,
}

impl TrackType {
    /// Whether tracks of this type carry note clips and a voice
    pub fn has_notes(&self) -> bool {
        matches!(self, TrackType::Midi | TrackType::Instrument)
    }
}

/// Instrument assignment for a track. The track's runtime channel must
/// always reflect the currently assigned preset id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstrumentSettings {
    pub preset_id: String,
}

/// A musical note inside a clip
///
/// Start and duration are expressed in beats relative to the owning clip's
/// start (0 = clip start), never the track timeline.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Note {
    pub id: NoteId,
    /// MIDI note number (0-127, where 60 = C4)
    pub pitch: u8,
    /// Start in beats relative to the clip start
    pub start_beat: f64,
    /// Duration in beats, always > 0
    pub duration_beats: f64,
    /// MIDI velocity (0-127)
    pub velocity: u8,
}

impl Note {
    pub fn new(id: NoteId, pitch: u8, start_beat: f64, duration_beats: f64, velocity: u8) -> Self {
        assert!(pitch <= 127, "MIDI pitch must be 0-127");
        assert!(velocity <= 127, "MIDI velocity must be 0-127");
        assert!(duration_beats > 0.0, "Note duration must be > 0");
        assert!(start_beat >= 0.0, "Note start must be >= 0");

        Self {
            id,
            pitch,
            start_beat,
            duration_beats,
            velocity,
        }
    }

    /// End of the note in clip-relative beats
    pub fn end_beat(&self) -> f64 {
        self.start_beat + self.duration_beats
    }
}

/// A flat note description as exchanged with external collaborators
/// (composition-assist suggestions, continuations, arrangements). Turned
/// into real [`Note`]s through the normal clip insertion path.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NoteSeed {
    pub pitch: u8,
    pub start_beat: f64,
    pub duration_beats: f64,
    pub velocity: u8,
}

/// A time-bounded container of notes (or an audio region) on a track
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Clip {
    pub id: ClipId,
    pub track_id: TrackId,
    pub name: String,
    /// Position on the track timeline, in beats
    pub start_beat: f64,
    pub duration_beats: f64,
    /// Notes in clip-relative beats, kept sorted by start for iteration
    notes: Vec<Note>,
    /// Source reference for audio clips; opaque to the engine
    pub audio_source: Option<String>,
}

impl Clip {
    pub fn new(track_id: TrackId, name: String, start_beat: f64, duration_beats: f64) -> Self {
        Self {
            id: ClipId::new(),
            track_id,
            name,
            start_beat,
            duration_beats,
            notes: Vec::new(),
            audio_source: None,
        }
    }

    pub fn notes(&self) -> &[Note] {
        &self.notes
    }

    pub fn notes_mut(&mut self) -> &mut Vec<Note> {
        &mut self.notes
    }

    /// Insert a note, keeping the list sorted by start beat
    pub fn add_note(&mut self, note: Note) {
        let insert_pos = self
            .notes
            .partition_point(|n| n.start_beat <= note.start_beat);
        self.notes.insert(insert_pos, note);
    }

    /// Build a note from an external seed and insert it
    pub fn add_seed(&mut self, seed: NoteSeed) -> NoteId {
        let id = generate_note_id();
        self.add_note(Note::new(
            id,
            seed.pitch.min(127),
            seed.start_beat.max(0.0),
            seed.duration_beats.max(1e-3),
            seed.velocity.min(127),
        ));
        id
    }

    pub fn remove_note(&mut self, note_id: NoteId) -> Option<Note> {
        let index = self.notes.iter().position(|n| n.id == note_id)?;
        Some(self.notes.remove(index))
    }

    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }

    /// Re-sort after in-place edits that may have reordered notes
    pub fn resort_notes(&mut self) {
        self.notes
            .sort_by(|a, b| a.start_beat.total_cmp(&b.start_beat));
    }
}

/// A track in the project. Owns its clips; at runtime it exclusively owns
/// one mixer channel, created lazily on first use.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Track {
    pub id: TrackId,
    pub name: String,
    pub track_type: TrackType,
    pub color: [u8; 3],
    /// Track volume (0.0 - 1.0)
    pub volume: f32,
    /// Track pan (-1.0 left, 0.0 center, 1.0 right)
    pub pan: f32,
    pub muted: bool,
    pub solo: bool,
    /// Record-enabled: live capture targets this track
    pub armed: bool,
    pub instrument: Option<InstrumentSettings>,
    pub clips: Vec<Clip>,
}

impl Track {
    pub fn new(name: &str, track_type: TrackType) -> Self {
        Self {
            id: TrackId::new(),
            name: name.to_string(),
            track_type,
            color: [100, 150, 200],
            volume: 0.8,
            pan: 0.0,
            muted: false,
            solo: false,
            armed: false,
            instrument: None,
            clips: Vec::new(),
        }
    }

    pub fn with_instrument(mut self, preset_id: &str) -> Self {
        self.instrument = Some(InstrumentSettings {
            preset_id: preset_id.to_string(),
        });
        self
    }

    pub fn preset_id(&self) -> Option<&str> {
        self.instrument.as_ref().map(|i| i.preset_id.as_str())
    }

    pub fn clip(&self, clip_id: ClipId) -> Option<&Clip> {
        self.clips.iter().find(|c| c.id == clip_id)
    }

    pub fn clip_mut(&mut self, clip_id: ClipId) -> Option<&mut Clip> {
        self.clips.iter_mut().find(|c| c.id == clip_id)
    }
}

/// Main project structure: tempo context plus the ordered track list
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    pub id: Uuid,
    pub name: String,
    /// Tempo in BPM; mutable at any time
    pub tempo: f64,
    pub time_signature: TimeSignature,
    pub sample_rate: f64,
    pub tracks: Vec<Track>,
    pub created: String,
    pub modified: String,
}

impl Project {
    pub fn new(name: &str) -> Self {
        let now = chrono::Utc::now().to_rfc3339();
        Self {
            id: Uuid::new_v4(),
            name: name.to_string(),
            tempo: 120.0,
            time_signature: TimeSignature::four_four(),
            sample_rate: 48000.0,
            tracks: Vec::new(),
            created: now.clone(),
            modified: now,
        }
    }

    pub fn track(&self, track_id: TrackId) -> Option<&Track> {
        self.tracks.iter().find(|t| t.id == track_id)
    }

    pub fn track_mut(&mut self, track_id: TrackId) -> Option<&mut Track> {
        self.tracks.iter_mut().find(|t| t.id == track_id)
    }

    /// The record-enabled track, if any
    pub fn armed_track(&self) -> Option<&Track> {
        self.tracks.iter().find(|t| t.armed)
    }

    /// Find the clip with the given id across all tracks
    pub fn clip_mut(&mut self, clip_id: ClipId) -> Option<&mut Clip> {
        self.tracks
            .iter_mut()
            .find_map(|t| t.clips.iter_mut().find(|c| c.id == clip_id))
    }

    pub fn touch_modified(&mut self) {
        self.modified = chrono::Utc::now().to_rfc3339();
    }
}

impl Default for Project {
    fn default() -> Self {
        Self::new("Untitled Project")
    }
}
