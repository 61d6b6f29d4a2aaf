// Quantizer - Snaps recorded notes to a beat grid
// Pure model edit; rescheduling picks the change up on the next play

use crate::model::types::Clip;

/// Snap a beat position to the nearest multiple of `division`
fn snap(beats: f64, division: f64) -> f64 {
    (beats / division).round() * division
}

/// Quantize every note in a clip to the given grid (in beats, e.g. 0.25
/// for 16ths at 4/4).
///
/// Starts snap to the nearest grid line; durations snap too but never
/// below one division, so no note collapses to nothing. Non-positive
/// divisions and empty clips are no-ops. Applying the same division twice
/// changes nothing.
pub fn quantize_clip(clip: &mut Clip, division: f64) {
    if division <= 0.0 || clip.is_empty() {
        return;
    }
    for note in clip.notes_mut() {
        note.start_beat = snap(note.start_beat, division).max(0.0);
        note.duration_beats = snap(note.duration_beats, division).max(division);
    }
    clip.resort_notes();
}
