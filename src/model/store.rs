// Project store - the load/save persistence contract
// Full-tree JSON replace keyed by stable ids; the engine treats the format
// as opaque beyond this shape.

use crate::model::types::{Project, reserve_note_ids};
use std::path::Path;

/// Store error types
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Save a full project tree, replacing whatever was stored for its id
pub fn save_project<P: AsRef<Path>>(path: P, project: &Project) -> Result<(), StoreError> {
    let json = serde_json::to_string_pretty(project)?;
    std::fs::write(path, json)?;
    Ok(())
}

/// Load a full project tree (tracks -> clips -> notes)
///
/// Reserves the note-id space above the highest persisted id so notes
/// captured after loading get fresh ids.
pub fn load_project<P: AsRef<Path>>(path: P) -> Result<Project, StoreError> {
    let json = std::fs::read_to_string(path)?;
    let project: Project = serde_json::from_str(&json)?;

    let max_note_id = project
        .tracks
        .iter()
        .flat_map(|t| t.clips.iter())
        .flat_map(|c| c.notes().iter())
        .map(|n| n.id)
        .max()
        .unwrap_or(0);
    reserve_note_ids(max_note_id);

    Ok(project)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::types::{Clip, Note, Track, TrackType, generate_note_id};

    fn demo_project() -> Project {
        let mut project = Project::new("Roundtrip");
        project.tempo = 96.0;
        let mut track = Track::new("Keys", TrackType::Instrument).with_instrument("classic-poly");
        let mut clip = Clip::new(track.id, "Intro".to_string(), 0.0, 4.0);
        clip.add_note(Note::new(generate_note_id(), 60, 0.0, 1.0, 100));
        clip.add_note(Note::new(generate_note_id(), 64, 1.0, 0.5, 90));
        track.clips.push(clip);
        project.tracks.push(track);
        project
    }

    #[test]
    fn test_save_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("demo.json");

        let project = demo_project();
        save_project(&path, &project).unwrap();
        let loaded = load_project(&path).unwrap();

        assert_eq!(loaded.id, project.id);
        assert_eq!(loaded.tempo, 96.0);
        assert_eq!(loaded.tracks.len(), 1);
        assert_eq!(loaded.tracks[0].id, project.tracks[0].id);
        assert_eq!(loaded.tracks[0].clips[0].notes().len(), 2);
        assert_eq!(
            loaded.tracks[0].preset_id(),
            project.tracks[0].preset_id()
        );
    }

    #[test]
    fn test_load_reserves_note_ids() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("demo.json");

        let project = demo_project();
        let max_id = project.tracks[0].clips[0]
            .notes()
            .iter()
            .map(|n| n.id)
            .max()
            .unwrap();
        save_project(&path, &project).unwrap();
        load_project(&path).unwrap();

        assert!(generate_note_id() > max_id);
    }

    #[test]
    fn test_load_missing_file() {
        let err = load_project("/nonexistent/project.json");
        assert!(matches!(err, Err(StoreError::Io(_))));
    }
}
