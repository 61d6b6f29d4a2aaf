// Data model and persistence contract

pub mod store;
pub mod types;

pub use store::{StoreError, load_project, save_project};
pub use types::{
    Clip, ClipId, InstrumentSettings, Note, NoteId, NoteSeed, Project, Track, TrackId, TrackType,
    generate_note_id,
};
