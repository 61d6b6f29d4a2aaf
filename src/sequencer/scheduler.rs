// Clip scheduler - Turns persisted clips into sample-accurate trigger events
// Beat positions are fixed to absolute sample times at schedule time, so a
// later tempo change never moves events that are already armed

use crate::mixer::{ChannelRack, ScheduledEvent};
use crate::model::types::{Project, Track, TrackId};
use crate::sequencer::timeline::Tempo;
use crate::synth::preset::{DEFAULT_PRESET, PresetResolver};

/// Floor for a trigger's sounding time. Keeps very short notes audible
/// instead of collapsing into a click.
pub const MIN_EVENT_SECONDS: f64 = 0.05;

/// Stateless translator from the project's clips to per-channel schedules
pub struct ClipScheduler;

impl ClipScheduler {
    /// Compute the armed event list for one track at the current tempo
    pub fn events_for_track(track: &Track, tempo: Tempo, sample_rate: f64) -> Vec<ScheduledEvent> {
        let mut events = Vec::new();
        if !track.track_type.has_notes() {
            return events;
        }
        for clip in &track.clips {
            for note in clip.notes() {
                let absolute_beat = clip.start_beat + note.start_beat;
                let time_seconds = tempo.beats_to_seconds(absolute_beat);
                let duration_seconds = tempo
                    .beats_to_seconds(note.duration_beats)
                    .max(MIN_EVENT_SECONDS);
                events.push(ScheduledEvent {
                    pitch: note.pitch,
                    velocity: note.velocity,
                    start_sample: (time_seconds * sample_rate).round() as u64,
                    duration_samples: (duration_seconds * sample_rate).round() as u64,
                    time_seconds,
                });
            }
        }
        events
    }

    /// Whether a track should sound, given mute and solo state across the
    /// whole project. Any soloed track silences every non-soloed one.
    pub fn is_audible(track: &Track, any_solo: bool) -> bool {
        !track.muted && (!any_solo || track.solo)
    }

    /// Re-arm every channel from the project's clips.
    ///
    /// Creates missing channels, drops channels for deleted tracks, and
    /// replaces each channel's schedule. Inaudible tracks get an empty
    /// schedule. `skip` excludes one track (the live-capture target, whose
    /// notes already sounded on the way in). A channel that fails to build
    /// is skipped and logged; the rest of the project still plays.
    ///
    /// Returns the number of tracks that were scheduled.
    pub fn schedule_tracks(
        project: &Project,
        rack: &mut ChannelRack,
        resolver: &PresetResolver,
        skip: Option<TrackId>,
    ) -> usize {
        let live: Vec<TrackId> = project.tracks.iter().map(|t| t.id).collect();
        rack.retain_tracks(&live);

        let tempo = Tempo::new(project.tempo);
        let sample_rate = rack.sample_rate();
        let any_solo = project.tracks.iter().any(|t| t.solo);
        let mut scheduled = 0;

        for track in &project.tracks {
            if let Err(e) =
                rack.ensure_channel_with(track.id, track.track_type, track.preset_id(), resolver)
            {
                log::warn!("track '{}' channel build failed: {}", track.name, e);
                continue;
            }

            // An existing channel may carry a stale adapter (e.g. after a
            // project load); the channel always reflects the model's preset
            if track.track_type.has_notes() {
                let desired = track.preset_id().unwrap_or(DEFAULT_PRESET);
                if let Err(e) = rack.set_track_instrument(track.id, desired, resolver) {
                    log::warn!("track '{}' instrument swap failed: {}", track.name, e);
                    continue;
                }
            }

            let Some(channel) = rack.channel_mut(track.id) else {
                continue;
            };

            channel.set_gain(track.volume);
            channel.set_pan(track.pan);
            channel.set_muted(!Self::is_audible(track, any_solo));

            let record_target = skip == Some(track.id);
            let events = if record_target || !Self::is_audible(track, any_solo) {
                Vec::new()
            } else {
                Self::events_for_track(track, tempo, sample_rate)
            };
            channel.set_schedule(events);
            scheduled += 1;
        }

        log::debug!(
            "scheduled {} of {} tracks at {} BPM",
            scheduled,
            project.tracks.len(),
            tempo.bpm()
        );
        scheduled
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::types::{Clip, Note, TrackType, generate_note_id};

    const SR: f64 = 48000.0;

    fn track_with_note(start_beat: f64, duration_beats: f64) -> Track {
        let mut track = Track::new("Keys", TrackType::Instrument).with_instrument("classic-poly");
        let mut clip = Clip::new(track.id, "Riff".to_string(), 0.0, 4.0);
        clip.add_note(Note::new(
            generate_note_id(),
            60,
            start_beat,
            duration_beats,
            100,
        ));
        track.clips.push(clip);
        track
    }

    #[test]
    fn test_single_note_at_120_bpm() {
        // At 120 BPM, a 1-beat note at beat 0 sounds at t=0 for 0.5s
        let track = track_with_note(0.0, 1.0);
        let events = ClipScheduler::events_for_track(&track, Tempo::new(120.0), SR);

        assert_eq!(events.len(), 1);
        assert_eq!(events[0].start_sample, 0);
        assert_eq!(events[0].time_seconds, 0.0);
        assert_eq!(events[0].duration_samples, 24000);
    }

    #[test]
    fn test_clip_offset_shifts_events() {
        let mut track = track_with_note(1.0, 1.0);
        track.clips[0].start_beat = 2.0;
        let events = ClipScheduler::events_for_track(&track, Tempo::new(120.0), SR);

        // Beat 3 at 120 BPM = 1.5s
        assert_eq!(events[0].start_sample, 72000);
        assert!((events[0].time_seconds - 1.5).abs() < 1e-9);
    }

    #[test]
    fn test_minimum_event_duration() {
        let track = track_with_note(0.0, 0.001);
        let events = ClipScheduler::events_for_track(&track, Tempo::new(120.0), SR);
        assert_eq!(
            events[0].duration_samples,
            (MIN_EVENT_SECONDS * SR).round() as u64
        );
    }

    #[test]
    fn test_solo_silences_other_tracks() {
        let plain = track_with_note(0.0, 1.0);
        let mut soloed = track_with_note(0.0, 1.0);
        soloed.solo = true;

        assert!(ClipScheduler::is_audible(&soloed, true));
        assert!(!ClipScheduler::is_audible(&plain, true));
        assert!(ClipScheduler::is_audible(&plain, false));
    }

    #[test]
    fn test_schedule_tracks_channel_count_matches() {
        let mut project = Project::new("Demo");
        project.tracks.push(track_with_note(0.0, 1.0));
        project.tracks.push(track_with_note(1.0, 0.5));

        let mut rack = ChannelRack::new(SR);
        let resolver = PresetResolver::builtin();
        let scheduled = ClipScheduler::schedule_tracks(&project, &mut rack, &resolver, None);

        assert_eq!(scheduled, 2);
        assert_eq!(rack.channel_count(), project.tracks.len());

        // Removing a track drops its channel on the next pass
        project.tracks.pop();
        ClipScheduler::schedule_tracks(&project, &mut rack, &resolver, None);
        assert_eq!(rack.channel_count(), 1);
    }

    #[test]
    fn test_muted_track_gets_empty_schedule() {
        let mut project = Project::new("Demo");
        let mut track = track_with_note(0.0, 1.0);
        track.muted = true;
        let track_id = track.id;
        project.tracks.push(track);

        let mut rack = ChannelRack::new(SR);
        let resolver = PresetResolver::builtin();
        ClipScheduler::schedule_tracks(&project, &mut rack, &resolver, None);

        let channel = rack.channel(track_id).unwrap();
        assert!(channel.scheduled_events().is_empty());
        assert!(channel.is_muted());
    }

    #[test]
    fn test_schedule_reconciles_stale_channel_preset() {
        use crate::model::types::InstrumentSettings;

        let mut project = Project::new("Demo");
        let track = track_with_note(0.0, 1.0);
        let track_id = track.id;
        project.tracks.push(track);

        let mut rack = ChannelRack::new(SR);
        let resolver = PresetResolver::builtin();
        ClipScheduler::schedule_tracks(&project, &mut rack, &resolver, None);
        assert_eq!(
            rack.channel(track_id).unwrap().preset_id(),
            Some("classic-poly")
        );

        // The model changes out from under the live channel
        project.tracks[0].instrument = Some(InstrumentSettings {
            preset_id: "mono-lead".to_string(),
        });
        ClipScheduler::schedule_tracks(&project, &mut rack, &resolver, None);
        assert_eq!(
            rack.channel(track_id).unwrap().preset_id(),
            Some("mono-lead")
        );
    }

    #[test]
    fn test_record_target_not_scheduled() {
        let mut project = Project::new("Demo");
        let track = track_with_note(0.0, 1.0);
        let track_id = track.id;
        project.tracks.push(track);

        let mut rack = ChannelRack::new(SR);
        let resolver = PresetResolver::builtin();
        ClipScheduler::schedule_tracks(&project, &mut rack, &resolver, Some(track_id));

        // Channel exists for live input, but nothing is armed on it
        let channel = rack.channel(track_id).unwrap();
        assert!(channel.scheduled_events().is_empty());
    }

    #[test]
    fn test_tempo_change_only_affects_next_schedule() {
        let track = track_with_note(1.0, 1.0);

        let before = ClipScheduler::events_for_track(&track, Tempo::new(120.0), SR);
        let after = ClipScheduler::events_for_track(&track, Tempo::new(60.0), SR);

        // 120 BPM: beat 1 = 0.5s; 60 BPM: beat 1 = 1.0s
        assert_eq!(before[0].start_sample, 24000);
        assert_eq!(after[0].start_sample, 48000);
    }
}
