use groovecore::model::types::{Clip, Note, generate_note_id};
use groovecore::{AudioOutput, Engine, MidiInput, Project, Track, TrackType, create_live_channel};
use std::thread;
use std::time::{Duration, Instant};

// MIDI can burst ~1000 messages/second; 512 covers >500ms of backlog
const LIVE_RINGBUFFER_CAPACITY: usize = 512;

const DEMO_SECONDS: u64 = 16;

fn demo_project(sample_rate: f64) -> Project {
    let mut project = Project::new("Groovecore Demo");
    project.sample_rate = sample_rate;

    let mut keys = Track::new("Keys", TrackType::Instrument).with_instrument("warm-pad");
    let mut chords = Clip::new(keys.id, "Chords".to_string(), 0.0, 8.0);
    for (start, pitches) in [(0.0, [60u8, 64, 67]), (4.0, [57, 60, 65])] {
        for pitch in pitches {
            chords.add_note(Note::new(generate_note_id(), pitch, start, 3.5, 80));
        }
    }
    keys.clips.push(chords);
    project.tracks.push(keys);

    let mut bass = Track::new("Bass", TrackType::Instrument).with_instrument("pluck-bass");
    let mut line = Clip::new(bass.id, "Bassline".to_string(), 0.0, 8.0);
    for (start, pitch) in [(0.0, 36), (1.0, 36), (2.0, 43), (3.0, 41), (4.0, 33), (6.0, 40)] {
        line.add_note(Note::new(generate_note_id(), pitch, start, 0.75, 110));
    }
    bass.clips.push(line);
    project.tracks.push(bass);

    let mut lead = Track::new("Lead", TrackType::Instrument).with_instrument("mono-lead");
    lead.armed = true;
    project.tracks.push(lead);

    project
}

fn main() {
    env_logger::init();

    println!("=== groovecore ===\n");

    let sample_rate = groovecore::audio::preferred_sample_rate().unwrap_or(48000.0);
    let mut engine = Engine::new(demo_project(sample_rate));

    let _audio = match AudioOutput::start(engine.rack(), engine.transport().shared_state()) {
        Ok(output) => {
            println!(
                "Audio: {} Hz, {} channels",
                output.sample_rate(),
                output.channels()
            );
            Some(output)
        }
        Err(e) => {
            eprintln!("No audio output ({}), running silent", e);
            None
        }
    };

    let (live_tx, mut live_rx) = create_live_channel(LIVE_RINGBUFFER_CAPACITY);
    let _midi = match MidiInput::connect(live_tx) {
        Ok(input) => {
            match input.port_name() {
                Some(name) => println!("MIDI: {}", name),
                None => println!("MIDI: no port, play on the armed track via API"),
            }
            Some(input)
        }
        Err(e) => {
            eprintln!("MIDI unavailable: {}", e);
            None
        }
    };

    engine.set_loop(0.0, 8.0, true);
    engine.play();
    println!(
        "Playing {} tracks at {} BPM, looping bars 1-2\n",
        engine.project().tracks.len(),
        engine.project().tempo
    );

    let started = Instant::now();
    let mut last_printed = -1i64;
    while started.elapsed() < Duration::from_secs(DEMO_SECONDS) {
        engine.pump_live_input(&mut live_rx);

        let beat = engine.current_beat().floor() as i64;
        if beat != last_printed {
            println!("beat {:>3}", beat + 1);
            last_printed = beat;
        }
        thread::sleep(Duration::from_millis(10));
    }

    engine.stop();
    println!("\nStopped.");
}
