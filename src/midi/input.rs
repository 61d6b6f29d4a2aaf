// MIDI input - Hardware note entry
// Connects to the first available port; events land in the live ringbuffer

use crate::messaging::LiveEventProducer;
use crate::midi::event::parse_midi_bytes;
use midir::{MidiInput as MidirInput, MidiInputConnection};
use ringbuf::traits::Producer;

/// Errors while opening a MIDI input
#[derive(Debug, thiserror::Error)]
pub enum MidiError {
    #[error("MIDI init failed: {0}")]
    Init(#[from] midir::InitError),
    #[error("MIDI connect failed: {0}")]
    Connect(String),
}

/// An open MIDI input feeding the live event channel.
/// Dropping this closes the connection.
pub struct MidiInput {
    _connection: Option<MidiInputConnection<()>>,
    port_name: Option<String>,
}

impl MidiInput {
    /// Connect to the first available MIDI port. No ports is not an error;
    /// the engine keeps running without hardware input.
    pub fn connect(mut live_tx: LiveEventProducer) -> Result<Self, MidiError> {
        let midi_in = MidirInput::new("groovecore midi input")?;

        let ports = midi_in.ports();
        let Some(port) = ports.first() else {
            log::info!("no MIDI port detected, running without hardware input");
            return Ok(Self {
                _connection: None,
                port_name: None,
            });
        };

        let port_name = midi_in
            .port_name(port)
            .unwrap_or_else(|_| "unknown".to_string());
        log::info!("connecting to MIDI port '{}'", port_name);

        let connection = midi_in
            .connect(
                port,
                "groovecore-input",
                move |_timestamp, message, _| {
                    // Runs on the MIDI driver's thread; only push, never block
                    if let Some(event) = parse_midi_bytes(message) {
                        if live_tx.try_push(event).is_err() {
                            log::warn!("live event buffer full, MIDI event dropped");
                        }
                    }
                },
                (),
            )
            .map_err(|e| MidiError::Connect(e.to_string()))?;

        Ok(Self {
            _connection: Some(connection),
            port_name: Some(port_name),
        })
    }

    pub fn is_connected(&self) -> bool {
        self._connection.is_some()
    }

    pub fn port_name(&self) -> Option<&str> {
        self.port_name.as_deref()
    }
}
