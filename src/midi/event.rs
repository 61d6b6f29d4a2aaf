// MIDI event parsing

use crate::messaging::LiveEvent;

/// Parse a raw MIDI message into a live event.
/// The channel nibble is ignored; Note On with velocity 0 is a Note Off.
pub fn parse_midi_bytes(bytes: &[u8]) -> Option<LiveEvent> {
    if bytes.is_empty() {
        return None;
    }

    let message_type = bytes[0] & 0xF0;
    match message_type {
        0x90 => {
            if bytes.len() >= 3 {
                let pitch = bytes[1];
                let velocity = bytes[2];
                if velocity == 0 {
                    Some(LiveEvent::NoteOff { pitch })
                } else {
                    Some(LiveEvent::NoteOn { pitch, velocity })
                }
            } else {
                None
            }
        }
        0x80 => {
            if bytes.len() >= 3 {
                Some(LiveEvent::NoteOff { pitch: bytes[1] })
            } else {
                None
            }
        }
        0xB0 => {
            if bytes.len() >= 3 {
                Some(LiveEvent::Control {
                    controller: bytes[1],
                    value: bytes[2],
                })
            } else {
                None
            }
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_note_on() {
        assert_eq!(
            parse_midi_bytes(&[0x90, 60, 100]),
            Some(LiveEvent::NoteOn {
                pitch: 60,
                velocity: 100
            })
        );
    }

    #[test]
    fn test_note_off_explicit() {
        assert_eq!(
            parse_midi_bytes(&[0x80, 60, 64]),
            Some(LiveEvent::NoteOff { pitch: 60 })
        );
    }

    #[test]
    fn test_note_on_velocity_zero_is_off() {
        assert_eq!(
            parse_midi_bytes(&[0x90, 64, 0]),
            Some(LiveEvent::NoteOff { pitch: 64 })
        );
    }

    #[test]
    fn test_control_change() {
        assert_eq!(
            parse_midi_bytes(&[0xB0, 7, 127]),
            Some(LiveEvent::Control {
                controller: 7,
                value: 127
            })
        );
    }

    #[test]
    fn test_channel_nibble_ignored() {
        assert_eq!(
            parse_midi_bytes(&[0x9F, 60, 100]),
            parse_midi_bytes(&[0x90, 60, 100])
        );
    }

    #[test]
    fn test_invalid_messages() {
        assert!(parse_midi_bytes(&[]).is_none());
        assert!(parse_midi_bytes(&[0x90, 60]).is_none());
        assert!(parse_midi_bytes(&[0xF0, 0x00, 0x00]).is_none());
    }
}
