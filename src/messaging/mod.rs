// Messaging - Lock-free channel between input callbacks and the engine
// The MIDI callback runs on its own thread; events cross over a ringbuffer
// and are drained by the control loop, never inside the audio callback

use ringbuf::{HeapRb, traits::Split};

/// A performance event on its way into the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LiveEvent {
    NoteOn { pitch: u8, velocity: u8 },
    NoteOff { pitch: u8 },
    Control { controller: u8, value: u8 },
}

pub type LiveEventProducer = ringbuf::HeapProd<LiveEvent>;
pub type LiveEventConsumer = ringbuf::HeapCons<LiveEvent>;

pub fn create_live_channel(capacity: usize) -> (LiveEventProducer, LiveEventConsumer) {
    let rb = HeapRb::<LiveEvent>::new(capacity);
    rb.split()
}
