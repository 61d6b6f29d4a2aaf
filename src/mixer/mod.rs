// Mixer - channels, the master bus, and lock-free parameter cells

pub mod channel;
pub mod master;
pub mod params;

pub use channel::{Channel, ChannelRack, ScheduledEvent};
pub use master::MasterBus;
pub use params::AtomicF32;
