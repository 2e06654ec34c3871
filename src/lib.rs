//! voxhook - Voice connection event hooks
//!
//! This library provides the speaking state bitmask of the voice protocol
//! and a fault-isolating relay that forwards voice connection events to an
//! application listener.

pub mod network;
pub mod protocol;

pub use network::{ConnectionListener, ConnectionStatus, ListenerProxy, User};
pub use protocol::{SpeakingMode, SpeakingModes};
