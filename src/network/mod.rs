//! Network module for voice connection events
//!
//! Handles listener dispatch, connection status, and the audio send system.

mod error;
mod listener;
mod proxy;
mod send;
mod status;

pub use error::{FatalError, ListenerFailure, SendError};
pub use listener::{ConnectionListener, User};
pub use proxy::ListenerProxy;
pub use send::{
    AudioSendFactory, AudioSendSystem, DefaultSendFactory, DefaultSendSystem, PacketProvider,
    PacketSink, SendSystemConfig, OPUS_FRAME_MS,
};
pub use status::ConnectionStatus;
