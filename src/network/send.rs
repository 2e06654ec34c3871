//! Audio send system and its factory
//!
//! A send system pulls ready-made audio packets from a [`PacketProvider`]
//! once per frame and hands them to the provider's [`PacketSink`]. Packet
//! construction and socket handling stay with the provider.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, trace, warn};

use super::error::SendError;

/// Duration of one Opus frame in milliseconds
pub const OPUS_FRAME_MS: u64 = 20;

/// Destination for encoded audio packets
pub trait PacketSink: Send + Sync {
    /// Deliver one packet
    ///
    /// Return [`SendError::NoRoute`] when the remote became unreachable and
    /// [`SendError::Closed`] when no more packets can ever be sent.
    fn send(&self, packet: &[u8]) -> Result<(), SendError>;
}

/// Source of encoded audio packets for a connection
pub trait PacketProvider: Send + Sync {
    /// Name of the connection, used in logs
    fn identifier(&self) -> String;

    /// Where packets from this provider are sent
    fn sink(&self) -> Arc<dyn PacketSink>;

    /// Next packet to send, or `None` if there is nothing this frame
    ///
    /// `changed_talking` is true when the previous frame produced no packet,
    /// so the provider can update the speaking state before resuming.
    fn next_packet(&self, changed_talking: bool) -> Option<Vec<u8>>;

    /// Called when the sink reports the remote as unreachable
    fn on_connection_lost(&self);
}

/// Drives packets from a provider to its sink
pub trait AudioSendSystem: Send {
    /// Begin sending
    fn start(&mut self) -> Result<(), SendError>;

    /// Stop sending and release the send task
    fn shutdown(&mut self);

    /// Check if the send loop is active
    fn is_running(&self) -> bool;
}

/// Creates a send system for each new connection
pub trait AudioSendFactory: Send + Sync {
    fn create_send_system(&self, provider: Arc<dyn PacketProvider>) -> Box<dyn AudioSendSystem>;
}

/// Send system configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SendSystemConfig {
    /// Time between packets in milliseconds. Valid values: 1-120
    pub frame_duration_ms: u64,
}

impl Default for SendSystemConfig {
    fn default() -> Self {
        Self {
            frame_duration_ms: OPUS_FRAME_MS,
        }
    }
}

impl SendSystemConfig {
    /// Validate the configuration values
    ///
    /// Returns an error message if any value is invalid.
    pub fn validate(&self) -> Result<(), String> {
        if !(1..=120).contains(&self.frame_duration_ms) {
            return Err(format!(
                "Invalid frame duration: {}ms. Valid values are 1-120",
                self.frame_duration_ms
            ));
        }
        Ok(())
    }

    pub fn frame_duration(&self) -> Duration {
        Duration::from_millis(self.frame_duration_ms)
    }
}

/// Factory producing [`DefaultSendSystem`]s
#[derive(Debug, Clone, Default)]
pub struct DefaultSendFactory {
    config: SendSystemConfig,
}

impl DefaultSendFactory {
    pub fn new(config: SendSystemConfig) -> Self {
        Self { config }
    }
}

impl AudioSendFactory for DefaultSendFactory {
    fn create_send_system(&self, provider: Arc<dyn PacketProvider>) -> Box<dyn AudioSendSystem> {
        Box::new(DefaultSendSystem::new(provider, self.config.clone()))
    }
}

/// Frame-paced send loop running as a tokio task
pub struct DefaultSendSystem {
    provider: Arc<dyn PacketProvider>,
    config: SendSystemConfig,
    running: Arc<AtomicBool>,
    send_handle: Option<JoinHandle<()>>,
}

impl DefaultSendSystem {
    pub fn new(provider: Arc<dyn PacketProvider>, config: SendSystemConfig) -> Self {
        Self {
            provider,
            config,
            running: Arc::new(AtomicBool::new(false)),
            send_handle: None,
        }
    }

    pub fn config(&self) -> &SendSystemConfig {
        &self.config
    }
}

impl AudioSendSystem for DefaultSendSystem {
    /// Spawn the send loop on the current tokio runtime
    fn start(&mut self) -> Result<(), SendError> {
        if self.is_running() {
            return Err(SendError::AlreadyRunning);
        }
        self.config.validate().map_err(SendError::InvalidConfig)?;
        let runtime = Handle::try_current().map_err(|_| SendError::NoRuntime)?;

        if let Some(handle) = self.send_handle.take() {
            handle.abort();
        }

        // Each run gets its own flag so a stale task can never clear a newer one
        let running = Arc::new(AtomicBool::new(true));
        self.running = running.clone();
        let provider = self.provider.clone();
        let frame = self.config.frame_duration();

        info!(
            "Starting audio send system for {} ({}ms frames)",
            provider.identifier(),
            self.config.frame_duration_ms
        );
        self.send_handle = Some(runtime.spawn(send_loop(provider, running, frame)));
        Ok(())
    }

    fn shutdown(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.send_handle.take() {
            handle.abort();
            info!(
                "Audio send system for {} shut down",
                self.provider.identifier()
            );
        }
    }

    fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}

impl Drop for DefaultSendSystem {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Clears the running flag when the send task ends, panics or is aborted
struct ClearOnDrop(Arc<AtomicBool>);

impl Drop for ClearOnDrop {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

async fn send_loop(provider: Arc<dyn PacketProvider>, running: Arc<AtomicBool>, frame: Duration) {
    let _clear = ClearOnDrop(running.clone());
    let sink = provider.sink();
    let mut ticker = interval(frame);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut changed_talking = false;

    while running.load(Ordering::SeqCst) {
        ticker.tick().await;

        let packet = provider.next_packet(changed_talking);
        changed_talking = packet.is_none();
        let Some(packet) = packet else {
            continue;
        };

        match sink.send(&packet) {
            Ok(()) => trace!("Sent {} byte audio packet", packet.len()),
            Err(SendError::NoRoute) => {
                warn!("No route to host for {}", provider.identifier());
                provider.on_connection_lost();
            }
            Err(SendError::Closed) => {
                debug!("Packet sink for {} closed", provider.identifier());
                break;
            }
            Err(e) => warn!("Failed to send audio packet: {}", e),
        }
    }
}
