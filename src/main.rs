//! voxhook - Voice connection event hooks

use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;

use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use serde_json::json;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use voxhook::network::{
    AudioSendFactory, ConnectionListener, ConnectionStatus, DefaultSendFactory, ListenerProxy,
    PacketProvider, PacketSink, SendError, SendSystemConfig, User, OPUS_FRAME_MS,
};
use voxhook::protocol::{SpeakingMode, SpeakingModes};

#[derive(Parser)]
#[command(name = "voxhook")]
#[command(about = "Voice connection event hooks and speaking state tools")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Decode a raw speaking bitmask
    Decode {
        /// Raw mask as sent by the voice server
        #[arg(allow_negative_numbers = true)]
        mask: i32,

        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Encode speaking modes into a raw bitmask
    Encode {
        /// Modes to set (voice, soundshare, priority)
        modes: Vec<SpeakingMode>,
    },

    /// Replay a scripted connection through the listener proxy
    Simulate {
        /// Register a listener that panics on every ping
        #[arg(long)]
        faulty: bool,

        /// Name of the simulated speaking user
        #[arg(long, default_value = "Alice")]
        user: String,
    },

    /// Run the default send system against a demo provider
    Send {
        /// Number of frames to run for
        #[arg(long, default_value = "50")]
        frames: u32,

        /// Frame duration in milliseconds
        #[arg(long, env = "VOXHOOK_FRAME_MS", default_value_t = OPUS_FRAME_MS)]
        frame_ms: u64,
    },
}

fn setup_logging(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::INFO };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("Failed to set tracing subscriber");
}

fn run_decode(mask: i32, as_json: bool) -> Result<()> {
    let modes = SpeakingModes::from_raw(mask);
    let speaking = modes.contains(SpeakingMode::Voice);
    let soundshare = modes.contains(SpeakingMode::Soundshare);

    if as_json {
        let output = json!({
            "mask": mask,
            "modes": modes.iter().collect::<Vec<_>>(),
            "speaking": speaking,
            "soundshare": soundshare,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        println!("Mask:       {} (known bits {:#05b})", mask, modes.raw());
        println!("Modes:      {}", modes);
        println!("Speaking:   {}", speaking);
        println!("Soundshare: {}", soundshare);
    }
    Ok(())
}

fn run_encode(modes: Vec<SpeakingMode>) {
    let mask = SpeakingModes::encode(modes.as_slice());
    println!("{}", mask);
}

/// Listener that logs every callback
struct LoggingListener;

impl ConnectionListener for LoggingListener {
    fn on_ping(&self, ping_ms: u64) {
        info!("Ping: {}ms", ping_ms);
    }

    fn on_status_change(&self, status: ConnectionStatus) {
        info!(
            "Status: {}{}",
            status,
            if status.should_reconnect() {
                " (reconnecting)"
            } else {
                ""
            }
        );
    }

    fn on_user_speaking_modes(&self, user: &User, modes: SpeakingModes) {
        info!("{} modes: {}", user, modes);
    }

    fn on_user_speaking(&self, user: &User, speaking: bool) {
        info!("{} speaking: {}", user, speaking);
    }

    fn on_user_speaking_with_soundshare(&self, user: &User, speaking: bool, soundshare: bool) {
        info!(
            "{} speaking: {}, soundshare: {}",
            user, speaking, soundshare
        );
    }
}

/// Listener with a bug in its ping handler
struct FaultyListener;

impl ConnectionListener for FaultyListener {
    fn on_ping(&self, ping_ms: u64) {
        panic!("ping handler cannot handle {}ms", ping_ms);
    }

    fn on_status_change(&self, status: ConnectionStatus) {
        info!("Status: {}", status);
    }
}

fn run_simulate(faulty: bool, user_name: String) {
    let proxy = ListenerProxy::new();

    // Events before registration go nowhere
    proxy.on_status_change(ConnectionStatus::ConnectingAwaitingEndpoint);

    let listener: Arc<dyn ConnectionListener> = if faulty {
        Arc::new(FaultyListener)
    } else {
        Arc::new(LoggingListener)
    };
    proxy.set_listener(Some(listener));

    let user = User::new(1, user_name);
    for status in [
        ConnectionStatus::ConnectingAwaitingWebsocketConnect,
        ConnectionStatus::ConnectingAwaitingAuthentication,
        ConnectionStatus::ConnectingAttemptingUdpDiscovery,
        ConnectionStatus::ConnectingAwaitingReady,
        ConnectionStatus::Connected,
    ] {
        proxy.on_status_change(status);
    }

    for (ping, mask) in [(38, 1), (41, 3), (40, 0), (44, 5)] {
        proxy.on_ping(ping);
        proxy.on_user_speaking_modes(&user, SpeakingModes::from_raw(mask));
    }

    proxy.on_status_change(ConnectionStatus::ErrorLostConnection);
    proxy.on_status_change(ConnectionStatus::ShuttingDown);
    println!("Simulation finished; the connection thread survived every callback");
}

/// Sink that counts packets
#[derive(Default)]
struct CountingSink {
    packets: AtomicU64,
    bytes: AtomicU64,
}

impl PacketSink for CountingSink {
    fn send(&self, packet: &[u8]) -> Result<(), SendError> {
        self.packets.fetch_add(1, Ordering::Relaxed);
        self.bytes.fetch_add(packet.len() as u64, Ordering::Relaxed);
        Ok(())
    }
}

/// Provider emitting silence-sized frames with a pause every tenth frame
struct DemoProvider {
    sink: Arc<CountingSink>,
    frame: AtomicU32,
    talking_changes: AtomicU32,
}

impl PacketProvider for DemoProvider {
    fn identifier(&self) -> String {
        "demo".to_string()
    }

    fn sink(&self) -> Arc<dyn PacketSink> {
        self.sink.clone()
    }

    fn next_packet(&self, changed_talking: bool) -> Option<Vec<u8>> {
        if changed_talking {
            self.talking_changes.fetch_add(1, Ordering::Relaxed);
        }
        let frame = self.frame.fetch_add(1, Ordering::Relaxed);
        if frame % 10 == 9 {
            return None;
        }
        Some(vec![0xF8, 0xFF, 0xFE])
    }

    fn on_connection_lost(&self) {
        warn!("Demo connection lost");
    }
}

async fn run_send(frames: u32, frame_ms: u64) -> Result<()> {
    let config = SendSystemConfig {
        frame_duration_ms: frame_ms,
    };
    config.validate().map_err(|e| anyhow!(e))?;

    let sink = Arc::new(CountingSink::default());
    let provider = Arc::new(DemoProvider {
        sink: sink.clone(),
        frame: AtomicU32::new(0),
        talking_changes: AtomicU32::new(0),
    });

    let factory = DefaultSendFactory::new(config.clone());
    let mut system = factory.create_send_system(provider.clone());
    system.start()?;

    tokio::time::sleep(config.frame_duration() * frames).await;
    system.shutdown();

    println!(
        "Sent {} packets ({} bytes) over {} frames, {} talking changes",
        sink.packets.load(Ordering::Relaxed),
        sink.bytes.load(Ordering::Relaxed),
        provider.frame.load(Ordering::Relaxed),
        provider.talking_changes.load(Ordering::Relaxed)
    );
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose);

    match cli.command {
        Commands::Decode { mask, json } => run_decode(mask, json)?,
        Commands::Encode { modes } => run_encode(modes),
        Commands::Simulate { faulty, user } => run_simulate(faulty, user),
        Commands::Send { frames, frame_ms } => run_send(frames, frame_ms).await?,
    }

    Ok(())
}
