//! Connection listener interface

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::protocol::SpeakingModes;

use super::status::ConnectionStatus;

/// A user whose voice activity is reported by the connection
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct User {
    /// Snowflake id
    pub id: u64,
    /// Display name
    pub name: String,
}

impl User {
    pub fn new(id: u64, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }
}

impl fmt::Display for User {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.id)
    }
}

/// Receives lifecycle and voice-activity events of a voice connection
///
/// Callbacks run synchronously on the connection's event thread and should
/// return quickly.
pub trait ConnectionListener: Send + Sync {
    /// Called when a heartbeat round-trip completes
    fn on_ping(&self, ping_ms: u64);

    /// Called when the connection moves to a new status
    fn on_status_change(&self, status: ConnectionStatus);

    /// Called when a user's speaking modes change
    fn on_user_speaking_modes(&self, _user: &User, _modes: SpeakingModes) {}

    /// Called when a user starts or stops speaking with voice
    ///
    /// Derived from [`Self::on_user_speaking_modes`]; fires after it.
    fn on_user_speaking(&self, _user: &User, _speaking: bool) {}

    /// Called when a user's voice or soundshare state changes
    ///
    /// Priority speaking is not reflected here.
    fn on_user_speaking_with_soundshare(&self, _user: &User, _speaking: bool, _soundshare: bool) {}
}
