//! Fault-isolating relay between a voice connection and its listener
//!
//! The connection's event thread talks to a [`ListenerProxy`]; the proxy
//! forwards to whatever listener the application registered last. Panics in
//! listener code are caught and logged so the event thread keeps running.
//! Panics carrying a [`FatalError`](super::FatalError) payload are logged
//! and re-raised.
//!
//! Contained panics still pass through the process panic hook, which by
//! default prints a `thread ... panicked at` line to stderr next to the
//! `error!` record. Hosts that only want the structured record can install
//! their own hook with [`std::panic::set_hook`].

use std::cell::Cell;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use arc_swap::ArcSwapOption;
use tracing::{debug, error};

use crate::protocol::{SpeakingMode, SpeakingModes};

use super::error::ListenerFailure;
use super::listener::{ConnectionListener, User};
use super::status::ConnectionStatus;

/// Sized cell content so the listener can live behind an atomic pointer
struct Registered(Arc<dyn ConnectionListener>);

/// Forwards connection events to at most one swappable listener
pub struct ListenerProxy {
    listener: ArcSwapOption<Registered>,
}

impl ListenerProxy {
    /// Create a proxy with no listener registered
    pub fn new() -> Self {
        Self {
            listener: ArcSwapOption::from(None),
        }
    }

    /// Replace the registered listener
    ///
    /// Safe to call from any thread while events are being dispatched. An
    /// event already in flight finishes with the listener it started with.
    pub fn set_listener(&self, listener: Option<Arc<dyn ConnectionListener>>) {
        debug!(
            "ConnectionListener {}",
            if listener.is_some() { "registered" } else { "cleared" }
        );
        self.listener.store(listener.map(|l| Arc::new(Registered(l))));
    }

    /// Get the registered listener
    pub fn listener(&self) -> Option<Arc<dyn ConnectionListener>> {
        self.current()
    }

    /// Check if a listener is registered
    pub fn has_listener(&self) -> bool {
        self.listener.load().is_some()
    }

    /// Single load of the listener cell for one event
    fn current(&self) -> Option<Arc<dyn ConnectionListener>> {
        let guard = self.listener.load();
        (*guard)
            .as_ref()
            .map(|registered| Arc::clone(&registered.0))
    }

    /// Run listener code, containing any non-fatal panic
    ///
    /// `stage` names the callback being executed; the closure advances it
    /// when it invokes several callbacks in sequence.
    fn dispatch<F>(stage: &Cell<&'static str>, args: &dyn fmt::Debug, f: F)
    where
        F: FnOnce(),
    {
        let Err(payload) = panic::catch_unwind(AssertUnwindSafe(f)) else {
            return;
        };

        let failure = ListenerFailure::from_payload(payload.as_ref());
        error!(
            callback = stage.get(),
            args = ?args,
            %failure,
            "The ConnectionListener encountered an uncaught panic"
        );

        if failure.is_fatal() {
            panic::resume_unwind(payload);
        }
    }
}

impl Default for ListenerProxy {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ListenerProxy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListenerProxy")
            .field("has_listener", &self.has_listener())
            .finish()
    }
}

impl ConnectionListener for ListenerProxy {
    fn on_ping(&self, ping_ms: u64) {
        let Some(listener) = self.current() else {
            return;
        };
        Self::dispatch(&Cell::new("on_ping"), &ping_ms, || {
            listener.on_ping(ping_ms)
        });
    }

    fn on_status_change(&self, status: ConnectionStatus) {
        let Some(listener) = self.current() else {
            return;
        };
        Self::dispatch(&Cell::new("on_status_change"), &status, || {
            listener.on_status_change(status)
        });
    }

    /// Forwards the full mode set, then the derived voice-only and
    /// voice/soundshare notifications, in that order.
    fn on_user_speaking_modes(&self, user: &User, modes: SpeakingModes) {
        let Some(listener) = self.current() else {
            return;
        };
        let speaking = modes.contains(SpeakingMode::Voice);
        let soundshare = modes.contains(SpeakingMode::Soundshare);

        let stage = Cell::new("on_user_speaking_modes");
        Self::dispatch(&stage, &(user, modes), || {
            listener.on_user_speaking_modes(user, modes);
            stage.set("on_user_speaking");
            listener.on_user_speaking(user, speaking);
            stage.set("on_user_speaking_with_soundshare");
            listener.on_user_speaking_with_soundshare(user, speaking, soundshare);
        });
    }
}
