//! Network error types

use std::any::Any;
use std::panic;

use thiserror::Error;

/// Errors that can occur while sending audio packets
#[derive(Error, Debug)]
pub enum SendError {
    #[error("No tokio runtime available to drive the send loop")]
    NoRuntime,

    #[error("Invalid send system config: {0}")]
    InvalidConfig(String),

    #[error("Send system already running")]
    AlreadyRunning,

    #[error("No route to host")]
    NoRoute,

    #[error("Packet sink closed")]
    Closed,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Packet rejected: {0}")]
    Rejected(String),
}

/// Panic payload marking an unrecoverable condition
///
/// Listener panics are normally contained by the listener proxy. A panic
/// carrying this payload is logged and then re-raised instead.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{reason}")]
pub struct FatalError {
    reason: String,
}

impl FatalError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }

    pub fn reason(&self) -> &str {
        &self.reason
    }

    /// Unwind with a fatal payload
    pub fn raise(reason: impl Into<String>) -> ! {
        panic::panic_any(Self::new(reason))
    }
}

/// A panic caught at the listener boundary
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ListenerFailure {
    #[error("fatal: {0}")]
    Fatal(String),

    #[error("{0}")]
    Panic(String),
}

impl ListenerFailure {
    /// Classify a panic payload returned by `catch_unwind`
    pub fn from_payload(payload: &(dyn Any + Send)) -> Self {
        if let Some(fatal) = payload.downcast_ref::<FatalError>() {
            return Self::Fatal(fatal.reason().to_string());
        }

        let message = if let Some(s) = payload.downcast_ref::<&'static str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "non-string panic payload".to_string()
        };
        Self::Panic(message)
    }

    /// Whether the failure must escalate instead of being contained
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Fatal(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catch<F: FnOnce() + panic::UnwindSafe>(f: F) -> ListenerFailure {
        let payload = panic::catch_unwind(f).expect_err("closure should panic");
        ListenerFailure::from_payload(payload.as_ref())
    }

    #[test]
    fn test_classify_str_panic() {
        let failure = catch(|| panic!("boom"));
        assert_eq!(failure, ListenerFailure::Panic("boom".to_string()));
        assert!(!failure.is_fatal());
    }

    #[test]
    fn test_classify_formatted_panic() {
        let failure = catch(|| panic!("bad value {}", 3));
        assert_eq!(failure, ListenerFailure::Panic("bad value 3".to_string()));
    }

    #[test]
    fn test_classify_fatal() {
        let failure = catch(|| FatalError::raise("out of file descriptors"));
        assert!(failure.is_fatal());
        assert_eq!(failure.to_string(), "fatal: out of file descriptors");
    }

    #[test]
    fn test_classify_opaque_payload() {
        let failure = catch(|| panic::panic_any(17u32));
        assert_eq!(
            failure,
            ListenerFailure::Panic("non-string panic payload".to_string())
        );
    }
}
