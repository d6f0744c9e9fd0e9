//! Minimal transport-neutral contract for streaming one assistant response.
//!
//! This crate defines only the session lifecycle types shared between the
//! engine and its transports. It excludes wire framing, HTTP details, and
//! section classification.

use std::fmt;
use std::sync::{atomic::AtomicBool, Arc};

use serde_json::Value;

/// Identifier for one streaming session (one network attempt).
pub type SessionId = u64;

/// Shared cancellation flag for a session.
pub type CancelSignal = Arc<AtomicBool>;

/// Message surfaced for connection-level failures that carry no server text.
pub const GENERIC_RETRY_MESSAGE: &str = "Could not reach the assistant. Please try again.";

/// Cache/addressing key for one independent streamed result.
///
/// Slots are opaque: a hint level (`"1"`..`"4"`) and a panel identity
/// (`"review"`) are both just keys.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SlotKey(String);

impl SlotKey {
    #[must_use]
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SlotKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SlotKey {
    fn from(key: &str) -> Self {
        Self::new(key)
    }
}

impl From<String> for SlotKey {
    fn from(key: String) -> Self {
        Self(key)
    }
}

impl From<u8> for SlotKey {
    fn from(key: u8) -> Self {
        Self(key.to_string())
    }
}

impl From<u32> for SlotKey {
    fn from(key: u32) -> Self {
        Self(key.to_string())
    }
}

/// Error returned while constructing a transport before any session starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportInitError {
    message: String,
}

impl TransportInitError {
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for TransportInitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for TransportInitError {}

impl From<String> for TransportInitError {
    fn from(message: String) -> Self {
        Self::new(message)
    }
}

impl From<&str> for TransportInitError {
    fn from(message: &str) -> Self {
        Self::new(message)
    }
}

/// Input required to open one streaming session.
#[derive(Debug, Clone, PartialEq)]
pub struct StreamRequest {
    pub session_id: SessionId,
    pub slot: SlotKey,
    pub payload: Value,
}

/// Where a failure originated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Connection or setup failure before the stream delivered anything usable.
    Transport,
    /// Structured error frame inside an otherwise successful stream.
    Stream,
}

/// Terminal failure reported by a transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportFailure {
    pub kind: FailureKind,
    pub message: String,
}

impl TransportFailure {
    #[must_use]
    pub fn transport(message: impl Into<String>) -> Self {
        Self {
            kind: FailureKind::Transport,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn stream(message: impl Into<String>) -> Self {
        Self {
            kind: FailureKind::Stream,
            message: message.into(),
        }
    }
}

/// Transport-emitted lifecycle event, tagged with its originating session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    Content {
        session_id: SessionId,
        text: String,
    },
    Terminal {
        session_id: SessionId,
    },
    Failed {
        session_id: SessionId,
        failure: TransportFailure,
    },
    Aborted {
        session_id: SessionId,
    },
}

impl TransportEvent {
    /// Returns the session identifier associated with this event.
    #[must_use]
    pub fn session_id(&self) -> SessionId {
        match self {
            Self::Content { session_id, .. }
            | Self::Terminal { session_id }
            | Self::Failed { session_id, .. }
            | Self::Aborted { session_id } => *session_id,
        }
    }

    /// Returns true when this event ends the session lifecycle.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Content { .. })
    }
}

/// Immutable metadata describing a transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportProfile {
    pub transport_id: String,
    pub endpoint: String,
}

/// Transport interface for streaming one session.
pub trait StreamTransport: Send + Sync + 'static {
    /// Returns transport identity metadata.
    fn profile(&self) -> TransportProfile;

    /// Opens the stream and emits lifecycle events in arrival order.
    ///
    /// Implementations run on a worker thread, must poll `cancel` between
    /// chunks, and should emit exactly one terminal event. Returning `Err`
    /// before a terminal event is reported as a transport failure.
    fn open(
        &self,
        req: StreamRequest,
        cancel: CancelSignal,
        emit: &mut dyn FnMut(TransportEvent),
    ) -> Result<(), String>;
}
