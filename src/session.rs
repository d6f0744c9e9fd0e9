//! One network attempt against one slot.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use assist_transport::{CancelSignal, SessionId, SlotKey, TransportFailure};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionStatus {
    Streaming,
    Done,
    Errored,
    Aborted,
}

impl SessionStatus {
    #[must_use]
    pub fn is_streaming(self) -> bool {
        self == Self::Streaming
    }

    #[must_use]
    pub fn is_terminal(self) -> bool {
        !self.is_streaming()
    }
}

/// Accumulated state for one streaming attempt.
///
/// The buffer only grows and the status leaves `Streaming` at most once. Every
/// mutator is a no-op after that, which is what makes late frames harmless.
#[derive(Debug, Clone)]
pub struct Session {
    id: SessionId,
    slot: SlotKey,
    buffer: String,
    status: SessionStatus,
    failure: Option<TransportFailure>,
    cancel: CancelSignal,
}

impl Session {
    #[must_use]
    pub fn new(id: SessionId, slot: SlotKey) -> Self {
        Self {
            id,
            slot,
            buffer: String::new(),
            status: SessionStatus::Streaming,
            failure: None,
            cancel: Arc::new(AtomicBool::new(false)),
        }
    }

    #[must_use]
    pub fn id(&self) -> SessionId {
        self.id
    }

    #[must_use]
    pub fn slot(&self) -> &SlotKey {
        &self.slot
    }

    #[must_use]
    pub fn buffer(&self) -> &str {
        &self.buffer
    }

    #[must_use]
    pub fn status(&self) -> SessionStatus {
        self.status
    }

    /// Present iff the session is `Errored`.
    #[must_use]
    pub fn failure(&self) -> Option<&TransportFailure> {
        self.failure.as_ref()
    }

    #[must_use]
    pub fn error_message(&self) -> Option<&str> {
        self.failure.as_ref().map(|failure| failure.message.as_str())
    }

    /// Handle the transport polls to observe cancellation.
    #[must_use]
    pub fn cancel_signal(&self) -> CancelSignal {
        Arc::clone(&self.cancel)
    }

    #[must_use]
    pub fn is_cancel_requested(&self) -> bool {
        self.cancel.load(Ordering::SeqCst)
    }

    /// Appends a content delta. Returns false once the session has ended.
    pub fn append(&mut self, text: &str) -> bool {
        if !self.status.is_streaming() {
            return false;
        }

        self.buffer.push_str(text);
        true
    }

    pub fn complete(&mut self) -> bool {
        self.finish(SessionStatus::Done, None)
    }

    pub fn fail(&mut self, failure: TransportFailure) -> bool {
        self.finish(SessionStatus::Errored, Some(failure))
    }

    /// Raises the cancel signal and marks the session aborted.
    pub fn abort(&mut self) -> bool {
        self.cancel.store(true, Ordering::SeqCst);
        self.finish(SessionStatus::Aborted, None)
    }

    fn finish(&mut self, status: SessionStatus, failure: Option<TransportFailure>) -> bool {
        if !self.status.is_streaming() {
            return false;
        }

        self.status = status;
        self.failure = failure;
        true
    }
}

#[cfg(test)]
mod tests {
    use assist_transport::{SlotKey, TransportFailure};

    use super::{Session, SessionStatus};

    #[test]
    fn buffer_grows_monotonically_while_streaming() {
        let mut session = Session::new(1, SlotKey::from(1u8));
        let mut previous = 0;

        for chunk in ["Hello", "", " ", "world"] {
            assert!(session.append(chunk));
            assert!(session.buffer().len() >= previous);
            previous = session.buffer().len();
        }

        assert_eq!(session.buffer(), "Hello world");
    }

    #[test]
    fn status_never_returns_to_streaming() {
        let mut session = Session::new(1, SlotKey::from("review"));
        assert!(session.complete());
        assert_eq!(session.status(), SessionStatus::Done);

        assert!(!session.fail(TransportFailure::stream("late")));
        assert!(!session.abort());
        assert!(!session.append("late"));
        assert_eq!(session.status(), SessionStatus::Done);
        assert_eq!(session.error_message(), None);
        assert_eq!(session.buffer(), "");
    }

    #[test]
    fn error_message_present_only_when_errored() {
        let mut session = Session::new(2, SlotKey::from(2u8));
        assert_eq!(session.error_message(), None);

        session.append("partial");
        assert!(session.fail(TransportFailure::stream("Model overloaded")));
        assert_eq!(session.status(), SessionStatus::Errored);
        assert_eq!(session.error_message(), Some("Model overloaded"));
        assert_eq!(session.buffer(), "partial");
    }

    #[test]
    fn abort_raises_shared_cancel_signal() {
        let mut session = Session::new(3, SlotKey::from(3u8));
        let signal = session.cancel_signal();

        assert!(session.abort());
        assert!(signal.load(std::sync::atomic::Ordering::SeqCst));
        assert!(session.is_cancel_requested());
        assert_eq!(session.status(), SessionStatus::Aborted);
    }
}
