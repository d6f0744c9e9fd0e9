use assist_transport::{FailureKind, SlotKey, TransportFailure};
use serde::Serialize;

use crate::sections::SectionMap;
use crate::session::SessionStatus;

/// Controller-level status, including the pre-start `Idle` state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PanelStatus {
    Idle,
    Streaming,
    Done,
    Errored,
    Aborted,
}

impl From<SessionStatus> for PanelStatus {
    fn from(status: SessionStatus) -> Self {
        match status {
            SessionStatus::Streaming => Self::Streaming,
            SessionStatus::Done => Self::Done,
            SessionStatus::Errored => Self::Errored,
            SessionStatus::Aborted => Self::Aborted,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PanelErrorKind {
    /// Connection or setup failure; the UI offers a retry.
    Transport,
    /// Server-supplied message from inside the stream.
    Stream,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PanelError {
    pub kind: PanelErrorKind,
    pub message: String,
}

impl PanelError {
    /// True when the request never produced a usable stream (connection,
    /// status or non-stream response). Either kind is retried by calling
    /// `start` again for the slot.
    #[must_use]
    pub fn is_connection_failure(&self) -> bool {
        self.kind == PanelErrorKind::Transport
    }
}

impl From<&TransportFailure> for PanelError {
    fn from(failure: &TransportFailure) -> Self {
        Self {
            kind: match failure.kind {
                FailureKind::Transport => PanelErrorKind::Transport,
                FailureKind::Stream => PanelErrorKind::Stream,
            },
            message: failure.message.clone(),
        }
    }
}

/// Render-safe snapshot published to subscribers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PanelView {
    pub status: PanelStatus,
    #[serde(serialize_with = "serialize_slot")]
    pub slot: Option<SlotKey>,
    pub sections: SectionMap,
    pub error: Option<PanelError>,
}

impl PanelView {
    #[must_use]
    pub fn idle(sections: SectionMap) -> Self {
        Self {
            status: PanelStatus::Idle,
            slot: None,
            sections,
            error: None,
        }
    }

    #[must_use]
    pub fn error_message(&self) -> Option<&str> {
        self.error.as_ref().map(|error| error.message.as_str())
    }

    #[must_use]
    pub fn section(&self, key: &str) -> Option<&str> {
        self.sections.get(key)
    }
}

fn serialize_slot<S>(slot: &Option<SlotKey>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    match slot {
        Some(slot) => serializer.serialize_some(slot.as_str()),
        None => serializer.serialize_none(),
    }
}

#[cfg(test)]
mod tests {
    use assist_transport::{SlotKey, TransportFailure};
    use serde_json::json;

    use super::{PanelError, PanelErrorKind, PanelStatus, PanelView};
    use crate::sections::SectionMap;

    #[test]
    fn failure_kind_maps_to_panel_error_kind() {
        let transport = PanelError::from(&TransportFailure::transport("down"));
        assert_eq!(transport.kind, PanelErrorKind::Transport);
        assert!(transport.is_connection_failure());

        let stream = PanelError::from(&TransportFailure::stream("Model overloaded"));
        assert_eq!(stream.kind, PanelErrorKind::Stream);
        assert!(!stream.is_connection_failure());
        assert_eq!(stream.message, "Model overloaded");
    }

    #[test]
    fn view_serializes_for_ui_consumers() {
        let view = PanelView {
            status: PanelStatus::Errored,
            slot: Some(SlotKey::from(2u8)),
            sections: [("default", "partial")].into_iter().collect::<SectionMap>(),
            error: Some(PanelError::from(&TransportFailure::stream("boom"))),
        };

        let value = serde_json::to_value(&view).expect("serialize view");
        assert_eq!(
            value,
            json!({
                "status": "errored",
                "slot": "2",
                "sections": {"default": "partial"},
                "error": {"kind": "stream", "message": "boom"},
            })
        );
        assert_eq!(view.error_message(), Some("boom"));
    }
}
