use serde::{Deserialize, Serialize};

/// Literal payload marking normal end of stream.
pub const DONE_SENTINEL: &str = "[DONE]";

/// One decoded unit of the assistant streaming protocol.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Frame {
    /// Text delta to append to the session buffer.
    Content { text: String },
    /// Stream finished normally.
    Terminal,
    /// Server-supplied failure; the stream is considered ended.
    Error { message: String },
}

impl Frame {
    /// Returns true when the caller must stop reading the stream.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Terminal | Self::Error { .. })
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Content { text } => Some(text),
            _ => None,
        }
    }
}
