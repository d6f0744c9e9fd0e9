use serde::Deserialize;
use serde_json::Value;

use crate::frame::{Frame, DONE_SENTINEL};

const DATA_PREFIX: &str = "data:";

/// Decode one transport chunk against the carried, not yet line-terminated tail.
///
/// Only complete lines produce frames. The returned carry holds the remaining
/// bytes, so a multi-byte character split across chunks survives intact.
/// Decoding stops after the first terminal frame; bytes after it are returned
/// as carry and should be discarded by the caller.
pub fn decode(raw: &[u8], carry: &[u8]) -> (Vec<Frame>, Vec<u8>) {
    let mut pending = Vec::with_capacity(carry.len() + raw.len());
    pending.extend_from_slice(carry);
    pending.extend_from_slice(raw);

    let mut frames = Vec::new();
    let mut consumed = 0;

    while let Some(offset) = pending[consumed..].iter().position(|byte| *byte == b'\n') {
        let line = &pending[consumed..consumed + offset];
        consumed += offset + 1;

        if let Some(frame) = decode_line(line) {
            let terminal = frame.is_terminal();
            frames.push(frame);
            if terminal {
                break;
            }
        }
    }

    (frames, pending.split_off(consumed))
}

/// Incremental frame decoder for one session's byte stream.
#[derive(Debug, Default)]
pub struct FrameDecoder {
    carry: Vec<u8>,
    finished: bool,
}

impl FrameDecoder {
    /// Feed arbitrary bytes and drain the frames completed by them.
    pub fn feed(&mut self, bytes: &[u8]) -> Vec<Frame> {
        if self.finished {
            return Vec::new();
        }

        let (frames, carry) = decode(bytes, &self.carry);
        self.carry = carry;

        if frames.last().is_some_and(Frame::is_terminal) {
            self.finished = true;
            self.carry.clear();
        }

        frames
    }

    /// Decode a trailing line the transport closed without terminating.
    pub fn finish(&mut self) -> Option<Frame> {
        if self.finished || self.carry.is_empty() {
            return None;
        }

        let line = std::mem::take(&mut self.carry);
        let frame = decode_line(&line)?;
        if frame.is_terminal() {
            self.finished = true;
        }
        Some(frame)
    }

    /// Returns true once a terminal frame has been emitted.
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Parse a complete payload string in one shot.
    pub fn parse_frames(input: &str) -> Vec<Frame> {
        let mut decoder = Self::default();
        let mut frames = decoder.feed(input.as_bytes());
        frames.extend(decoder.finish());
        frames
    }

    pub fn is_empty_buffer(&self) -> bool {
        self.carry.iter().all(u8::is_ascii_whitespace)
    }
}

#[derive(Debug, Deserialize)]
struct FramePayload {
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    error: Option<Value>,
}

impl FramePayload {
    fn into_frame(self) -> Option<Frame> {
        if let Some(error) = self.error {
            return Some(Frame::Error {
                message: error_message(error),
            });
        }

        self.text.map(|text| Frame::Content { text })
    }
}

fn error_message(error: Value) -> String {
    match error {
        Value::String(message) => message,
        Value::Object(fields) => match fields.get("message").and_then(Value::as_str) {
            Some(message) => message.to_owned(),
            None => Value::Object(fields).to_string(),
        },
        other => other.to_string(),
    }
}

fn decode_line(line: &[u8]) -> Option<Frame> {
    let decoded = String::from_utf8_lossy(line);
    let line = decoded.strip_suffix('\r').unwrap_or(decoded.as_ref());
    let payload = line.strip_prefix(DATA_PREFIX)?.trim();

    if payload.is_empty() {
        return None;
    }
    if payload == DONE_SENTINEL {
        return Some(Frame::Terminal);
    }

    match serde_json::from_str::<FramePayload>(payload) {
        Ok(parsed) => {
            let frame = parsed.into_frame();
            if frame.is_none() {
                tracing::trace!(payload, "dropping frame without text or error field");
            }
            frame
        }
        Err(error) => {
            tracing::trace!(payload, %error, "dropping malformed frame payload");
            None
        }
    }
}
