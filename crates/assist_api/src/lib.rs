//! Transport-only client primitives for the assistant streaming endpoints.
//!
//! This crate owns request building, frame decoding, and response/error
//! parsing for the hint, review, debug, and explain endpoints. It contains no
//! section classification and no session bookkeeping.
//!
//! Wire contract: a successful response is a text stream of `data: <payload>`
//! lines separated by blank lines and terminated by `data: [DONE]`. Payloads
//! are `{"text": ..}` deltas or `{"error": ..}` failures. A failed request
//! returns a JSON body `{"message": ..}` instead of a stream.

pub mod client;
pub mod config;
pub mod decoder;
pub mod error;
pub mod frame;
pub mod headers;
pub mod payload;
pub mod url;

pub use client::{AssistApiClient, CancellationSignal, StreamEnd, StreamResult};
pub use config::AssistApiConfig;
pub use decoder::{decode, FrameDecoder};
pub use error::AssistApiError;
pub use frame::Frame;
pub use payload::AssistRequest;
pub use crate::url::endpoint_url;
