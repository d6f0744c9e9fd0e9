use std::future::Future;
use std::sync::{atomic::AtomicBool, atomic::Ordering, Arc};
use std::time::Duration;

use futures_util::StreamExt;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};
use reqwest::{Client, Response};
use ::url::Url;

use crate::config::AssistApiConfig;
use crate::decoder::FrameDecoder;
use crate::error::{body_message, parse_error_message, AssistApiError};
use crate::frame::Frame;
use crate::headers::build_headers;
use crate::payload::AssistRequest;
use crate::url::endpoint_url;

/// Optional cancellation signal shared across request and stream loops.
pub type CancellationSignal = Arc<AtomicBool>;

const CANCEL_POLL_INTERVAL: Duration = Duration::from_millis(25);

#[derive(Debug)]
pub struct AssistApiClient {
    http: Client,
    config: AssistApiConfig,
}

/// How a successfully opened stream ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEnd {
    /// The `[DONE]` sentinel arrived.
    Done,
    /// An error frame arrived; carries the server message verbatim.
    Failed { message: String },
    /// The transport closed without a terminal frame.
    Eof,
}

#[derive(Debug, Clone)]
pub struct StreamResult {
    pub frames: Vec<Frame>,
    pub end: StreamEnd,
}

impl AssistApiClient {
    pub fn new(config: AssistApiConfig) -> Result<Self, AssistApiError> {
        let mut builder = Client::builder();
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        if let Some(timeout) = config.connect_timeout {
            builder = builder.connect_timeout(timeout);
        }
        let http = builder.build().map_err(AssistApiError::from)?;
        Ok(Self { http, config })
    }

    pub fn config(&self) -> &AssistApiConfig {
        &self.config
    }

    pub fn endpoint_url(&self, endpoint: &str) -> Result<Url, AssistApiError> {
        endpoint_url(&self.config.base_url, endpoint)
    }

    pub fn build_headers(&self) -> Result<HeaderMap, AssistApiError> {
        let mut out = HeaderMap::new();
        for (key, value) in build_headers(&self.config) {
            out.insert(
                HeaderName::from_bytes(key.as_bytes())
                    .map_err(|_| AssistApiError::InvalidHeader(format!("invalid key: {key}")))?,
                HeaderValue::from_str(&value)
                    .map_err(|_| AssistApiError::InvalidHeader(format!("invalid value for {key}")))?,
            );
        }
        Ok(out)
    }

    pub fn build_request(
        &self,
        request: &AssistRequest,
    ) -> Result<reqwest::RequestBuilder, AssistApiError> {
        let url = self.endpoint_url(&request.endpoint)?;
        let headers = self.build_headers()?;
        Ok(self.http.post(url).headers(headers).json(&request.body))
    }

    /// Send the request and return the response once it is known to be a stream.
    ///
    /// Non-2xx responses and 2xx bodies that are not `text/event-stream` are
    /// read eagerly and turned into errors carrying the server's `message`.
    /// A response without a `Content-Type` header is still read as a stream.
    pub async fn open_stream(
        &self,
        request: &AssistRequest,
        cancellation: Option<&CancellationSignal>,
    ) -> Result<Response, AssistApiError> {
        if is_cancelled(cancellation) {
            return Err(AssistApiError::Cancelled);
        }

        let response = self.build_request(request)?.send();
        let response = await_or_cancel(response, cancellation)
            .await?
            .map_err(AssistApiError::from)?;

        let status = response.status();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .unwrap_or("")
            .to_ascii_lowercase();

        if status.is_success() && is_event_stream_content_type(&content_type) {
            return Ok(response);
        }

        let body = await_or_cancel(response.text(), cancellation)
            .await?
            .unwrap_or_default();
        if status.is_success() {
            Err(AssistApiError::NotAStream {
                content_type,
                message: body_message(&body).unwrap_or_default(),
            })
        } else {
            Err(AssistApiError::Status {
                status,
                message: parse_error_message(status, &body),
            })
        }
    }

    /// Stream frames to `on_frame` in arrival order until a terminal frame,
    /// end of body, or cancellation.
    pub async fn stream_with_handler<F>(
        &self,
        request: &AssistRequest,
        cancellation: Option<&CancellationSignal>,
        mut on_frame: F,
    ) -> Result<StreamEnd, AssistApiError>
    where
        F: FnMut(Frame),
    {
        let response = self.open_stream(request, cancellation).await?;
        let mut bytes = response.bytes_stream();
        let mut decoder = FrameDecoder::default();

        loop {
            let Some(chunk) = await_or_cancel(bytes.next(), cancellation).await? else {
                break;
            };
            if is_cancelled(cancellation) {
                return Err(AssistApiError::Cancelled);
            }
            let chunk = chunk.map_err(AssistApiError::from)?;
            for frame in decoder.feed(&chunk) {
                if let Some(end) = process_frame(frame, &mut on_frame) {
                    return Ok(end);
                }
            }
        }

        if is_cancelled(cancellation) {
            return Err(AssistApiError::Cancelled);
        }

        if let Some(frame) = decoder.finish() {
            if let Some(end) = process_frame(frame, &mut on_frame) {
                return Ok(end);
            }
        }

        Ok(StreamEnd::Eof)
    }

    pub async fn stream(
        &self,
        request: &AssistRequest,
        cancellation: Option<&CancellationSignal>,
    ) -> Result<StreamResult, AssistApiError> {
        let mut frames = Vec::new();
        let end = self
            .stream_with_handler(request, cancellation, |frame| frames.push(frame))
            .await?;

        Ok(StreamResult { frames, end })
    }
}

fn process_frame<F>(frame: Frame, on_frame: &mut F) -> Option<StreamEnd>
where
    F: FnMut(Frame),
{
    let end = match &frame {
        Frame::Content { .. } => None,
        Frame::Terminal => Some(StreamEnd::Done),
        Frame::Error { message } => Some(StreamEnd::Failed {
            message: message.clone(),
        }),
    };

    on_frame(frame);
    end
}

fn is_event_stream_content_type(content_type: &str) -> bool {
    let content_type = content_type.trim();
    content_type.is_empty() || content_type.starts_with("text/event-stream")
}

fn is_cancelled(cancel: Option<&CancellationSignal>) -> bool {
    cancel.is_some_and(|token| token.load(Ordering::Acquire))
}

async fn await_or_cancel<F>(
    future: F,
    cancellation: Option<&CancellationSignal>,
) -> Result<F::Output, AssistApiError>
where
    F: Future,
{
    if cancellation.is_none() {
        return Ok(future.await);
    }

    let mut future = Box::pin(future);

    loop {
        if is_cancelled(cancellation) {
            return Err(AssistApiError::Cancelled);
        }

        if let Ok(output) = tokio::time::timeout(CANCEL_POLL_INTERVAL, &mut future).await {
            if is_cancelled(cancellation) {
                return Err(AssistApiError::Cancelled);
            }
            return Ok(output);
        }
    }
}
