//! HTTP-backed implementation of the shared `assist_transport` contract.
//!
//! This adapter translates `assist_api` frames into session-tagged
//! `TransportEvent`s as they arrive, so the engine can repaint partial text
//! while the response is still streaming.

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use assist_api::{
    AssistApiClient, AssistApiConfig, AssistApiError, AssistRequest, Frame, StreamEnd,
};
use assist_transport::{
    CancelSignal, StreamRequest, StreamTransport, TransportEvent, TransportFailure,
    TransportInitError, TransportProfile, GENERIC_RETRY_MESSAGE,
};

/// Stable transport identifier.
pub const HTTP_TRANSPORT_ID: &str = "assist-http";

/// Reported when a stream closes before `[DONE]` and before any text arrived.
pub const EMPTY_STREAM_MESSAGE: &str = "The assistant ended the response without any content.";

/// Runtime configuration for one panel endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpTransportConfig {
    pub base_url: String,
    pub endpoint: String,
    pub access_token: Option<String>,
    pub user_agent: Option<String>,
    pub timeout: Option<Duration>,
}

impl HttpTransportConfig {
    #[must_use]
    pub fn new(base_url: impl Into<String>, endpoint: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            endpoint: endpoint.into(),
            access_token: None,
            user_agent: None,
            timeout: None,
        }
    }

    #[must_use]
    pub fn with_access_token(mut self, access_token: impl Into<String>) -> Self {
        self.access_token = Some(access_token.into());
        self
    }

    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    fn into_api_config(self) -> AssistApiConfig {
        let mut config = AssistApiConfig::new(self.base_url);

        if let Some(access_token) = self.access_token {
            config = config.with_access_token(access_token);
        }

        if let Some(user_agent) = self.user_agent {
            config = config.with_user_agent(user_agent);
        }

        if let Some(timeout) = self.timeout {
            config = config.with_timeout(timeout);
        }

        config
    }
}

trait StreamClient: Send + Sync {
    fn stream(
        &self,
        request: &AssistRequest,
        cancel: &CancelSignal,
        on_frame: &mut dyn FnMut(Frame),
    ) -> Result<StreamEnd, AssistApiError>;
}

#[derive(Debug)]
struct DefaultStreamClient {
    client: AssistApiClient,
}

impl StreamClient for DefaultStreamClient {
    fn stream(
        &self,
        request: &AssistRequest,
        cancel: &CancelSignal,
        on_frame: &mut dyn FnMut(Frame),
    ) -> Result<StreamEnd, AssistApiError> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|error| {
                AssistApiError::Unknown(format!("failed to initialize tokio runtime: {error}"))
            })?;

        runtime.block_on(
            self.client
                .stream_with_handler(request, Some(cancel), |frame| on_frame(frame)),
        )
    }
}

/// `StreamTransport` adapter bound to one endpoint.
pub struct HttpTransport {
    endpoint: String,
    base_url: String,
    stream_client: Arc<dyn StreamClient>,
}

impl HttpTransport {
    /// Creates a transport using a real HTTP client.
    pub fn new(config: HttpTransportConfig) -> Result<Self, TransportInitError> {
        let endpoint = config.endpoint.clone();
        let client = AssistApiClient::new(config.into_api_config()).map_err(map_init_error)?;
        client
            .endpoint_url(&endpoint)
            .map_err(map_init_error)?;
        let base_url = client.config().base_url.clone();

        Ok(Self {
            endpoint,
            base_url,
            stream_client: Arc::new(DefaultStreamClient { client }),
        })
    }

    #[cfg(test)]
    fn with_stream_client_for_tests(
        endpoint: impl Into<String>,
        stream_client: Arc<dyn StreamClient>,
    ) -> Self {
        Self {
            endpoint: endpoint.into(),
            base_url: "http://test.invalid/api".to_string(),
            stream_client,
        }
    }
}

impl StreamTransport for HttpTransport {
    fn profile(&self) -> TransportProfile {
        TransportProfile {
            transport_id: HTTP_TRANSPORT_ID.to_string(),
            endpoint: format!(
                "{}/{}",
                self.base_url.trim_end_matches('/'),
                self.endpoint.trim_start_matches('/')
            ),
        }
    }

    fn open(
        &self,
        req: StreamRequest,
        cancel: CancelSignal,
        emit: &mut dyn FnMut(TransportEvent),
    ) -> Result<(), String> {
        let session_id = req.session_id;

        if cancel.load(Ordering::Acquire) {
            emit(TransportEvent::Aborted { session_id });
            return Ok(());
        }

        tracing::debug!(session_id, slot = %req.slot, endpoint = %self.endpoint, "opening stream");

        let request = AssistRequest::new(self.endpoint.clone(), req.payload);
        let mut content_frames = 0usize;
        let outcome = self.stream_client.stream(&request, &cancel, &mut |frame| {
            if let Frame::Content { text } = frame {
                if !text.is_empty() {
                    content_frames += 1;
                    emit(TransportEvent::Content { session_id, text });
                }
            }
        });

        let terminal = match outcome {
            Ok(StreamEnd::Done) => TransportEvent::Terminal { session_id },
            Ok(StreamEnd::Failed { message }) => TransportEvent::Failed {
                session_id,
                failure: TransportFailure::stream(message),
            },
            Ok(StreamEnd::Eof) if content_frames > 0 => {
                tracing::debug!(session_id, "stream closed without [DONE]; treating as complete");
                TransportEvent::Terminal { session_id }
            }
            Ok(StreamEnd::Eof) => TransportEvent::Failed {
                session_id,
                failure: TransportFailure::stream(EMPTY_STREAM_MESSAGE),
            },
            Err(AssistApiError::Cancelled) => TransportEvent::Aborted { session_id },
            Err(error) => TransportEvent::Failed {
                session_id,
                failure: map_request_failure(&error),
            },
        };

        emit(terminal);
        Ok(())
    }
}

fn map_request_failure(error: &AssistApiError) -> TransportFailure {
    tracing::warn!(%error, "assistant request failed");

    match error.server_message() {
        Some(message) if !message.trim().is_empty() => TransportFailure::transport(message),
        _ => TransportFailure::transport(GENERIC_RETRY_MESSAGE),
    }
}

fn map_init_error(error: AssistApiError) -> TransportInitError {
    TransportInitError::new(format!("Failed to initialize HTTP transport: {error}"))
}
