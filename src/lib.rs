//! Streaming engine behind the assistant panels (hint ladder, code review,
//! debugger, solution explainer).
//!
//! A panel owns one [`SessionController`]. The controller opens a
//! [`StreamTransport`](assist_transport::StreamTransport) session per request,
//! re-classifies the accumulated text into sections after every frame, caches
//! finished results per slot, and publishes [`PanelView`] snapshots.
//!
//! # Public API Overview
//! - Drive a panel with [`SessionController::start`], [`SessionController::cancel`]
//!   and [`SessionController::reset`]; observe it with [`SessionController::subscribe`].
//! - Split text into sections with [`SingleSlot`] or [`HeadingClassified`].
//! - Pick per-panel endpoints and headings from [`PanelKind`].
//! - Build an HTTP-backed controller from the environment with [`http_controller`].

pub mod config;
pub mod controller;
pub mod distributor;
pub mod error;
pub mod logging;
pub mod panels;
pub mod sections;
pub mod session;
pub mod slot_cache;
pub mod view;

use std::sync::Arc;

use assist_transport_http::{HttpTransport, HttpTransportConfig};

pub use assist_transport::{SessionId, SlotKey};
pub use config::EnvConfig;
pub use controller::{SessionController, StartOutcome, WakeHook};
pub use distributor::{
    Heading, HeadingClassified, HeadingMatch, SectionDistributor, SingleSlot, DEFAULT_SECTION,
};
pub use error::EngineError;
pub use panels::{HintLevel, PanelKind};
pub use sections::SectionMap;
pub use session::{Session, SessionStatus};
pub use slot_cache::SlotCache;
pub use view::{PanelError, PanelErrorKind, PanelStatus, PanelView};

/// Builds a controller for `kind` that streams from the configured HTTP API.
pub fn http_controller(kind: PanelKind, config: &EnvConfig) -> Result<SessionController, EngineError> {
    let mut transport_config = HttpTransportConfig::new(&config.base_url, kind.endpoint());

    if let Some(token) = &config.access_token {
        transport_config = transport_config.with_access_token(token);
    }

    if let Some(timeout) = config.timeout {
        transport_config = transport_config.with_timeout(timeout);
    }

    let transport = HttpTransport::new(transport_config)?;
    Ok(SessionController::new(
        Arc::new(transport),
        kind.distributor(config.heading_match()),
    ))
}
