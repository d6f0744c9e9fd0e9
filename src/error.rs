use assist_transport::TransportInitError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("hint level must be between 1 and 4, got {0}")]
    InvalidHintLevel(u8),

    #[error("failed to spawn stream worker: {0}")]
    WorkerSpawn(#[source] std::io::Error),

    #[error("transport initialization failed: {0}")]
    TransportInit(#[from] TransportInitError),
}
