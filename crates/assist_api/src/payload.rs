use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One stream request against a panel endpoint.
///
/// The body is opaque to this crate; panels decide its shape (problem id,
/// hint level, submitted code, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssistRequest {
    pub endpoint: String,
    pub body: Value,
}

impl AssistRequest {
    pub fn new(endpoint: impl Into<String>, body: impl Into<Value>) -> Self {
        Self {
            endpoint: endpoint.into(),
            body: body.into(),
        }
    }
}
