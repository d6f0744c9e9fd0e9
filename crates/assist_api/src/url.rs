use ::url::Url;

use crate::error::AssistApiError;

/// Default base URL for assistant endpoints.
pub const DEFAULT_BASE_URL: &str = "http://localhost:8080/api";

/// Resolve a panel endpoint path against the configured base URL.
///
/// The base is treated as a directory, so `http://host/api` + `ai/hint`
/// resolves to `http://host/api/ai/hint`. A blank base falls back to
/// [`DEFAULT_BASE_URL`].
pub fn endpoint_url(base_url: &str, endpoint: &str) -> Result<Url, AssistApiError> {
    let base = if base_url.trim().is_empty() {
        DEFAULT_BASE_URL
    } else {
        base_url.trim()
    };

    let directory = format!("{}/", base.trim_end_matches('/'));
    let base = Url::parse(&directory)
        .map_err(|error| AssistApiError::InvalidBaseUrl(format!("{base}: {error}")))?;

    if base.cannot_be_a_base() {
        return Err(AssistApiError::InvalidBaseUrl(base.to_string()));
    }

    base.join(endpoint.trim().trim_start_matches('/'))
        .map_err(|error| AssistApiError::InvalidBaseUrl(format!("{endpoint}: {error}")))
}
