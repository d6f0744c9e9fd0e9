//! Environment configuration.

use std::env;
use std::time::Duration;

use crate::distributor::HeadingMatch;

/// Default API base URL when `ASSIST_API_BASE_URL` is unset.
pub const DEFAULT_BASE_URL: &str = "http://localhost:8080/api";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvConfig {
    pub base_url: String,
    pub access_token: Option<String>,
    pub timeout: Option<Duration>,
    pub strict_headings: bool,
}

impl EnvConfig {
    pub fn from_env() -> Self {
        Self {
            base_url: env_string_opt("ASSIST_API_BASE_URL")
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            access_token: env_string_opt("ASSIST_API_TOKEN"),
            timeout: env_string_opt("ASSIST_API_TIMEOUT_SECS")
                .and_then(|value| value.trim().parse::<u64>().ok())
                .filter(|secs| *secs > 0)
                .map(Duration::from_secs),
            strict_headings: env_flag("ASSIST_STRICT_HEADINGS"),
        }
    }

    #[must_use]
    pub fn heading_match(&self) -> HeadingMatch {
        if self.strict_headings {
            HeadingMatch::Anchored
        } else {
            HeadingMatch::Contains
        }
    }
}

fn env_flag(key: &str) -> bool {
    env::var(key).map(|value| value == "1").unwrap_or(false)
}

fn env_string_opt(key: &str) -> Option<String> {
    env::var(key).ok().and_then(|value| {
        if value.trim().is_empty() {
            None
        } else {
            Some(value)
        }
    })
}
