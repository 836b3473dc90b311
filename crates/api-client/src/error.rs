//! Error types for the device API crate.

use thiserror::Error;

/// Result type alias for API operations.
pub type Result<T> = std::result::Result<T, ApiError>;

/// Failure classification consumed by the scheduler's retry policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchClass {
    /// Transport-level failure (DNS, connect, timeout, 5xx). Retried with
    /// exponential backoff.
    Network,
    /// The server answered but the body did not match the expected schema.
    Protocol,
    /// 401/403. The device token is presumed revoked until reconfigured, so
    /// the scheduler re-checks on a long fixed interval instead.
    Unauthorized,
}

/// Errors that can occur while fetching device content.
#[derive(Debug, Error)]
pub enum ApiError {
    /// HTTP client error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Error response from the remote service
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// Authentication error (missing or malformed token)
    #[error("Authentication error: {0}")]
    Auth(String),
}

impl ApiError {
    /// Create an API error from status and message
    pub fn api(status: u16, message: impl Into<String>) -> Self {
        Self::Api {
            status,
            message: message.into(),
        }
    }

    /// Create an auth error
    pub fn auth(message: impl Into<String>) -> Self {
        Self::Auth(message.into())
    }

    /// HTTP status if this is an API error.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Classify this error for the scheduler's retry policy.
    pub fn fetch_class(&self) -> FetchClass {
        match self {
            Self::Api { status, .. } => match *status {
                401 | 403 => FetchClass::Unauthorized,
                408 | 429 | 500..=599 => FetchClass::Network,
                _ => FetchClass::Protocol,
            },
            Self::Http(err) if err.is_decode() => FetchClass::Protocol,
            Self::Http(_) => FetchClass::Network,
            Self::Json(_) => FetchClass::Protocol,
            Self::Auth(_) => FetchClass::Unauthorized,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fetch_class_for_http_status() {
        assert_eq!(ApiError::api(500, "oops").fetch_class(), FetchClass::Network);
        assert_eq!(ApiError::api(429, "slow").fetch_class(), FetchClass::Network);
        assert_eq!(
            ApiError::api(401, "revoked").fetch_class(),
            FetchClass::Unauthorized
        );
        assert_eq!(
            ApiError::api(403, "forbidden").fetch_class(),
            FetchClass::Unauthorized
        );
        assert_eq!(ApiError::api(400, "bad").fetch_class(), FetchClass::Protocol);
    }

    #[test]
    fn fetch_class_for_malformed_body_is_protocol() {
        let json_err = serde_json::from_str::<serde_json::Value>("not json").unwrap_err();
        assert_eq!(ApiError::from(json_err).fetch_class(), FetchClass::Protocol);
    }
}
