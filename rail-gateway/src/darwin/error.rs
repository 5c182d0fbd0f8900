//! Darwin client error types.

use std::fmt;

/// Errors from the Darwin HTTP client.
#[derive(Debug)]
pub enum DarwinError {
    /// HTTP request failed (network error, timeout, etc.)
    Http(reqwest::Error),

    /// JSON deserialization failed
    Json {
        message: String,
        body: Option<String>,
    },

    /// API returned a success status with an empty or `null` body
    EmptyResponse,

    /// API returned an error status code
    ApiError { status: u16, message: String },

    /// Service details not found (expired or invalid ID)
    ServiceNotFound,

    /// Rate limited by the API
    RateLimited,

    /// Invalid API key or unauthorized
    Unauthorized,

    /// Feature not configured or not available
    NotConfigured(String),
}

impl fmt::Display for DarwinError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DarwinError::Http(e) => write!(f, "HTTP error: {e}"),
            DarwinError::Json { message, body } => {
                write!(f, "JSON parse error: {message}")?;
                if let Some(body) = body {
                    write!(f, " (body: {body})")?;
                }
                Ok(())
            }
            DarwinError::EmptyResponse => write!(f, "empty response body"),
            DarwinError::ApiError { status, message } => {
                write!(f, "API error {status}: {message}")
            }
            DarwinError::ServiceNotFound => {
                write!(f, "service not found (expired or invalid ID)")
            }
            DarwinError::RateLimited => write!(f, "rate limited by Darwin API"),
            DarwinError::Unauthorized => write!(f, "unauthorized (invalid API key)"),
            DarwinError::NotConfigured(msg) => write!(f, "not configured: {msg}"),
        }
    }
}

impl DarwinError {
    /// Whether Darwin answered, but not with the shape we asked for.
    ///
    /// Callers that can degrade gracefully treat this differently from
    /// transport and status failures.
    pub fn is_shape_mismatch(&self) -> bool {
        matches!(self, DarwinError::Json { .. } | DarwinError::EmptyResponse)
    }
}

impl std::error::Error for DarwinError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DarwinError::Http(e) => Some(e),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for DarwinError {
    fn from(err: reqwest::Error) -> Self {
        DarwinError::Http(err)
    }
}
