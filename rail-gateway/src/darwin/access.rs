//! Per-request Darwin keys.

use reqwest::header::HeaderValue;

/// Errors from a key passed on a request.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AccessTokenError {
    /// A client token is configured and the request didn't carry one
    #[error("access token required")]
    Missing,

    /// The token can't be sent as a header
    #[error("access token contains invalid characters")]
    Invalid,
}

/// Decides which Darwin key a request is served with.
///
/// A request carrying the configured client token (or no token, when no
/// client token is configured) is served with the gateway's own keys. Any
/// other token is sent to Darwin in their place.
#[derive(Debug, Clone, Default)]
pub struct AccessTokens {
    client_token: String,
}

impl AccessTokens {
    pub fn new(client_token: impl Into<String>) -> Self {
        Self {
            client_token: client_token.into().trim().to_string(),
        }
    }

    /// The key to send instead of the configured one, if any.
    pub fn key_override(&self, requested: Option<&str>) -> Result<Option<String>, AccessTokenError> {
        let requested = requested.map(str::trim).unwrap_or_default();

        if requested == self.client_token {
            return Ok(None);
        }
        if requested.is_empty() {
            return Err(AccessTokenError::Missing);
        }
        if HeaderValue::from_str(requested).is_err() {
            return Err(AccessTokenError::Invalid);
        }
        Ok(Some(requested.to_string()))
    }
}
