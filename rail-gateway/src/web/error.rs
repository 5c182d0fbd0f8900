//! Application error type and its HTTP rendering.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use tracing::{error, warn};

use crate::checksum::ChecksumError;
use crate::darwin::{AccessTokenError, DarwinError, EmptyFilterList, InvalidFilterType};
use crate::delays::DelaysError;
use crate::domain::FormatError;

use super::dto::ErrorResponse;

/// Application error type.
#[derive(Debug)]
pub enum AppError {
    BadRequest { message: String },
    /// The request needs an access token it didn't carry.
    Unauthorized { message: String },
    NotFound { message: String },
    /// Darwin failed or answered with an error.
    BadGateway { message: String },
    /// A dependency is missing or refusing requests right now.
    Unavailable { message: String },
    Internal { message: String },
}

impl AppError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        AppError::BadRequest {
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        AppError::NotFound {
            message: message.into(),
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            AppError::BadRequest { .. } => StatusCode::BAD_REQUEST,
            AppError::Unauthorized { .. } => StatusCode::UNAUTHORIZED,
            AppError::NotFound { .. } => StatusCode::NOT_FOUND,
            AppError::BadGateway { .. } => StatusCode::BAD_GATEWAY,
            AppError::Unavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn message(&self) -> &str {
        match self {
            AppError::BadRequest { message }
            | AppError::Unauthorized { message }
            | AppError::NotFound { message }
            | AppError::BadGateway { message }
            | AppError::Unavailable { message }
            | AppError::Internal { message } => message,
        }
    }
}

impl From<DarwinError> for AppError {
    fn from(e: DarwinError) -> Self {
        let message = e.to_string();
        match e {
            DarwinError::ServiceNotFound => AppError::NotFound { message },
            DarwinError::NotConfigured(_) | DarwinError::RateLimited => {
                AppError::Unavailable { message }
            }
            _ => AppError::BadGateway { message },
        }
    }
}

impl From<DelaysError> for AppError {
    fn from(e: DelaysError) -> Self {
        match e {
            DelaysError::Upstream(e) => e.into(),
            other => AppError::BadRequest {
                message: other.to_string(),
            },
        }
    }
}

impl From<InvalidFilterType> for AppError {
    fn from(e: InvalidFilterType) -> Self {
        DelaysError::from(e).into()
    }
}

impl From<EmptyFilterList> for AppError {
    fn from(e: EmptyFilterList) -> Self {
        AppError::bad_request(e.to_string())
    }
}

impl From<AccessTokenError> for AppError {
    fn from(e: AccessTokenError) -> Self {
        let message = e.to_string();
        match e {
            AccessTokenError::Missing => AppError::Unauthorized { message },
            AccessTokenError::Invalid => AppError::BadRequest { message },
        }
    }
}

impl From<FormatError> for AppError {
    fn from(e: FormatError) -> Self {
        AppError::BadRequest {
            message: e.to_string(),
        }
    }
}

impl From<ChecksumError> for AppError {
    fn from(e: ChecksumError) -> Self {
        AppError::Internal {
            message: e.to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = self.message().to_string();

        if status.is_server_error() {
            error!(status = status.as_u16(), %message, "request failed");
        } else {
            warn!(status = status.as_u16(), %message, "request rejected");
        }

        let body = Json(ErrorResponse { error: message });
        (status, body).into_response()
    }
}
