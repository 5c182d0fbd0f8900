//! Web layer for the rail gateway.
//!
//! Provides the HTTP endpoints for boards, delay summaries, service details
//! and station lookups, with conditional-request handling on every route.

mod dto;
mod error;
mod etag;
mod routes;
mod state;

pub use dto::*;
pub use error::AppError;
pub use etag::{MAX_ETAG_BODY_BYTES, etag_middleware};
pub use routes::create_router;
pub use state::AppState;
