//! Delay analysis error types.

use crate::darwin::{DarwinError, InvalidFilterType};

/// Errors from a delay query.
#[derive(Debug, thiserror::Error)]
pub enum DelaysError {
    /// Filter direction was neither `to` nor `from`
    #[error(transparent)]
    InvalidFilterType(#[from] InvalidFilterType),

    /// Fetching the board failed
    #[error("failed to fetch board: {0}")]
    Upstream(#[from] DarwinError),
}
