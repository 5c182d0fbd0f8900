//! Delay analysis.
//!
//! Turns a live board into a short summary of how disrupted services are.

mod analyzer;
mod error;
mod request;
mod response;

pub use analyzer::{DEFAULT_DELAY_THRESHOLD_MINUTES, DelayAnalyzer};
pub use error::DelaysError;
pub use request::{DelaysRequest, FilterTarget};
pub use response::{DelaysResponse, DelaysSummary};
