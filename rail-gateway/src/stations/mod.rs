//! National Rail Station API client and name lookup.
//!
//! Provides CRS code ↔ station name mapping, fetched from the
//! National Rail Station API in the background and refreshed daily.

mod client;
mod error;
mod london;
mod names;

pub use client::{StationClient, StationClientConfig, StationDto};
pub use error::StationError;
pub use london::{
    FixedLondonTerminals, LONDON_TERMINAL_CODES, LondonTerminals, is_london_alias,
    london_terminal_codes,
};
pub use names::{CrsResolution, StationNames, StationRecord};
