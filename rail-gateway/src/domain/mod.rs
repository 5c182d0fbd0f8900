//! Domain types for the rail gateway.
//!
//! This module contains the validated value types shared by the upstream
//! client, the delay analysis and the web layer. All types enforce their
//! invariants at construction time.

mod service_id;
mod station;
mod time;

pub use service_id::{
    FormatError, SERVICE_ID_LEN, ServiceId, ServiceLookup, ServiceToken, decode, encode,
    resolve_service_id,
};
pub use station::{Crs, InvalidCrs};
pub use time::{ClockTime, TimeError};
