//! Darwin LDB (Live Departure Boards) client.
//!
//! This module provides an HTTP client for the National Rail Darwin API,
//! which provides real-time train departure information.
//!
//! Key characteristics of Darwin:
//! - Service IDs are **ephemeral** - only valid while the service appears
//!   on a departure board (~2 minutes after expected departure)
//! - Times are in "HH:MM" format (UK local time)
//! - The `*WithDetails` board calls return calling points inline, avoiding
//!   the need for separate service detail requests
//! - Lookups by RID and the next/fastest departures boards are only offered
//!   by the separate staff endpoint
//! - A request may carry its own key, which replaces the configured one

mod access;
mod client;
mod error;
mod request;
mod types;

pub use access::{AccessTokenError, AccessTokens};
pub use client::{
    BoardFetcher, DEFAULT_STAFF_BASE_URL, DarwinClient, DarwinConfig, DeparturesFetcher,
    ServiceDetailsFetcher,
};
pub use error::DarwinError;
pub use request::{
    BoardKind, BoardRequest, BoardShape, DEFAULT_NUM_ROWS, DEFAULT_STAFF_SERVICES,
    DeparturesKind, DeparturesRequest, DeparturesShape, EmptyFilterList, FilterType,
    InvalidFilterType, MAX_NUM_ROWS, MAX_STAFF_TIME_WINDOW, ServiceRequest,
};
pub use types::{
    ArrayOfCallingPoints, BoardContent, CallingPoint, DepartureItem, DeparturesBoard,
    DeparturesContent, NrccMessage, ServiceDetails, ServiceDetailsContent,
    ServiceItemWithCallingPoints, ServiceLocation, ServiceType, StationBoard,
};
