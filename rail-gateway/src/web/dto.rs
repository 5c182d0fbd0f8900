//! Request and response DTOs for the web API.

use serde::{Deserialize, Serialize};

/// Path parameters shared by the board routes.
#[derive(Debug, Deserialize)]
pub struct BoardPath {
    pub crs: String,
    pub filter_type: Option<String>,
    pub filter_crs: Option<String>,
    pub num_rows: Option<String>,
}

/// Path parameters for the delay routes.
#[derive(Debug, Deserialize)]
pub struct DelaysPath {
    pub crs: String,
    pub filter_type: Option<String>,
    pub filter_crs: Option<String>,
    pub num_rows: Option<String>,
    pub std: Option<String>,
}

/// Query parameters accepted by board and delay routes.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoardQuery {
    /// Include calling points for every service.
    pub expand: Option<bool>,
    /// Minutes offset from now (-120 to 120).
    pub time_offset: Option<i16>,
    /// Minutes window for results (0 to 120).
    pub time_window: Option<u16>,
    /// Darwin key to use instead of the gateway's own.
    pub access_token: Option<String>,
}

/// Path parameters for the staff next and fastest departures routes.
#[derive(Debug, Deserialize)]
pub struct StaffBoardPath {
    pub crs: String,
    pub filter_type: String,
    /// Comma-separated destination stations.
    pub filter_crs: String,
}

/// Query parameters for the staff departures routes.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StaffBoardQuery {
    pub expand: Option<bool>,
    /// Minutes offset from now (-120 to 119).
    pub time_offset: Option<i16>,
    /// Minutes window for results (0 to 1440).
    pub time_window: Option<u16>,
    /// Service types, e.g. `P` for passenger trains only.
    pub services: Option<String>,
    pub access_token: Option<String>,
}

/// Query parameters for the service route.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceQuery {
    pub service_id: Option<String>,
    pub access_token: Option<String>,
}

/// Packed forms of a service ID.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenResponse {
    pub service_id: String,
    pub guid: String,
    pub base64: String,
}

/// Error response.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}
