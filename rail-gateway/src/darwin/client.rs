//! Darwin LDB HTTP client.
//!
//! Provides async methods for querying the Darwin Live Departure Boards API.
//! Handles authentication, rate limiting, and mapping of HTTP failures.

use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use futures::future::BoxFuture;
use reqwest::header::{HeaderMap, HeaderValue};
use serde::de::DeserializeOwned;
use tokio::sync::Semaphore;
use tracing::{debug, warn};

use super::error::DarwinError;
use super::request::{BoardRequest, DeparturesRequest, ServiceRequest};
use super::types::{DeparturesBoard, ServiceDetails, StationBoard};

/// Default base URL for Darwin LDB API.
const DEFAULT_BASE_URL: &str =
    "https://api1.raildata.org.uk/1010-live-departure-board-dep-with-details/LDBWS";

/// Default base URL for the staff (LDBSVWS) API.
pub const DEFAULT_STAFF_BASE_URL: &str =
    "https://api1.raildata.org.uk/1010-service-details-by-rid/LDBSVWS";

/// Default maximum concurrent requests.
const DEFAULT_MAX_CONCURRENT: usize = 5;

/// API version segment used in every REST path.
const API_VERSION: &str = "20220120";

/// Header carrying the Darwin key.
const API_KEY_HEADER: &str = "x-apikey";

/// How much of an undecodable body to keep in the error.
const BODY_SNIPPET_LEN: usize = 500;

/// Configuration for one Darwin endpoint.
#[derive(Debug, Clone)]
pub struct DarwinConfig {
    /// API key for authentication
    pub api_key: String,
    /// Base URL for the API (defaults to production Darwin)
    pub base_url: String,
    /// Maximum concurrent requests
    pub max_concurrent: usize,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl DarwinConfig {
    /// Create a new config with the given API key.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            max_concurrent: DEFAULT_MAX_CONCURRENT,
            timeout_secs: 30,
        }
    }

    /// Config for the staff endpoint, which serves lookups by RID.
    pub fn staff(api_key: impl Into<String>) -> Self {
        Self::new(api_key).with_base_url(DEFAULT_STAFF_BASE_URL)
    }

    /// Set a custom base URL (for testing).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Set maximum concurrent requests.
    pub fn with_max_concurrent(mut self, n: usize) -> Self {
        self.max_concurrent = n;
        self
    }

    /// Set request timeout.
    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }
}

/// Source of station boards.
///
/// The delay analysis only needs boards, so it depends on this trait
/// rather than the HTTP client, and tests substitute canned boards.
pub trait BoardFetcher: Send + Sync {
    fn fetch_board<'a>(
        &'a self,
        request: &'a BoardRequest,
    ) -> BoxFuture<'a, Result<StationBoard, DarwinError>>;
}

/// Source of staff next and fastest departures boards.
pub trait DeparturesFetcher: Send + Sync {
    fn fetch_departures<'a>(
        &'a self,
        request: &'a DeparturesRequest,
    ) -> BoxFuture<'a, Result<DeparturesBoard, DarwinError>>;
}

/// Source of service details.
pub trait ServiceDetailsFetcher: Send + Sync {
    /// Details for a service ID from a board.
    fn service_details<'a>(
        &'a self,
        request: &'a ServiceRequest,
    ) -> BoxFuture<'a, Result<ServiceDetails, DarwinError>>;

    /// Details for a running identifier (RID).
    fn service_details_by_rid<'a>(
        &'a self,
        request: &'a ServiceRequest,
    ) -> BoxFuture<'a, Result<ServiceDetails, DarwinError>>;
}

/// A single authenticated endpoint with its own concurrency limit.
#[derive(Debug, Clone)]
struct Endpoint {
    http: reqwest::Client,
    base_url: String,
    semaphore: Arc<Semaphore>,
    /// Whether a key is configured; requests without one need their own
    has_key: bool,
}

impl Endpoint {
    fn new(config: DarwinConfig) -> Result<Self, DarwinError> {
        let mut headers = HeaderMap::new();

        // Darwin uses "x-apikey" for authentication
        let api_key =
            HeaderValue::from_str(&config.api_key).map_err(|_| DarwinError::ApiError {
                status: 0,
                message: "Invalid API key format".to_string(),
            })?;
        headers.insert(API_KEY_HEADER, api_key);

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            semaphore: Arc::new(Semaphore::new(config.max_concurrent.max(1))),
            has_key: !config.api_key.trim().is_empty(),
        })
    }

    fn url(&self, operation: &str, arg: &str) -> String {
        format!("{}/api/{API_VERSION}/{operation}/{arg}", self.base_url)
    }

    /// Issue a GET and decode the JSON reply.
    ///
    /// `api_key` replaces the configured key for this call.
    async fn get<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&'static str, String)],
        api_key: Option<&str>,
    ) -> Result<T, DarwinError> {
        let mut builder = self.http.get(url).query(query);
        match api_key {
            Some(key) => builder = builder.header(API_KEY_HEADER, key),
            None if !self.has_key => {
                return Err(DarwinError::NotConfigured(
                    "no Darwin API key configured or given on the request".to_string(),
                ));
            }
            None => {}
        }

        let _permit = self
            .semaphore
            .acquire()
            .await
            .map_err(|_| DarwinError::ApiError {
                status: 0,
                message: "Semaphore closed".to_string(),
            })?;

        let started = Instant::now();
        let response = builder.send().await?;
        let status = response.status();

        debug!(
            url,
            status = status.as_u16(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "darwin request"
        );

        match status {
            reqwest::StatusCode::UNAUTHORIZED | reqwest::StatusCode::FORBIDDEN => {
                return Err(DarwinError::Unauthorized);
            }
            reqwest::StatusCode::TOO_MANY_REQUESTS => {
                warn!(url, "rate limited by Darwin");
                return Err(DarwinError::RateLimited);
            }
            reqwest::StatusCode::NOT_FOUND => return Err(DarwinError::ServiceNotFound),
            _ => {}
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(DarwinError::ApiError {
                status: status.as_u16(),
                message: body,
            });
        }

        let body = response.text().await?;
        decode_body(&body)
    }
}

/// Decode a Darwin reply body, treating empty and `null` bodies as missing.
fn decode_body<T: DeserializeOwned>(body: &str) -> Result<T, DarwinError> {
    let trimmed = body.trim();
    if trimmed.is_empty() || trimmed == "null" {
        return Err(DarwinError::EmptyResponse);
    }

    serde_json::from_str(trimmed).map_err(|e| DarwinError::Json {
        message: e.to_string(),
        body: Some(trimmed.chars().take(BODY_SNIPPET_LEN).collect()),
    })
}

/// Darwin LDB API client.
///
/// Provides methods for querying station boards and service details.
/// Uses a semaphore to limit concurrent requests and avoid rate limiting.
/// The staff endpoint is optional; without it RID lookups and the
/// next/fastest departures boards are refused.
#[derive(Debug, Clone)]
pub struct DarwinClient {
    public: Endpoint,
    staff: Option<Endpoint>,
}

impl DarwinClient {
    /// Create a new Darwin client with the given configuration.
    pub fn new(config: DarwinConfig) -> Result<Self, DarwinError> {
        Ok(Self {
            public: Endpoint::new(config)?,
            staff: None,
        })
    }

    /// Enable lookups by RID through the staff endpoint.
    pub fn with_staff(mut self, config: DarwinConfig) -> Result<Self, DarwinError> {
        self.staff = Some(Endpoint::new(config)?);
        Ok(self)
    }

    /// Whether the staff endpoint is configured.
    pub fn has_staff(&self) -> bool {
        self.staff.is_some()
    }

    fn staff_endpoint(&self, feature: &str) -> Result<&Endpoint, DarwinError> {
        self.staff
            .as_ref()
            .ok_or_else(|| {
                DarwinError::NotConfigured(format!("staff API key required for {feature}"))
            })
    }

    /// Get a station board.
    ///
    /// With `request.expand` set the board carries calling points for every
    /// service. Service IDs on the board are annotated with their packed
    /// GUID and base64 forms.
    pub async fn get_board(&self, request: &BoardRequest) -> Result<StationBoard, DarwinError> {
        let url = self.public.url(
            request.kind.operation(request.expand),
            request.crs.as_str(),
        );

        let mut board: StationBoard = self
            .public
            .get(&url, &request.query(), request.access_token.as_deref())
            .await?;
        board.shape = request.shape();
        board.content.annotate_service_ids();
        Ok(board)
    }

    /// Get a next or fastest departures board from the staff endpoint.
    ///
    /// The board shows one service per filter station, looked up from now
    /// plus the request's offset in UK local time.
    pub async fn get_departures(
        &self,
        request: &DeparturesRequest,
    ) -> Result<DeparturesBoard, DarwinError> {
        let staff = self.staff_endpoint("next and fastest departures")?;
        let url = staff.url(
            request.kind.operation(request.expand),
            &request.path_arg(Utc::now()),
        );

        let mut board: DeparturesBoard = staff
            .get(&url, &request.query(), request.access_token.as_deref())
            .await?;
        board.shape = request.shape();
        board.content.annotate_service_ids();
        Ok(board)
    }

    /// Get service details by ID.
    ///
    /// **Important:** Darwin service IDs are ephemeral and only valid while
    /// the service appears on a departure board (~2 minutes after expected
    /// departure). This method may return `ServiceNotFound` if the ID has
    /// expired.
    pub async fn get_service_details(
        &self,
        request: &ServiceRequest,
    ) -> Result<ServiceDetails, DarwinError> {
        let url = self.public.url("GetServiceDetails", &request.id);

        self.public
            .get(&url, &[], request.access_token.as_deref())
            .await
            .map_err(|e| match e {
                // Darwin returns null/empty for expired service IDs
                DarwinError::EmptyResponse => DarwinError::ServiceNotFound,
                other => other,
            })
    }

    /// Get service details by RID from the staff endpoint.
    pub async fn get_service_details_by_rid(
        &self,
        request: &ServiceRequest,
    ) -> Result<ServiceDetails, DarwinError> {
        let staff = self.staff_endpoint("RID lookups")?;
        let url = staff.url("GetServiceDetailsByRID", &request.id);

        staff
            .get(&url, &[], request.access_token.as_deref())
            .await
            .map_err(|e| match e {
                DarwinError::EmptyResponse => DarwinError::ServiceNotFound,
                other => other,
            })
    }
}

impl BoardFetcher for DarwinClient {
    fn fetch_board<'a>(
        &'a self,
        request: &'a BoardRequest,
    ) -> BoxFuture<'a, Result<StationBoard, DarwinError>> {
        Box::pin(self.get_board(request))
    }
}

impl DeparturesFetcher for DarwinClient {
    fn fetch_departures<'a>(
        &'a self,
        request: &'a DeparturesRequest,
    ) -> BoxFuture<'a, Result<DeparturesBoard, DarwinError>> {
        Box::pin(self.get_departures(request))
    }
}

impl ServiceDetailsFetcher for DarwinClient {
    fn service_details<'a>(
        &'a self,
        request: &'a ServiceRequest,
    ) -> BoxFuture<'a, Result<ServiceDetails, DarwinError>> {
        Box::pin(self.get_service_details(request))
    }

    fn service_details_by_rid<'a>(
        &'a self,
        request: &'a ServiceRequest,
    ) -> BoxFuture<'a, Result<ServiceDetails, DarwinError>> {
        Box::pin(self.get_service_details_by_rid(request))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::darwin::request::{BoardKind, DeparturesKind};
    use crate::domain::Crs;

    #[test]
    fn config_builder() {
        let config = DarwinConfig::new("test-key")
            .with_base_url("http://localhost:8080")
            .with_max_concurrent(10)
            .with_timeout(60);

        assert_eq!(config.api_key, "test-key");
        assert_eq!(config.base_url, "http://localhost:8080");
        assert_eq!(config.max_concurrent, 10);
        assert_eq!(config.timeout_secs, 60);
    }

    #[test]
    fn config_defaults() {
        let config = DarwinConfig::new("test-key");

        assert_eq!(config.api_key, "test-key");
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.max_concurrent, DEFAULT_MAX_CONCURRENT);
        assert_eq!(config.timeout_secs, 30);

        let staff = DarwinConfig::staff("staff-key");
        assert_eq!(staff.base_url, DEFAULT_STAFF_BASE_URL);
    }

    #[test]
    fn client_creation() {
        let client = DarwinClient::new(DarwinConfig::new("test-key")).unwrap();
        assert!(!client.has_staff());

        let client = client.with_staff(DarwinConfig::staff("staff-key")).unwrap();
        assert!(client.has_staff());
    }

    #[test]
    fn rejects_unprintable_key() {
        assert!(DarwinClient::new(DarwinConfig::new("bad\nkey")).is_err());
    }

    #[test]
    fn board_urls() {
        let client = DarwinClient::new(
            DarwinConfig::new("k").with_base_url("http://localhost:8080/"),
        )
        .unwrap();
        let req = BoardRequest::new(BoardKind::Arrivals, Crs::parse("BTN").unwrap())
            .expanded(true);

        assert_eq!(
            client
                .public
                .url(req.kind.operation(req.expand), req.crs.as_str()),
            "http://localhost:8080/api/20220120/GetArrBoardWithDetails/BTN"
        );
    }

    #[tokio::test]
    async fn rid_lookup_without_staff_key() {
        let client = DarwinClient::new(DarwinConfig::new("k")).unwrap();
        let err = client
            .get_service_details_by_rid(&ServiceRequest::new("202403157654321"))
            .await
            .unwrap_err();
        assert!(matches!(err, DarwinError::NotConfigured(_)));
    }

    #[tokio::test]
    async fn departures_need_staff_key() {
        let client = DarwinClient::new(DarwinConfig::new("k")).unwrap();
        let crs = |s: &str| Crs::parse(s).unwrap();
        let request =
            DeparturesRequest::new(DeparturesKind::Fastest, crs("BTN"), [crs("VIC")]).unwrap();
        let err = client.get_departures(&request).await.unwrap_err();
        assert!(matches!(err, DarwinError::NotConfigured(_)));
    }

    #[tokio::test]
    async fn missing_key_refused_before_sending() {
        // Nothing listens on this port; a request that went out would fail with Http
        let client = DarwinClient::new(
            DarwinConfig::new("").with_base_url("http://127.0.0.1:9"),
        )
        .unwrap();
        let err = client
            .get_service_details(&ServiceRequest::new("4611018PADTON__"))
            .await
            .unwrap_err();
        assert!(matches!(err, DarwinError::NotConfigured(_)));

        let err = client
            .get_service_details(
                &ServiceRequest::new("4611018PADTON__").with_access_token(Some("mine".into())),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, DarwinError::Http(_)));
    }

    #[test]
    fn empty_bodies_are_missing() {
        for body in ["", "  ", "null", "null\n"] {
            let err = decode_body::<StationBoard>(body).unwrap_err();
            assert!(matches!(err, DarwinError::EmptyResponse), "{body:?}");
        }
    }

    #[test]
    fn wrong_shape_is_json_error() {
        let err = decode_body::<StationBoard>(r#"{"unexpected": true}"#).unwrap_err();
        assert!(matches!(err, DarwinError::Json { .. }));
        assert!(err.is_shape_mismatch());
    }

    #[test]
    fn decodes_board() {
        let board: StationBoard = decode_body(
            r#"{"generatedAt": "2024-03-15T10:30:00Z", "locationName": "Reading", "crs": "RDG"}"#,
        )
        .unwrap();
        assert_eq!(board.content.crs, "RDG");
    }
}
