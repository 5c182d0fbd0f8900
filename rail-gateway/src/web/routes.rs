//! HTTP route handlers.

use axum::handler::Handler;
use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::{HeaderValue, header},
    middleware,
    response::{IntoResponse, Response},
    routing::get,
};
use serde::Serialize;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{debug, warn};

use crate::checksum::Fingerprint;
use crate::darwin::{
    BoardKind, BoardRequest, DEFAULT_NUM_ROWS, DeparturesKind, DeparturesRequest, FilterType,
    MAX_NUM_ROWS, ServiceRequest,
};
use crate::delays::{DelaysRequest, FilterTarget};
use crate::domain::{Crs, ServiceId, ServiceLookup, resolve_service_id};
use crate::stations::{CrsResolution, StationRecord, is_london_alias};

use super::dto::*;
use super::error::AppError;
use super::etag::etag_middleware;
use super::state::AppState;

/// Path suffixes shared by the board and delay routes, after `/:crs`.
const BOARD_SUFFIXES: [&str; 4] = [
    "",
    "/:num_rows",
    "/:filter_type/:filter_crs",
    "/:filter_type/:filter_crs/:num_rows",
];

/// Delay summaries are cheap to serve stale for a minute.
const DELAYS_CACHE_CONTROL: &str = "public, max-age=60";

/// Create the application router.
pub fn create_router(state: AppState) -> Router {
    let router = Router::new()
        .route("/health", get(health))
        .route(
            "/delays/:crs/:filter_type/:filter_crs/:num_rows/:std",
            get(delays),
        )
        .route("/staffnext/:crs/:filter_type/:filter_crs", get(staff_next))
        .route(
            "/stafffastest/:crs/:filter_type/:filter_crs",
            get(staff_fastest),
        )
        .route("/service", get(service_by_query))
        .route("/service/:service_id", get(service_by_path))
        .route("/service/:service_id/token", get(service_token))
        .route("/crs", get(all_stations))
        .route("/crs/:query", get(search_stations));

    let router = board_routes(router, "/departures", departures);
    let router = board_routes(router, "/arrivals", arrivals);
    let router = board_routes(router, "/all", arrivals_and_departures);
    let router = board_routes(router, "/delays", delays);

    router
        .layer(middleware::from_fn(etag_middleware))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Register `handler` under `prefix` for every board path shape.
fn board_routes<H, T>(router: Router<AppState>, prefix: &str, handler: H) -> Router<AppState>
where
    H: Handler<T, AppState>,
    T: 'static,
{
    BOARD_SUFFIXES.iter().fold(router, |router, suffix| {
        router.route(&format!("{prefix}/:crs{suffix}"), get(handler.clone()))
    })
}

/// Health check endpoint.
async fn health() -> &'static str {
    "ok"
}

/// JSON response carrying the payload's content fingerprint as its ETag.
fn fingerprinted_json<T: Serialize + Fingerprint>(payload: &T) -> Result<Response, AppError> {
    let etag = payload.fingerprint()?;
    let mut response = Json(payload).into_response();
    if let Ok(value) = HeaderValue::from_str(&etag) {
        response.headers_mut().insert(header::ETAG, value);
    }
    Ok(response)
}

/// Turn a CRS code or station name from a path into a CRS code.
async fn resolve_station(state: &AppState, query: &str) -> Result<Crs, AppError> {
    match state.stations.resolve(query).await {
        CrsResolution::Code(crs) => Ok(crs),
        CrsResolution::NotReady => {
            warn!(query, "station list not loaded yet, treating query as a CRS code");
            Crs::parse_normalized(query)
                .map_err(|_| AppError::bad_request(format!("Invalid CRS code: {query}")))
        }
        // The station list is not exhaustive, so let Darwin judge real codes
        CrsResolution::Unknown => Crs::parse_normalized(query)
            .map_err(|_| AppError::not_found(format!("Unknown station: {query}"))),
    }
}

fn parse_num_rows(raw: Option<&str>) -> Result<u8, AppError> {
    let Some(raw) = raw else {
        return Ok(DEFAULT_NUM_ROWS);
    };
    raw.parse::<u16>()
        .map(|n| n.min(u16::from(MAX_NUM_ROWS)) as u8)
        .map_err(|_| AppError::bad_request(format!("Invalid number of rows: {raw}")))
}

async fn departures(
    State(state): State<AppState>,
    Path(path): Path<BoardPath>,
    Query(query): Query<BoardQuery>,
) -> Result<Response, AppError> {
    board(&state, BoardKind::Departures, path, query).await
}

async fn arrivals(
    State(state): State<AppState>,
    Path(path): Path<BoardPath>,
    Query(query): Query<BoardQuery>,
) -> Result<Response, AppError> {
    board(&state, BoardKind::Arrivals, path, query).await
}

async fn arrivals_and_departures(
    State(state): State<AppState>,
    Path(path): Path<BoardPath>,
    Query(query): Query<BoardQuery>,
) -> Result<Response, AppError> {
    board(&state, BoardKind::All, path, query).await
}

/// Fetch a station board and return it as-is.
async fn board(
    state: &AppState,
    kind: BoardKind,
    path: BoardPath,
    query: BoardQuery,
) -> Result<Response, AppError> {
    let crs = resolve_station(state, &path.crs).await?;

    let mut request = BoardRequest::new(kind, crs)
        .with_num_rows(parse_num_rows(path.num_rows.as_deref())?)
        .with_time_offset(query.time_offset.unwrap_or(0))
        .with_time_window(query.time_window.unwrap_or(120))
        .expanded(query.expand.unwrap_or(false))
        .with_access_token(state.access.key_override(query.access_token.as_deref())?);

    if let (Some(filter_type), Some(filter_crs)) = (&path.filter_type, &path.filter_crs) {
        let filter_type = FilterType::parse(filter_type)?;
        let filter_crs = resolve_station(state, filter_crs).await?;
        request = request.with_filter(filter_crs, filter_type);
    }

    let board = state.boards.fetch_board(&request).await?;
    debug!(
        crs = %crs,
        services = board.content.train_services.as_ref().map_or(0, Vec::len),
        "fetched board"
    );

    fingerprinted_json(&board)
}

/// Summarise delays at a station.
async fn delays(
    State(state): State<AppState>,
    Path(path): Path<DelaysPath>,
    Query(query): Query<BoardQuery>,
) -> Result<Response, AppError> {
    let crs = resolve_station(&state, &path.crs).await?;

    let mut request = DelaysRequest::new(crs)
        .with_num_rows(parse_num_rows(path.num_rows.as_deref())?)
        .with_time_offset(query.time_offset.unwrap_or(0))
        .with_time_window(query.time_window.unwrap_or(120))
        .with_access_token(state.access.key_override(query.access_token.as_deref())?);

    if let (Some(filter_type), Some(filter_crs)) = (&path.filter_type, &path.filter_crs) {
        let filter_type = FilterType::parse(filter_type)?;
        let target = if is_london_alias(filter_crs) {
            FilterTarget::London
        } else {
            FilterTarget::Station(resolve_station(&state, filter_crs).await?)
        };
        request = request.with_filter(target, filter_type);
    }

    if let Some(std) = path.std {
        request = request.with_std(std);
    }

    let summary = state.delays.analyze(&request).await?;
    let mut response = fingerprinted_json(&summary)?;
    response.headers_mut().insert(
        header::CACHE_CONTROL,
        HeaderValue::from_static(DELAYS_CACHE_CONTROL),
    );
    Ok(response)
}

async fn staff_next(
    State(state): State<AppState>,
    Path(path): Path<StaffBoardPath>,
    Query(query): Query<StaffBoardQuery>,
) -> Result<Response, AppError> {
    staff_departures(&state, DeparturesKind::Next, path, query).await
}

async fn staff_fastest(
    State(state): State<AppState>,
    Path(path): Path<StaffBoardPath>,
    Query(query): Query<StaffBoardQuery>,
) -> Result<Response, AppError> {
    staff_departures(&state, DeparturesKind::Fastest, path, query).await
}

/// Next or fastest departures from a station to each of a list of stations.
async fn staff_departures(
    state: &AppState,
    kind: DeparturesKind,
    path: StaffBoardPath,
    query: StaffBoardQuery,
) -> Result<Response, AppError> {
    let crs = resolve_station(state, &path.crs).await?;
    // Departures boards only look forwards, but the route shape is shared
    // with the other boards so the filter type must still be valid.
    FilterType::parse(&path.filter_type)?;

    let mut filters = Vec::new();
    for name in path.filter_crs.split(',').map(str::trim) {
        if !name.is_empty() {
            filters.push(resolve_station(state, name).await?);
        }
    }

    let mut request = DeparturesRequest::new(kind, crs, filters)?
        .with_time_offset(query.time_offset.unwrap_or(0))
        .with_time_window(query.time_window.unwrap_or(120))
        .expanded(query.expand.unwrap_or(false))
        .with_access_token(state.access.key_override(query.access_token.as_deref())?);
    if let Some(services) = query.services.filter(|s| !s.trim().is_empty()) {
        request = request.with_services(services.trim());
    }

    let board = state.departures.fetch_departures(&request).await?;
    debug!(
        crs = %crs,
        destinations = board.content.departures.as_ref().map_or(0, Vec::len),
        "fetched departures"
    );

    fingerprinted_json(&board)
}

async fn service_by_path(
    State(state): State<AppState>,
    Path(service_id): Path<String>,
    Query(query): Query<ServiceQuery>,
) -> Result<Response, AppError> {
    // An explicit query parameter wins over the path
    let service_id = query
        .service_id
        .filter(|id| !id.is_empty())
        .unwrap_or(service_id);
    let token = state.access.key_override(query.access_token.as_deref())?;
    service_details(&state, &service_id, token).await
}

async fn service_by_query(
    State(state): State<AppState>,
    Query(query): Query<ServiceQuery>,
) -> Result<Response, AppError> {
    let service_id = query
        .service_id
        .filter(|id| !id.is_empty())
        .ok_or_else(|| AppError::bad_request("serviceId is required"))?;
    let token = state.access.key_override(query.access_token.as_deref())?;
    service_details(&state, &service_id, token).await
}

/// Look up a service by service ID, packed ID or RID.
async fn service_details(
    state: &AppState,
    raw: &str,
    access_token: Option<String>,
) -> Result<Response, AppError> {
    let details = match resolve_service_id(raw) {
        ServiceLookup::Rid(rid) => {
            debug!(%rid, "service lookup by RID");
            let request = ServiceRequest::new(rid).with_access_token(access_token);
            state.services.service_details_by_rid(&request).await?
        }
        ServiceLookup::ServiceId(id) => {
            debug!(service_id = %id, "service lookup");
            let request = ServiceRequest::new(id).with_access_token(access_token);
            state.services.service_details(&request).await?
        }
    };

    fingerprinted_json(&details)
}

/// Packed forms of a service ID.
async fn service_token(Path(service_id): Path<String>) -> Result<Json<TokenResponse>, AppError> {
    let id = match resolve_service_id(&service_id) {
        ServiceLookup::ServiceId(id) => ServiceId::parse(&id)?,
        ServiceLookup::Rid(_) => {
            return Err(AppError::bad_request("RIDs have no packed form"));
        }
    };
    let token = id.token();

    Ok(Json(TokenResponse {
        service_id: id.to_string(),
        guid: token.to_guid_string(),
        base64: token.to_base64url(),
    }))
}

async fn all_stations(State(state): State<AppState>) -> Result<Json<Vec<StationRecord>>, AppError> {
    stations(&state, None).await
}

async fn search_stations(
    State(state): State<AppState>,
    Path(query): Path<String>,
) -> Result<Json<Vec<StationRecord>>, AppError> {
    stations(&state, Some(&query)).await
}

async fn stations(
    state: &AppState,
    query: Option<&str>,
) -> Result<Json<Vec<StationRecord>>, AppError> {
    let records = state.stations.search(query).await;
    if records.is_empty() && !state.stations.is_ready() {
        return Err(AppError::Unavailable {
            message: "station list not loaded yet".to_string(),
        });
    }
    Ok(Json(records))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn num_rows_parsing() {
        assert_eq!(parse_num_rows(None).unwrap(), DEFAULT_NUM_ROWS);
        assert_eq!(parse_num_rows(Some("20")).unwrap(), 20);
        assert_eq!(parse_num_rows(Some("1000")).unwrap(), MAX_NUM_ROWS);
        assert!(parse_num_rows(Some("ten")).is_err());
        assert!(parse_num_rows(Some("-1")).is_err());
    }
}
