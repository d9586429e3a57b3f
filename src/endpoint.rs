/// HTTP endpoint for the climate dataset
///
/// Serves a handful of canned, read-only queries as JSON.
///
/// Endpoints:
/// - GET /                          - Route listing
/// - GET /api/v1.0/precipitation    - Last year of precipitation, keyed by date
/// - GET /api/v1.0/stations         - Station codes
/// - GET /api/v1.0/tobs             - Last year of temperatures for the busiest station
/// - GET /api/v1.0/{start}          - Temperature stats from start onwards
/// - GET /api/v1.0/{start}/{end}    - Temperature stats for start..=end
/// - GET /health                    - Service health check
///
/// Routing and handlers are plain functions over a `DataSource`, so they can
/// be exercised without a socket. The server loop only adapts `tiny_http`
/// requests onto `route` and fans them out to a worker pool.

use crate::analysis::groupings;
use crate::config::ApiConfig;
use crate::db::{self, DataError, DataSource};
use log::{error, info, warn};
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;
use threadpool::ThreadPool;

/// Prefix shared by every data route.
pub const API_PREFIX: &str = "/api/v1.0";

const AVAILABLE_ENDPOINTS: &[&str] = &[
    "/",
    "/health",
    "/api/v1.0/precipitation",
    "/api/v1.0/stations",
    "/api/v1.0/tobs",
    "/api/v1.0/{start}",
    "/api/v1.0/{start}/{end}",
];

const CONTENT_TYPE_JSON: &str = "application/json";
const CONTENT_TYPE_HTML: &str = "text/html; charset=utf-8";

// ---------------------------------------------------------------------------
// Routing
// ---------------------------------------------------------------------------

/// A recognised request path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    Home,
    Health,
    Precipitation,
    Stations,
    Tobs,
    /// Temperature stats; segments are percent-decoded but not yet parsed.
    TemperatureStats { start: String, end: Option<String> },
}

/// Maps a request URL onto a route. Query strings are ignored.
///
/// The fixed routes are matched before the `{start}` pattern, so a start
/// date can never shadow them.
pub fn parse_route(url: &str) -> Option<Route> {
    let path = url.split(['?', '#']).next().unwrap_or("");
    let path = if path.len() > 1 {
        path.trim_end_matches('/')
    } else {
        path
    };

    match path {
        "" | "/" => return Some(Route::Home),
        "/health" => return Some(Route::Health),
        _ => {}
    }

    let rest = path.strip_prefix(API_PREFIX)?.strip_prefix('/')?;
    let segments: Vec<&str> = rest.split('/').collect();

    match segments.as_slice() {
        ["precipitation"] => Some(Route::Precipitation),
        ["stations"] => Some(Route::Stations),
        ["tobs"] => Some(Route::Tobs),
        [start] if !start.is_empty() => Some(Route::TemperatureStats {
            start: decode_segment(start),
            end: None,
        }),
        [start, end] if !start.is_empty() && !end.is_empty() => Some(Route::TemperatureStats {
            start: decode_segment(start),
            end: Some(decode_segment(end)),
        }),
        _ => None,
    }
}

/// Percent-decodes a path segment, keeping the raw text if it is not valid UTF-8.
fn decode_segment(segment: &str) -> String {
    urlencoding::decode(segment)
        .map(|s| s.into_owned())
        .unwrap_or_else(|_| segment.to_string())
}

// ---------------------------------------------------------------------------
// Responses
// ---------------------------------------------------------------------------

/// A fully rendered HTTP response, independent of the server library.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    pub status: u16,
    pub content_type: &'static str,
    pub body: String,
}

impl ApiResponse {
    fn json<T: Serialize>(status: u16, value: &T) -> Self {
        match serde_json::to_string_pretty(value) {
            Ok(body) => ApiResponse {
                status,
                content_type: CONTENT_TYPE_JSON,
                body,
            },
            Err(e) => {
                error!("Failed to serialize response: {}", e);
                Self::error(500, "failed to serialize response")
            }
        }
    }

    fn error(status: u16, message: &str) -> Self {
        ApiResponse {
            status,
            content_type: CONTENT_TYPE_JSON,
            body: format!("{:#}", serde_json::json!({ "error": message })),
        }
    }

    fn html(body: String) -> Self {
        ApiResponse {
            status: 200,
            content_type: CONTENT_TYPE_HTML,
            body,
        }
    }

    /// Parses the body as JSON. Convenience for callers and tests.
    pub fn json_body(&self) -> serde_json::Result<serde_json::Value> {
        serde_json::from_str(&self.body)
    }
}

/// Every handler failure is a server error; only the body tells them apart.
impl From<DataError> for ApiResponse {
    fn from(e: DataError) -> Self {
        match &e {
            DataError::InvalidArgument(msg) => {
                warn!("Rejected request argument: {}", msg);
                ApiResponse::error(500, msg)
            }
            _ => {
                error!("Data source failure: {:?}", e);
                ApiResponse::error(500, &e.to_string())
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// Dispatches one request to its handler.
pub fn route(method: &str, url: &str, source: &dyn DataSource, api: &ApiConfig) -> ApiResponse {
    if !method.eq_ignore_ascii_case("GET") {
        return ApiResponse::error(405, &format!("method {} not allowed", method));
    }

    let Some(route) = parse_route(url) else {
        return ApiResponse::json(
            404,
            &serde_json::json!({
                "error": "Not found",
                "available_endpoints": AVAILABLE_ENDPOINTS,
            }),
        );
    };

    let result = match route {
        Route::Home => return handle_home(),
        Route::Health => return handle_health(),
        Route::Precipitation => handle_precipitation(source, api),
        Route::Stations => handle_stations(source),
        Route::Tobs => handle_tobs(source, api),
        Route::TemperatureStats { start, end } => {
            handle_temperature_stats(source, &start, end.as_deref())
        }
    };

    result.unwrap_or_else(ApiResponse::from)
}

/// Handle / endpoint
fn handle_home() -> ApiResponse {
    ApiResponse::html(format!(
        "Welcome to the Hawaii Climate API!<br/>\
         Available Routes:<br/>\
         {p}/precipitation<br/>\
         {p}/stations<br/>\
         {p}/tobs<br/>\
         {p}/start (enter start as YYYY-MM-DD)<br/>\
         {p}/start/end (enter start/end as YYYY-MM-DD/YYYY-MM-DD)",
        p = API_PREFIX
    ))
}

/// Handle /health endpoint
fn handle_health() -> ApiResponse {
    ApiResponse::json(
        200,
        &serde_json::json!({
            "status": "ok",
            "service": env!("CARGO_PKG_NAME"),
            "version": env!("CARGO_PKG_VERSION"),
        }),
    )
}

fn handle_precipitation(source: &dyn DataSource, api: &ApiConfig) -> Result<ApiResponse, DataError> {
    let rows = source.precipitation_since(api.precipitation_start())?;
    Ok(ApiResponse::json(200, &groupings::group_precipitation_by_date(rows)))
}

fn handle_stations(source: &dyn DataSource) -> Result<ApiResponse, DataError> {
    Ok(ApiResponse::json(200, &source.list_station_codes()?))
}

fn handle_tobs(source: &dyn DataSource, api: &ApiConfig) -> Result<ApiResponse, DataError> {
    let rows = source.temperatures_for_station_since(&api.most_active_station, api.tobs_start())?;
    Ok(ApiResponse::json(200, &groupings::temperatures_by_date(rows)))
}

fn handle_temperature_stats(
    source: &dyn DataSource,
    start: &str,
    end: Option<&str>,
) -> Result<ApiResponse, DataError> {
    let start = db::parse_date_param(start)?;
    let end = end.map(db::parse_date_param).transpose()?;
    let stats = source.temperature_stats_in_range(start, end)?;
    Ok(ApiResponse::json(200, &stats))
}

// ---------------------------------------------------------------------------
// HTTP Server
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("failed to start HTTP server on {addr}: {reason}")]
    Bind { addr: String, reason: String },
}

/// Binds the listener without serving yet.
///
/// Split from `serve` so callers can bind port 0 and read back the address.
pub fn bind(addr: &str) -> Result<tiny_http::Server, ServerError> {
    tiny_http::Server::http(addr).map_err(|e| ServerError::Bind {
        addr: addr.to_string(),
        reason: e.to_string(),
    })
}

/// Serves requests until the listener shuts down, on `workers` threads.
pub fn serve(
    server: tiny_http::Server,
    workers: usize,
    source: Arc<dyn DataSource>,
    api: Arc<ApiConfig>,
) {
    let pool = ThreadPool::with_name("climate-api-worker".to_string(), workers.max(1));

    for request in server.incoming_requests() {
        let source = Arc::clone(&source);
        let api = Arc::clone(&api);
        pool.execute(move || respond(request, source.as_ref(), &api));
    }

    pool.join();
}

/// Binds `addr` and serves until the process stops.
pub fn start_endpoint_server(
    addr: &str,
    workers: usize,
    source: Arc<dyn DataSource>,
    api: ApiConfig,
) -> Result<(), ServerError> {
    let server = bind(addr)?;

    info!("HTTP endpoint listening on http://{}", addr);
    for endpoint in AVAILABLE_ENDPOINTS {
        info!("   GET {}", endpoint);
    }

    serve(server, workers, source, Arc::new(api));
    Ok(())
}

fn respond(request: tiny_http::Request, source: &dyn DataSource, api: &ApiConfig) {
    let method = request.method().as_str().to_string();
    let url = request.url().to_string();

    let response = route(&method, &url, source, api);
    info!("{} {} -> {}", method, url, response.status);

    let mut http_response = tiny_http::Response::from_data(response.body.into_bytes())
        .with_status_code(tiny_http::StatusCode(response.status));
    match tiny_http::Header::from_bytes(&b"Content-Type"[..], response.content_type.as_bytes()) {
        Ok(header) => http_response.add_header(header),
        Err(()) => warn!("Invalid content type header: {}", response.content_type),
    }

    if let Err(e) = request.respond(http_response) {
        warn!("Failed to send response: {}", e);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
