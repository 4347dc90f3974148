//! HTTP surface of the geoip service.
//!
//! - `GET <prefix>/json/:ip` resolves an address and responds with a JSON
//!   [`GeoResponse`], or `{"err": "..."}` on failure.
//! - `GET <prefix>/healthcheck` responds with `200 OK` and an empty body.

use {
    axum::{
        extract::{rejection::PathRejection, Path, State},
        http::StatusCode,
        response::{IntoResponse, Response},
        routing::get,
        Json,
        Router,
    },
    geoip::{LocationRecord, Locator, QueryError, Snapshot},
    serde::Serialize,
    tracing::warn,
};

#[cfg(test)]
mod tests;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GeoResponse {
    pub ip: String,
    pub country_code: String,
    pub country_name: String,
    pub continent: String,
    pub region_code: String,
    pub region_name: String,
    pub city: String,
    pub zip_code: String,
    pub time_zone: String,
    pub latitude: f64,
    pub longitude: f64,
    pub metro_code: u16,
}

impl From<LocationRecord> for GeoResponse {
    fn from(record: LocationRecord) -> Self {
        Self {
            ip: record.ip,
            country_code: record.country_code,
            country_name: record.country_name,
            continent: record.continent,
            region_code: record.region_code,
            region_name: record.region_name,
            city: record.city,
            zip_code: record.postal_code,
            time_zone: record.time_zone,
            latitude: record.latitude,
            longitude: record.longitude,
            metro_code: record.metro_code,
        }
    }
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    err: &'static str,
}

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Query(#[from] QueryError),

    #[error("invalid path: {0}")]
    Path(#[from] PathRejection),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, err) = match self {
            ApiError::Path(_) | ApiError::Query(QueryError::BadInput(_)) => {
                (StatusCode::BAD_REQUEST, "bad ip")
            }
            ApiError::Query(QueryError::NotReady) => {
                (StatusCode::SERVICE_UNAVAILABLE, "database not ready")
            }
            ApiError::Query(QueryError::LookupFailed(error)) => {
                warn!(%error, "geoip lookup failed");
                (StatusCode::INTERNAL_SERVER_ERROR, "lookup error")
            }
        };

        (status, Json(ErrorResponse { err })).into_response()
    }
}

/// Normalizes a route prefix to either an empty string or `/segment[/...]`
/// without a trailing slash.
pub fn normalize_prefix(prefix: &str) -> String {
    let prefix = prefix.trim().trim_matches('/');

    if prefix.is_empty() {
        String::new()
    } else {
        format!("/{prefix}")
    }
}

/// Builds the service router with all routes mounted under `prefix`.
pub fn router<S>(prefix: &str, locator: Locator<S>) -> Router
where
    S: Snapshot,
{
    let prefix = normalize_prefix(prefix);

    Router::new()
        .route(&format!("{prefix}/json/:ip"), get(lookup::<S>))
        .route(&format!("{prefix}/healthcheck"), get(healthcheck))
        .with_state(locator)
}

async fn lookup<S>(
    State(locator): State<Locator<S>>,
    ip: Result<Path<String>, PathRejection>,
) -> Result<Json<GeoResponse>, ApiError>
where
    S: Snapshot,
{
    // Undecodable path segments get the same JSON error as unparsable addresses.
    let Path(ip) = ip?;
    let record = locator.lookup(&ip)?;
    Ok(Json(record.into()))
}

async fn healthcheck() -> StatusCode {
    StatusCode::OK
}
