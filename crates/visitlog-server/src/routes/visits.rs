use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::{ConnectInfo, Request, State},
    http::{header, HeaderMap},
    Json,
};
use chrono::Utc;
use serde::Serialize;

use visitlog_core::{
    device::classify_device,
    geo::lookup_geo_fields,
    visit::{NewVisit, RecentVisit, UNKNOWN},
};

use crate::{error::AppError, state::AppState};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VisitsResponse {
    pub total_visits: i64,
    pub latest: Vec<RecentVisit>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TotalResponse {
    pub total_visits: i64,
}

/// `GET /api/visits`: count this visit, log it, and return the newest entries.
///
/// ## Steps
/// 1. Acquire the shared store handle (connects on first use).
/// 2. Client IP from `X-Forwarded-For`, then the socket address, then `"unknown"`;
///    user agent from `User-Agent`, else `"unknown"`.
/// 3. Device class from the user agent.
/// 4. Geo lookup; any failure leaves every geo field `"unknown"`.
/// 5. Increment the counter, 6. insert the log entry, 7. read the newest
///    `recent_limit` entries.
///
/// Nothing is rolled back if the client goes away after step 6.
///
/// ## Response
/// `200 OK` with `{ "totalVisits": n, "latest": [...] }`, or `500` with
/// `{ "error": "..." }` when the store cannot be reached or a store call fails.
#[tracing::instrument(skip(state, request))]
pub async fn track_visit(
    State(state): State<Arc<AppState>>,
    request: Request,
) -> Result<Json<VisitsResponse>, AppError> {
    let (parts, _) = request.into_parts();

    let store = state.store.get().await.map_err(AppError::StoreUnavailable)?;

    let remote_addr = parts
        .extensions
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);
    let ip = extract_client_ip(&parts.headers, remote_addr);
    let user_agent = extract_user_agent(&parts.headers);

    let device = classify_device(&user_agent);

    let geo = lookup_geo_fields(state.geo.as_ref(), &ip).await;

    let counter = store
        .increment_counter(&state.config.counter_name)
        .await
        .map_err(AppError::Store)?;

    store
        .insert_visit(NewVisit {
            timestamp: Utc::now(),
            ip,
            user_agent,
            device,
            geo,
        })
        .await
        .map_err(AppError::Store)?;

    let latest = store
        .recent_visits(state.config.recent_limit)
        .await
        .map_err(AppError::Store)?;

    Ok(Json(VisitsResponse {
        total_visits: counter.count,
        latest,
    }))
}

/// `GET /api/visits/total`: current total without counting a visit.
///
/// Returns `0` before the first tracked visit.
#[tracing::instrument(skip(state))]
pub async fn total_visits(
    State(state): State<Arc<AppState>>,
) -> Result<Json<TotalResponse>, AppError> {
    let store = state.store.get().await.map_err(AppError::StoreUnavailable)?;
    let counter = store
        .find_counter(&state.config.counter_name)
        .await
        .map_err(AppError::Store)?;

    Ok(Json(TotalResponse {
        total_visits: counter.map(|c| c.count).unwrap_or(0),
    }))
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// First `X-Forwarded-For` entry, else the peer address, else `"unknown"`.
fn extract_client_ip(headers: &HeaderMap, remote_addr: Option<SocketAddr>) -> String {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.split(',').next())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .or_else(|| remote_addr.map(|addr| addr.ip().to_string()))
        .unwrap_or_else(|| UNKNOWN.to_string())
}

fn extract_user_agent(headers: &HeaderMap) -> String {
    headers
        .get(header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .filter(|s| !s.is_empty())
        .unwrap_or(UNKNOWN)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers_with(name: &'static str, value: &'static str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(name, HeaderValue::from_static(value));
        headers
    }

    #[test]
    fn forwarded_for_first_entry_wins() {
        let headers = headers_with("x-forwarded-for", "203.0.113.9, 10.0.0.1, 10.0.0.2");
        let remote: SocketAddr = "127.0.0.1:4000".parse().expect("addr");
        assert_eq!(extract_client_ip(&headers, Some(remote)), "203.0.113.9");
    }

    #[test]
    fn socket_address_is_the_fallback() {
        let remote: SocketAddr = "[2001:db8::7]:443".parse().expect("addr");
        assert_eq!(
            extract_client_ip(&HeaderMap::new(), Some(remote)),
            "2001:db8::7"
        );
    }

    #[test]
    fn empty_forwarded_for_falls_through() {
        let headers = headers_with("x-forwarded-for", " , 10.0.0.1");
        let remote: SocketAddr = "192.0.2.10:5000".parse().expect("addr");
        assert_eq!(extract_client_ip(&headers, Some(remote)), "192.0.2.10");
    }

    #[test]
    fn no_source_means_unknown() {
        assert_eq!(extract_client_ip(&HeaderMap::new(), None), "unknown");
    }

    #[test]
    fn missing_user_agent_is_unknown() {
        assert_eq!(extract_user_agent(&HeaderMap::new()), "unknown");
        let headers = headers_with("user-agent", "curl/8.4.0");
        assert_eq!(extract_user_agent(&headers), "curl/8.4.0");
    }
}
