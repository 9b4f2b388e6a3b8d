use std::sync::Arc;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

use visitlog_core::config::Config;
use visitlog_core::geo::{GeoInfo, GeoLookup};
use visitlog_core::store::{DatabaseUrl, StoreConnector, VisitStore};
use visitlog_server::app::build_app;
use visitlog_server::state::AppState;
use visitlog_server::store::UrlConnector;

fn test_config() -> Config {
    Config {
        port: 0,
        database_url: DatabaseUrl::DuckDbMemory,
        geo_url: "http://127.0.0.1:1/{ip}".to_string(),
        geo_timeout_ms: 100,
        recent_limit: 5,
        counter_name: "portfolio".to_string(),
        duckdb_memory_limit: "64MB".to_string(),
    }
}

struct NoGeo;

#[async_trait]
impl GeoLookup for NoGeo {
    async fn lookup(&self, _ip: &str) -> Result<GeoInfo> {
        Err(anyhow!("disabled"))
    }

    fn name(&self) -> &'static str {
        "none"
    }
}

struct RefusingConnector;

#[async_trait]
impl StoreConnector for RefusingConnector {
    async fn connect(&self) -> Result<Arc<dyn VisitStore>> {
        Err(anyhow!("connection refused"))
    }
}

async fn get_health(connector: Arc<dyn StoreConnector>) -> (StatusCode, Value) {
    let state = Arc::new(AppState::new(test_config(), connector, Arc::new(NoGeo)));
    let app = build_app(state);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/health")
                .body(Body::empty())
                .expect("build request"),
        )
        .await
        .expect("request");

    let status = response.status();
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("read body")
        .to_bytes();
    (status, serde_json::from_slice(&bytes).expect("parse JSON"))
}

#[tokio::test]
async fn test_health_ok_when_store_reachable() {
    let connector = Arc::new(UrlConnector::new(DatabaseUrl::DuckDbMemory, "64MB"));
    let (status, json) = get_health(connector).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "ok");
    assert_eq!(json["version"], env!("CARGO_PKG_VERSION"));
}

#[tokio::test]
async fn test_health_degraded_when_store_unreachable() {
    let (status, json) = get_health(Arc::new(RefusingConnector)).await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(json["status"], "degraded");
}
