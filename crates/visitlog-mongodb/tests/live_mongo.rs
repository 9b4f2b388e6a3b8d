//! Runs against a real deployment. Set `VISITLOG_TEST_MONGO_URI` (pointing at a
//! throwaway database) and run with `--ignored`.

use chrono::Utc;
use visitlog_core::{
    store::VisitStore,
    visit::{Device, GeoFields, NewVisit},
};
use visitlog_mongodb::MongoBackend;

async fn backend() -> MongoBackend {
    let uri = std::env::var("VISITLOG_TEST_MONGO_URI")
        .expect("VISITLOG_TEST_MONGO_URI must point at a test database");
    MongoBackend::connect(&uri).await.expect("connect")
}

#[tokio::test]
#[ignore]
async fn increment_is_monotonic() {
    let db = backend().await;
    let name = format!("test-{}", Utc::now().timestamp_nanos_opt().unwrap_or_default());

    let first = db.increment_counter(&name).await.expect("increment");
    assert_eq!(first.count, 1);
    let second = db.increment_counter(&name).await.expect("increment");
    assert_eq!(second.count, 2);

    let found = db.find_counter(&name).await.expect("find").expect("exists");
    assert_eq!(found.count, 2);
}

#[tokio::test]
#[ignore]
async fn inserted_visit_is_the_newest() {
    let db = backend().await;
    let stored = db
        .insert_visit(NewVisit {
            timestamp: Utc::now(),
            ip: "203.0.113.7".to_string(),
            user_agent: "integration-test".to_string(),
            device: Device::Tablet,
            geo: GeoFields::default(),
        })
        .await
        .expect("insert");

    let recent = db.recent_visits(5).await.expect("recent");
    assert!(recent.len() <= 5);
    assert_eq!(recent[0].timestamp, stored.timestamp);
    assert!(recent.windows(2).all(|w| w[0].timestamp >= w[1].timestamp));
}

#[tokio::test]
async fn unreachable_server_fails_to_connect() {
    // Port 1 on localhost refuses connections; server selection gives up quickly.
    let result =
        MongoBackend::connect("mongodb://127.0.0.1:1/?serverSelectionTimeoutMS=200").await;
    assert!(result.is_err());
}
