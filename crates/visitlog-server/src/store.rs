use std::path::Path;
use std::sync::Arc;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use futures::future::{BoxFuture, FutureExt, Shared};
use tokio::sync::Mutex;
use tracing::info;

use visitlog_core::store::{DatabaseUrl, StoreConnector, VisitStore};
use visitlog_duckdb::DuckDbBackend;
use visitlog_mongodb::MongoBackend;

/// Opens the backend named by the configured connection string.
pub struct UrlConnector {
    url: DatabaseUrl,
    duckdb_memory_limit: String,
}

impl UrlConnector {
    pub fn new(url: DatabaseUrl, duckdb_memory_limit: impl Into<String>) -> Self {
        Self {
            url,
            duckdb_memory_limit: duckdb_memory_limit.into(),
        }
    }
}

#[async_trait]
impl StoreConnector for UrlConnector {
    async fn connect(&self) -> Result<Arc<dyn VisitStore>> {
        match &self.url {
            DatabaseUrl::MongoDb(uri) => Ok(Arc::new(MongoBackend::connect(uri).await?)),
            DatabaseUrl::DuckDbFile(path) => {
                let path = path.clone();
                let memory_limit = self.duckdb_memory_limit.clone();
                // Opening the file and running the schema SQL is blocking I/O.
                let db = tokio::task::spawn_blocking(move || -> Result<DuckDbBackend> {
                    if let Some(parent) = Path::new(&path).parent() {
                        if !parent.as_os_str().is_empty() {
                            std::fs::create_dir_all(parent)?;
                        }
                    }
                    DuckDbBackend::open(&path, &memory_limit)
                })
                .await??;
                Ok(Arc::new(db))
            }
            DatabaseUrl::DuckDbMemory => Ok(Arc::new(DuckDbBackend::open_in_memory()?)),
        }
    }
}

type ConnectAttempt =
    Shared<BoxFuture<'static, std::result::Result<Arc<dyn VisitStore>, Arc<anyhow::Error>>>>;

/// Process-wide store handle with single-flight initialization.
///
/// The first caller starts a connection attempt; callers arriving while it is
/// in flight await the same attempt and receive its result, success or
/// failure. A successful handle is kept for the life of the process. A failed
/// attempt is dropped from the slot, so the next request starts a new one.
pub struct SharedStore {
    connector: Arc<dyn StoreConnector>,
    slot: Mutex<Option<ConnectAttempt>>,
}

impl SharedStore {
    pub fn new(connector: Arc<dyn StoreConnector>) -> Self {
        Self {
            connector,
            slot: Mutex::new(None),
        }
    }

    pub async fn get(&self) -> Result<Arc<dyn VisitStore>> {
        let attempt = self
            .slot
            .lock()
            .await
            .get_or_insert_with(|| self.start_attempt())
            .clone();

        match attempt.clone().await {
            Ok(store) => Ok(store),
            Err(e) => {
                let mut slot = self.slot.lock().await;
                // A later request may already have replaced the failed attempt.
                if slot.as_ref().is_some_and(|current| current.ptr_eq(&attempt)) {
                    *slot = None;
                }
                Err(anyhow!("{e:#}"))
            }
        }
    }

    fn start_attempt(&self) -> ConnectAttempt {
        let connector = Arc::clone(&self.connector);
        async move {
            let store = connector.connect().await.map_err(Arc::new)?;
            info!("Store connected");
            Ok::<_, Arc<anyhow::Error>>(store)
        }
        .boxed()
        .shared()
    }

    pub async fn is_connected(&self) -> bool {
        self.slot
            .lock()
            .await
            .as_ref()
            .and_then(|attempt| attempt.peek())
            .is_some_and(|result| result.is_ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn duckdb_memory_url_connects() {
        let connector = UrlConnector::new(DatabaseUrl::DuckDbMemory, "64MB");
        let store = connector.connect().await.expect("connect");
        store.ping().await.expect("ping");
    }

    #[tokio::test]
    async fn shared_store_reuses_the_first_handle() {
        let shared = SharedStore::new(Arc::new(UrlConnector::new(
            DatabaseUrl::DuckDbMemory,
            "64MB",
        )));
        assert!(!shared.is_connected().await);

        let first = shared.get().await.expect("first");
        first.increment_counter("portfolio").await.expect("increment");
        assert!(shared.is_connected().await);

        // A fresh in-memory database would start from zero again.
        let second = shared.get().await.expect("second");
        let counter = second.increment_counter("portfolio").await.expect("increment");
        assert_eq!(counter.count, 2);
    }

    struct RefusingConnector {
        attempts: AtomicUsize,
    }

    #[async_trait]
    impl StoreConnector for RefusingConnector {
        async fn connect(&self) -> Result<Arc<dyn VisitStore>> {
            self.attempts.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(100)).await;
            Err(anyhow!("connection refused"))
        }
    }

    #[tokio::test]
    async fn waiters_share_a_failed_attempt() {
        let connector = Arc::new(RefusingConnector {
            attempts: AtomicUsize::new(0),
        });
        let shared = Arc::new(SharedStore::new(connector.clone()));

        let mut handles = Vec::new();
        for _ in 0..10 {
            let shared = Arc::clone(&shared);
            handles.push(tokio::spawn(async move { shared.get().await }));
        }
        for handle in handles {
            let err = handle
                .await
                .expect("join")
                .err()
                .expect("every waiter sees the failure");
            assert!(err.to_string().contains("connection refused"), "{err}");
        }
        assert_eq!(connector.attempts.load(Ordering::SeqCst), 1);
        assert!(!shared.is_connected().await);

        // The failure is not cached: the next caller starts a fresh attempt.
        assert!(shared.get().await.is_err());
        assert_eq!(connector.attempts.load(Ordering::SeqCst), 2);
    }
}
