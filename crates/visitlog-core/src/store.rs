//! Storage abstraction for the visit counter and the visit log.

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;

use crate::error::ConfigError;
use crate::visit::{NewVisit, RecentVisit, VisitLogEntry, VisitorCounter};

/// A parsed store connection string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DatabaseUrl {
    /// `mongodb://` or `mongodb+srv://`, kept verbatim for the driver.
    MongoDb(String),
    /// `duckdb://<path>`
    DuckDbFile(String),
    /// `duckdb://:memory:`
    DuckDbMemory,
}

impl DatabaseUrl {
    pub fn parse(raw: &str) -> Result<Self, ConfigError> {
        let raw = raw.trim();
        if raw.starts_with("mongodb://") || raw.starts_with("mongodb+srv://") {
            return Ok(Self::MongoDb(raw.to_string()));
        }
        match raw.strip_prefix("duckdb://") {
            Some(":memory:") => Ok(Self::DuckDbMemory),
            Some(path) if !path.is_empty() => Ok(Self::DuckDbFile(path.to_string())),
            _ => Err(ConfigError::UnsupportedDatabaseUrl(redact(raw))),
        }
    }

    /// Short backend label for logs. Never includes credentials.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::MongoDb(_) => "mongodb",
            Self::DuckDbFile(_) | Self::DuckDbMemory => "duckdb",
        }
    }
}

/// Strip any `user:password@` part before the URL ends up in an error message.
fn redact(raw: &str) -> String {
    match (raw.find("://"), raw.rfind('@')) {
        (Some(scheme_end), Some(at)) if at > scheme_end => {
            format!("{}://***@{}", &raw[..scheme_end], &raw[at + 1..])
        }
        _ => raw.to_string(),
    }
}

/// Document-store operations the visit tracker needs.
///
/// Implementations declare their tables/indexes when they are constructed,
/// so none of these methods create schema.
#[async_trait]
pub trait VisitStore: Send + Sync + 'static {
    /// Cheap round-trip used by the health check.
    async fn ping(&self) -> Result<()>;

    /// Read-only lookup of a counter by name.
    async fn find_counter(&self, name: &str) -> Result<Option<VisitorCounter>>;

    /// Create the counter at 0 when absent, add one, and return the stored value.
    ///
    /// Implementations must perform the read-modify-write atomically.
    async fn increment_counter(&self, name: &str) -> Result<VisitorCounter>;

    /// Append a log entry and return it as persisted.
    async fn insert_visit(&self, visit: NewVisit) -> Result<VisitLogEntry>;

    /// The `limit` newest entries, newest first.
    async fn recent_visits(&self, limit: usize) -> Result<Vec<RecentVisit>>;
}

/// Opens a store. Called at most once per successful connection by the
/// server's shared handle; a failed attempt may be retried by a later request.
#[async_trait]
pub trait StoreConnector: Send + Sync + 'static {
    async fn connect(&self) -> Result<Arc<dyn VisitStore>>;
}
