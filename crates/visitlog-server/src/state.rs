use std::sync::Arc;

use anyhow::Result;

use visitlog_core::{config::Config, geo::GeoLookup, store::StoreConnector};

use crate::{geo::IpApiClient, store::SharedStore, store::UrlConnector};

/// Shared application state injected into every Axum handler via
/// [`axum::extract::State`].
pub struct AppState {
    /// Parsed configuration, loaded once at startup from environment variables.
    pub config: Arc<Config>,

    /// Store handle, connected lazily by the first request that needs it.
    pub store: SharedStore,

    /// Best-effort geo enrichment.
    pub geo: Arc<dyn GeoLookup>,
}

impl AppState {
    pub fn new(
        config: Config,
        connector: Arc<dyn StoreConnector>,
        geo: Arc<dyn GeoLookup>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            store: SharedStore::new(connector),
            geo,
        }
    }

    /// Wire the production collaborators: the connector for the configured
    /// connection string and the HTTP geo client.
    pub fn from_config(config: Config) -> Result<Self> {
        let connector = Arc::new(UrlConnector::new(
            config.database_url.clone(),
            config.duckdb_memory_limit.clone(),
        ));
        let geo = Arc::new(IpApiClient::new(&config.geo_url, config.geo_timeout())?);
        Ok(Self::new(config, connector, geo))
    }
}
