use std::str::FromStr;
use std::time::Duration;

use crate::error::ConfigError;
use crate::store::DatabaseUrl;

/// Primary variable holding the store connection string.
pub const DATABASE_URL_VAR: &str = "VISITLOG_DATABASE_URL";
/// Accepted for deployments that still export the Mongo-era variable.
pub const LEGACY_DATABASE_URL_VAR: &str = "MONGO_URI";

pub const DEFAULT_GEO_URL: &str = "https://ipapi.co/{ip}/json/";
pub const DEFAULT_COUNTER_NAME: &str = "portfolio";
pub const DEFAULT_RECENT_LIMIT: usize = 5;

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub database_url: DatabaseUrl,
    /// URL template for the geo service; `{ip}` is replaced by the client IP.
    pub geo_url: String,
    pub geo_timeout_ms: u64,
    pub recent_limit: usize,
    pub counter_name: String,
    pub duckdb_memory_limit: String,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from an arbitrary key lookup. `from_env` passes
    /// `std::env::var`; tests pass a map.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let raw_url = lookup(DATABASE_URL_VAR)
            .or_else(|| lookup(LEGACY_DATABASE_URL_VAR))
            .filter(|v| !v.trim().is_empty())
            .ok_or(ConfigError::MissingDatabaseUrl(DATABASE_URL_VAR))?;

        Ok(Self {
            port: parse_or("VISITLOG_PORT", lookup("VISITLOG_PORT"), 3000)?,
            database_url: DatabaseUrl::parse(&raw_url)?,
            geo_url: lookup("VISITLOG_GEO_URL").unwrap_or_else(|| DEFAULT_GEO_URL.to_string()),
            geo_timeout_ms: parse_or(
                "VISITLOG_GEO_TIMEOUT_MS",
                lookup("VISITLOG_GEO_TIMEOUT_MS"),
                3000,
            )?,
            recent_limit: parse_or(
                "VISITLOG_RECENT_LIMIT",
                lookup("VISITLOG_RECENT_LIMIT"),
                DEFAULT_RECENT_LIMIT,
            )?,
            counter_name: lookup("VISITLOG_COUNTER_NAME")
                .unwrap_or_else(|| DEFAULT_COUNTER_NAME.to_string()),
            duckdb_memory_limit: lookup("VISITLOG_DUCKDB_MEMORY")
                .unwrap_or_else(|| "256MB".to_string()),
        })
    }

    pub fn geo_timeout(&self) -> Duration {
        Duration::from_millis(self.geo_timeout_ms)
    }
}

fn parse_or<T>(key: &'static str, raw: Option<String>, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match raw {
        None => Ok(default),
        Some(v) => v.trim().parse().map_err(|e: T::Err| ConfigError::InvalidVar {
            key,
            reason: e.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_apply_when_only_database_url_is_set() {
        let cfg = Config::from_lookup(lookup_from(&[(DATABASE_URL_VAR, "duckdb://:memory:")]))
            .expect("config");
        assert_eq!(cfg.port, 3000);
        assert_eq!(cfg.database_url, DatabaseUrl::DuckDbMemory);
        assert_eq!(cfg.geo_url, DEFAULT_GEO_URL);
        assert_eq!(cfg.recent_limit, 5);
        assert_eq!(cfg.counter_name, "portfolio");
        assert_eq!(cfg.geo_timeout(), Duration::from_secs(3));
    }

    #[test]
    fn legacy_mongo_uri_is_accepted() {
        let cfg = Config::from_lookup(lookup_from(&[(
            LEGACY_DATABASE_URL_VAR,
            "mongodb://localhost:27017/site",
        )]))
        .expect("config");
        assert!(matches!(cfg.database_url, DatabaseUrl::MongoDb(_)));
    }

    #[test]
    fn missing_database_url_is_an_error() {
        let err = Config::from_lookup(lookup_from(&[])).unwrap_err();
        assert!(matches!(err, ConfigError::MissingDatabaseUrl(_)));
    }

    #[test]
    fn invalid_port_is_reported_with_its_key() {
        let err = Config::from_lookup(lookup_from(&[
            (DATABASE_URL_VAR, "duckdb://:memory:"),
            ("VISITLOG_PORT", "eighty"),
        ]))
        .unwrap_err();
        match err {
            ConfigError::InvalidVar { key, .. } => assert_eq!(key, "VISITLOG_PORT"),
            other => panic!("unexpected error: {other}"),
        }
    }
}
