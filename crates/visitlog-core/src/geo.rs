//! Geo enrichment contract and the degrade-to-unknown helper.

use std::future::Future;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::visit::{GeoFields, UNKNOWN};

/// What a geo service returned for one IP. Every field is optional: providers
/// routinely omit region or timezone for mobile carriers and anycast ranges.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeoInfo {
    pub city: Option<String>,
    pub region: Option<String>,
    /// Display name, e.g. "France", not the ISO code.
    pub country: Option<String>,
    pub timezone: Option<String>,
}

impl GeoInfo {
    pub fn into_fields(self) -> GeoFields {
        GeoFields {
            city: or_unknown(self.city),
            region: or_unknown(self.region),
            country: or_unknown(self.country),
            timezone: or_unknown(self.timezone),
        }
    }
}

fn or_unknown(value: Option<String>) -> String {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| UNKNOWN.to_string())
}

#[async_trait]
pub trait GeoLookup: Send + Sync + 'static {
    async fn lookup(&self, ip: &str) -> Result<GeoInfo>;

    fn name(&self) -> &'static str;
}

/// Await an optional enrichment and fall back to `T::default()` on error.
///
/// The error is logged at `warn` with `source` attached and never returned.
pub async fn best_effort<T, F>(source: &'static str, fut: F) -> T
where
    T: Default,
    F: Future<Output = Result<T>>,
{
    match fut.await {
        Ok(value) => value,
        Err(e) => {
            tracing::warn!(source, error = %e, "enrichment failed; using defaults");
            T::default()
        }
    }
}

/// Resolve geo fields for `ip`, degrading to `"unknown"` for every field on failure.
///
/// The lookup is skipped for an `"unknown"` IP.
pub async fn lookup_geo_fields(geo: &dyn GeoLookup, ip: &str) -> GeoFields {
    if ip == UNKNOWN {
        return GeoFields::default();
    }
    best_effort(geo.name(), geo.lookup(ip)).await.into_fields()
}
