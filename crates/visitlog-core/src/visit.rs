use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Placeholder stored for any metadata the request or the geo service did not provide.
pub const UNKNOWN: &str = "unknown";

/// Coarse device class derived from the user agent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Device {
    Mobile,
    Tablet,
    #[default]
    Desktop,
}

impl Device {
    pub fn as_str(&self) -> &'static str {
        match self {
            Device::Mobile => "mobile",
            Device::Tablet => "tablet",
            Device::Desktop => "desktop",
        }
    }
}

impl FromStr for Device {
    type Err = std::convert::Infallible;

    /// Anything that is not mobile or tablet reads back as desktop.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "mobile" => Device::Mobile,
            "tablet" => Device::Tablet,
            _ => Device::Desktop,
        })
    }
}

/// The singleton counter row, keyed by `name` by convention.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VisitorCounter {
    pub name: String,
    pub count: i64,
}

/// Geo fields of a log entry, already normalised to `"unknown"` when missing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeoFields {
    pub city: String,
    pub region: String,
    pub country: String,
    pub timezone: String,
}

impl Default for GeoFields {
    fn default() -> Self {
        Self {
            city: UNKNOWN.to_string(),
            region: UNKNOWN.to_string(),
            country: UNKNOWN.to_string(),
            timezone: UNKNOWN.to_string(),
        }
    }
}

/// A log entry before it is persisted. The store stamps nothing itself;
/// `timestamp` is taken by the handler at request time.
#[derive(Debug, Clone)]
pub struct NewVisit {
    pub timestamp: DateTime<Utc>,
    pub ip: String,
    pub user_agent: String,
    pub device: Device,
    pub geo: GeoFields,
}

/// A persisted log entry. Mirrors the `visitlogs` collection / table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VisitLogEntry {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub ip: String,
    #[serde(rename = "userAgent")]
    pub user_agent: String,
    pub device: Device,
    pub city: String,
    pub region: String,
    pub country: String,
    pub timezone: String,
}

impl VisitLogEntry {
    pub fn from_new(id: String, visit: NewVisit) -> Self {
        Self {
            id,
            timestamp: visit.timestamp,
            ip: visit.ip,
            user_agent: visit.user_agent,
            device: visit.device,
            city: visit.geo.city,
            region: visit.geo.region,
            country: visit.geo.country,
            timezone: visit.geo.timezone,
        }
    }
}

/// Display projection returned in the `latest` list: no id, no user agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecentVisit {
    pub ip: String,
    pub city: String,
    pub region: String,
    pub country: String,
    pub timezone: String,
    pub device: Device,
    pub timestamp: DateTime<Utc>,
}

impl From<&VisitLogEntry> for RecentVisit {
    fn from(entry: &VisitLogEntry) -> Self {
        Self {
            ip: entry.ip.clone(),
            city: entry.city.clone(),
            region: entry.region.clone(),
            country: entry.country.clone(),
            timezone: entry.timezone.clone(),
            device: entry.device,
            timestamp: entry.timestamp,
        }
    }
}
