//! BSON shapes of the two collections.
//!
//! Field names follow the documents the portfolio site has always written
//! (`userAgent` in camelCase, `timestamp` as a BSON date), so an existing
//! `visitlogs` collection reads back unchanged.

use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use mongodb::bson::{self, doc, oid::ObjectId, Document};
use serde::{Deserialize, Serialize};

use visitlog_core::visit::{Device, RecentVisit, UNKNOWN};

#[derive(Debug, Serialize, Deserialize)]
pub struct CounterDocument {
    pub name: String,
    #[serde(default)]
    pub count: i64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct VisitLogDocument {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub timestamp: bson::DateTime,
    pub ip: String,
    #[serde(rename = "userAgent")]
    pub user_agent: String,
    pub device: Device,
    pub city: String,
    pub region: String,
    pub country: String,
    pub timezone: String,
}

/// Projection target for the recent-visits query.
///
/// Entries written by older deployments lack the geo/device fields; those
/// default to `"unknown"` / desktop instead of failing deserialization.
#[derive(Debug, Deserialize)]
pub struct RecentVisitDocument {
    #[serde(default = "unknown")]
    pub ip: String,
    #[serde(default = "unknown")]
    pub city: String,
    #[serde(default = "unknown")]
    pub region: String,
    #[serde(default = "unknown")]
    pub country: String,
    #[serde(default = "unknown")]
    pub timezone: String,
    /// Read as text so a value outside mobile/tablet/desktop falls back to
    /// desktop instead of failing the whole query.
    #[serde(default)]
    pub device: Option<String>,
    pub timestamp: bson::DateTime,
}

fn unknown() -> String {
    UNKNOWN.to_string()
}

/// Counters are singletons keyed by `name`.
pub fn counter_filter(name: &str) -> Document {
    doc! { "name": name }
}

/// Stored as Int64 so the count never overflows a 32-bit field.
pub fn increment_update() -> Document {
    doc! { "$inc": { "count": 1_i64 } }
}

pub fn newest_first() -> Document {
    doc! { "timestamp": -1 }
}

/// Fields of [`RecentVisitDocument`]; `_id` and `userAgent` stay in the database.
pub fn recent_visit_projection() -> Document {
    doc! {
        "_id": 0,
        "ip": 1,
        "city": 1,
        "region": 1,
        "country": 1,
        "timezone": 1,
        "device": 1,
        "timestamp": 1,
    }
}

pub fn to_bson_datetime(ts: DateTime<Utc>) -> bson::DateTime {
    bson::DateTime::from_millis(ts.timestamp_millis())
}

pub fn from_bson_datetime(ts: bson::DateTime) -> Result<DateTime<Utc>> {
    let millis = ts.timestamp_millis();
    DateTime::from_timestamp_millis(millis)
        .ok_or_else(|| anyhow!("timestamp out of range: {millis}"))
}

impl TryFrom<RecentVisitDocument> for RecentVisit {
    type Error = anyhow::Error;

    fn try_from(doc: RecentVisitDocument) -> Result<Self> {
        Ok(RecentVisit {
            ip: doc.ip,
            city: doc.city,
            region: doc.region,
            country: doc.country,
            timezone: doc.timezone,
            device: doc
                .device
                .as_deref()
                .unwrap_or_default()
                .parse()
                .unwrap_or_default(),
            timestamp: from_bson_datetime(doc.timestamp)?,
        })
    }
}
