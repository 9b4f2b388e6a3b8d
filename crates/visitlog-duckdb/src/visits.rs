use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::{DateTime, SubsecRound, Utc};

use visitlog_core::store::VisitStore;
use visitlog_core::visit::{Device, NewVisit, RecentVisit, VisitLogEntry, VisitorCounter};

use crate::DuckDbBackend;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.6f";

#[async_trait]
impl VisitStore for DuckDbBackend {
    /// Execute `SELECT 1` as a lightweight liveness check.
    async fn ping(&self) -> Result<()> {
        let conn = self.conn.lock().await;
        conn.execute_batch("SELECT 1")?;
        Ok(())
    }

    async fn find_counter(&self, name: &str) -> Result<Option<VisitorCounter>> {
        let conn = self.conn.lock().await;
        let mut stmt = conn.prepare(r#"SELECT "count" FROM visitor_counters WHERE name = ?1"#)?;
        let mut rows = stmt.query_map(duckdb::params![name], |row| row.get::<_, i64>(0))?;
        match rows.next() {
            Some(count) => Ok(Some(VisitorCounter {
                name: name.to_string(),
                count: count?,
            })),
            None => Ok(None),
        }
    }

    /// Update-or-insert inside one transaction while holding the connection
    /// lock, so concurrent handlers in this process never lose an increment.
    async fn increment_counter(&self, name: &str) -> Result<VisitorCounter> {
        let mut conn = self.conn.lock().await;
        let tx = conn.transaction()?;

        let updated = tx.execute(
            r#"UPDATE visitor_counters SET "count" = "count" + 1 WHERE name = ?1"#,
            duckdb::params![name],
        )?;
        if updated == 0 {
            tx.execute(
                r#"INSERT INTO visitor_counters (name, "count") VALUES (?1, 1)"#,
                duckdb::params![name],
            )?;
        }

        let count: i64 = tx
            .prepare(r#"SELECT "count" FROM visitor_counters WHERE name = ?1"#)?
            .query_row(duckdb::params![name], |row| row.get(0))?;
        tx.commit()?;

        Ok(VisitorCounter {
            name: name.to_string(),
            count,
        })
    }

    async fn insert_visit(&self, mut visit: NewVisit) -> Result<VisitLogEntry> {
        // TIMESTAMP has microsecond precision; trim first so the returned
        // entry matches what a later read produces.
        visit.timestamp = visit.timestamp.trunc_subsecs(6);
        let id = uuid::Uuid::new_v4().to_string();

        let conn = self.conn.lock().await;
        conn.execute(
            r#"INSERT INTO visit_logs (
                id, "timestamp", ip, user_agent, device,
                city, region, country, timezone
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)"#,
            duckdb::params![
                id,
                visit.timestamp.naive_utc().format(TIMESTAMP_FORMAT).to_string(),
                visit.ip,
                visit.user_agent,
                visit.device.as_str(),
                visit.geo.city,
                visit.geo.region,
                visit.geo.country,
                visit.geo.timezone,
            ],
        )?;

        Ok(VisitLogEntry::from_new(id, visit))
    }

    async fn recent_visits(&self, limit: usize) -> Result<Vec<RecentVisit>> {
        let conn = self.conn.lock().await;
        let mut stmt = conn.prepare(
            r#"SELECT ip, city, region, country, timezone, device, epoch_us("timestamp")
               FROM visit_logs
               ORDER BY "timestamp" DESC
               LIMIT ?1"#,
        )?;

        let rows = stmt.query_map(duckdb::params![limit as i64], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, String>(4)?,
                row.get::<_, String>(5)?,
                row.get::<_, i64>(6)?,
            ))
        })?;

        let mut visits = Vec::new();
        for row in rows {
            let (ip, city, region, country, timezone, device, micros) = row?;
            let timestamp: DateTime<Utc> = DateTime::from_timestamp_micros(micros)
                .ok_or_else(|| anyhow!("visit_logs timestamp out of range: {micros}"))?;
            visits.push(RecentVisit {
                ip,
                city,
                region,
                country,
                timezone,
                device: device.parse::<Device>().unwrap_or_default(),
                timestamp,
            });
        }
        Ok(visits)
    }
}
