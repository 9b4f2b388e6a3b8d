/// DuckDB initialization SQL.
///
/// Executed once when the backend is opened via `Connection::execute_batch`.
/// Every statement uses `IF NOT EXISTS`, so reopening an existing file is a
/// no-op apart from the session settings.
///
/// `name` is the primary key of `visitor_counters`: the counter is a
/// singleton per name, and the upsert in [`crate::visits`] relies on it.
pub fn init_sql(memory_limit: &str) -> String {
    format!(
        r#"SET memory_limit = '{memory_limit}';
SET threads = 2;

-- ===========================================
-- VISITOR COUNTERS
-- ===========================================
CREATE TABLE IF NOT EXISTS visitor_counters (
    name            VARCHAR PRIMARY KEY,
    "count"         BIGINT NOT NULL DEFAULT 0
);

-- ===========================================
-- VISIT LOG (append-only)
-- ===========================================
CREATE TABLE IF NOT EXISTS visit_logs (
    id              VARCHAR PRIMARY KEY,           -- uuid v4
    "timestamp"     TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
    ip              VARCHAR NOT NULL DEFAULT 'unknown',
    user_agent      VARCHAR NOT NULL DEFAULT 'unknown',
    device          VARCHAR NOT NULL DEFAULT 'desktop',  -- mobile | tablet | desktop
    city            VARCHAR NOT NULL DEFAULT 'unknown',
    region          VARCHAR NOT NULL DEFAULT 'unknown',
    country         VARCHAR NOT NULL DEFAULT 'unknown',
    timezone        VARCHAR NOT NULL DEFAULT 'unknown'
);
CREATE INDEX IF NOT EXISTS idx_visit_logs_timestamp ON visit_logs("timestamp");
"#
    )
}
