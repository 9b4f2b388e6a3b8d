pub mod backend;
pub mod schema;
pub mod visits;

pub use backend::DuckDbBackend;

/// Re-export the `duckdb` crate so tests can use
/// `visitlog_duckdb::duckdb::params!` without an extra dependency.
pub use duckdb;
