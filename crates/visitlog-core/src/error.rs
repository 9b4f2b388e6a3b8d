use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set to the store connection string")]
    MissingDatabaseUrl(&'static str),

    #[error("invalid {key}: {reason}")]
    InvalidVar { key: &'static str, reason: String },

    #[error("unsupported connection string: {0}")]
    UnsupportedDatabaseUrl(String),
}
