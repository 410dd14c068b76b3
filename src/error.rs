use thiserror::Error;

/// A reading that cannot be accepted. Never retried.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ValidationError {
    #[error("payload is not a JSON object: {0}")]
    Malformed(String),
    #[error("missing required field `{0}`")]
    MissingField(&'static str),
    #[error("field `{0}` must be a string")]
    NotText(&'static str),
    #[error("field `{0}` must be numeric")]
    NotNumeric(&'static str),
}

/// Transient failure talking to a persistence store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database operation failed: {0}")]
    Database(#[from] sqlx::Error),
    #[error("stored row is invalid: {0}")]
    Corrupt(String),
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Transient failure talking to a durable queue.
#[derive(Debug, Error)]
pub enum QueueError {
    #[error("queue backend failed: {0}")]
    Database(#[from] sqlx::Error),
    #[error("queue unavailable: {0}")]
    Unavailable(String),
}

/// Missing or unusable configuration. Aborts startup.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("{0} is required")]
    Missing(&'static str),
    #[error("{key} has an invalid value `{value}`")]
    Invalid { key: &'static str, value: String },
}
