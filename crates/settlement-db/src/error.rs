//! Error types for the data layer.
//!
//! All errors are propagated via [`DbError`], which wraps the underlying
//! [`sqlx`] errors with additional context about which operation failed.
//! Transient connection failures are distinguished from query/constraint
//! failures so the retry-with-backoff wrapper in `postgres` knows which
//! errors are worth retrying.

/// Errors that can occur in the data layer.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    /// A `PostgreSQL` query or constraint failed.
    #[error("PostgreSQL error: {0}")]
    Postgres(#[from] sqlx::Error),

    /// A `PostgreSQL` migration failed.
    #[error("PostgreSQL migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// A serialization or deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The requested row was not found.
    #[error("row not found: {0}")]
    NotFound(String),

    /// A configuration error, e.g. an unparsable database URL.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The connection pool is unavailable after exhausting retries.
    /// Maps to the Transient/`STORE_UNAVAILABLE` kind.
    #[error("store unavailable after {attempts} attempts: {source}")]
    Unavailable {
        /// Number of attempts made before giving up.
        attempts: u32,
        /// The last error observed.
        #[source]
        source: sqlx::Error,
    },
}

impl DbError {
    /// Return whether this error represents a transient condition worth
    /// retrying (connection reset, pool exhaustion, timeout) as opposed to
    /// a query or constraint failure that will not resolve by retrying.
    pub const fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::Unavailable { .. } | Self::Postgres(sqlx::Error::PoolTimedOut)
        )
    }
}
