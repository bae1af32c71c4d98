//! bb8 pool of `diesel-async` PostgreSQL connections.
//!
//! Repositories share one [`DbPool`]; checkouts are bounded by the configured
//! timeout so a saturated database surfaces as `ServiceUnavailable` rather
//! than a hung request.
//!
//! A category delete holds one connection for its transaction while the
//! relation guard counts children on another, so the pool never runs with
//! fewer than [`MIN_POOL_SIZE`] connections.

use std::time::Duration;

use diesel_async::AsyncPgConnection;
use diesel_async::pooled_connection::AsyncDieselConnectionManager;
use diesel_async::pooled_connection::bb8::{Pool, PooledConnection};

/// Smallest pool that lets a guarded delete make progress.
pub const MIN_POOL_SIZE: u32 = 2;

/// Errors raised while building or using the pool.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PoolError {
    /// No connection became available in time.
    #[error("failed to get connection from pool: {message}")]
    Checkout { message: String },

    /// The pool could not be constructed.
    #[error("failed to build connection pool: {message}")]
    Build { message: String },
}

impl PoolError {
    /// Checkout failure.
    pub fn checkout(message: impl Into<String>) -> Self {
        Self::Checkout {
            message: message.into(),
        }
    }

    /// Construction failure.
    pub fn build(message: impl Into<String>) -> Self {
        Self::Build {
            message: message.into(),
        }
    }
}

/// Pool sizing and the `DATABASE_URL` to connect to.
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use research_backend::outbound::persistence::PoolConfig;
///
/// let config = PoolConfig::new("postgres://localhost/research")
///     .with_max_size(4)
///     .with_connection_timeout(Duration::from_secs(5));
/// assert_eq!(config.database_url(), "postgres://localhost/research");
/// ```
#[derive(Debug, Clone)]
pub struct PoolConfig {
    database_url: String,
    max_size: u32,
    min_idle: Option<u32>,
    connection_timeout: Duration,
}

impl PoolConfig {
    /// Ten connections, two idle, thirty second checkout timeout.
    pub fn new(database_url: impl Into<String>) -> Self {
        Self {
            database_url: database_url.into(),
            max_size: 10,
            min_idle: Some(2),
            connection_timeout: Duration::from_secs(30),
        }
    }

    /// Upper bound on open connections.
    #[must_use]
    pub fn with_max_size(mut self, max_size: u32) -> Self {
        self.max_size = max_size;
        self
    }

    /// Idle connections kept warm.
    #[must_use]
    pub fn with_min_idle(mut self, min_idle: Option<u32>) -> Self {
        self.min_idle = min_idle;
        self
    }

    /// How long a checkout may wait.
    #[must_use]
    pub fn with_connection_timeout(mut self, timeout: Duration) -> Self {
        self.connection_timeout = timeout;
        self
    }

    /// Connection string.
    pub fn database_url(&self) -> &str {
        &self.database_url
    }
}

/// Shared handle to the connection pool.
#[derive(Clone)]
pub struct DbPool {
    inner: Pool<AsyncPgConnection>,
}

impl DbPool {
    /// Build the pool, opening `min_idle` connections up front.
    ///
    /// # Errors
    ///
    /// Returns [`PoolError::Build`] when the pool is smaller than
    /// [`MIN_POOL_SIZE`], the URL is invalid or the initial connections fail.
    pub async fn new(config: PoolConfig) -> Result<Self, PoolError> {
        if config.max_size < MIN_POOL_SIZE {
            return Err(PoolError::build(format!(
                "pool needs at least {MIN_POOL_SIZE} connections, got {}",
                config.max_size
            )));
        }
        let manager = AsyncDieselConnectionManager::<AsyncPgConnection>::new(&config.database_url);

        let pool = Pool::builder()
            .max_size(config.max_size)
            .min_idle(config.min_idle)
            .connection_timeout(config.connection_timeout)
            .build(manager)
            .await
            .map_err(|err| PoolError::build(err.to_string()))?;

        Ok(Self { inner: pool })
    }

    /// Check out a connection.
    ///
    /// # Errors
    ///
    /// Returns [`PoolError::Checkout`] when none frees up within the timeout.
    pub async fn get(&self) -> Result<PooledConnection<'_, AsyncPgConnection>, PoolError> {
        self.inner
            .get()
            .await
            .map_err(|err| PoolError::checkout(err.to_string()))
    }
}

#[cfg(test)]
mod tests {
    //! Regression coverage for this module.
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn defaults_suit_a_small_service() {
        let config = PoolConfig::new("postgres://localhost/research");

        assert_eq!(config.max_size, 10);
        assert_eq!(config.min_idle, Some(2));
        assert_eq!(config.connection_timeout, Duration::from_secs(30));
    }

    #[rstest]
    fn builders_override_defaults() {
        let config = PoolConfig::new("postgres://localhost/research")
            .with_max_size(2)
            .with_min_idle(None)
            .with_connection_timeout(Duration::from_secs(1));

        assert_eq!(config.max_size, 2);
        assert_eq!(config.min_idle, None);
        assert_eq!(config.connection_timeout, Duration::from_secs(1));
    }

    #[tokio::test]
    async fn undersized_pools_are_refused_before_connecting() {
        let config = PoolConfig::new("postgres://localhost/research").with_max_size(1);

        let Err(err) = DbPool::new(config).await else {
            panic!("single-connection pool should be refused");
        };
        assert!(matches!(err, PoolError::Build { .. }));
        assert!(err.to_string().contains("at least 2"));
    }

    #[rstest]
    #[case(PoolError::checkout("connection refused"), "connection refused")]
    #[case(PoolError::build("invalid URL"), "invalid URL")]
    fn errors_keep_their_cause(#[case] error: PoolError, #[case] cause: &str) {
        assert!(error.to_string().contains(cause));
    }
}
