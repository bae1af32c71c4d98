//! Port for one-way password hashing.
//!
//! Implementations are synchronous and CPU bound; callers move them onto the
//! blocking pool (see [`verify_blocking`] and the repository persist hook).

use std::sync::Arc;

use zeroize::Zeroizing;

use crate::domain::Error;

use super::define_port_error;

define_port_error! {
    /// Errors raised by credential hashers.
    pub enum HashingError {
        /// Hashing parameters were rejected.
        Configuration { message: String } => "password hashing misconfigured: {message}",
        /// Hashing itself failed.
        Hash { message: String } => "password hashing failed: {message}",
    }
}

/// One-way password hashing and verification.
#[cfg_attr(test, mockall::automock)]
pub trait CredentialHasher: Send + Sync {
    /// Produce a salted hash of `plain`.
    fn hash(&self, plain: &str) -> Result<String, HashingError>;

    /// Compare `plain` with a stored hash in constant time.
    ///
    /// Malformed hashes yield `false`.
    fn verify(&self, plain: &str, hash: &str) -> bool;
}

/// Reversible marker hasher for tests and fixtures.
#[cfg(any(test, feature = "test-support"))]
#[derive(Debug, Default, Clone, Copy)]
pub struct FixtureCredentialHasher;

#[cfg(any(test, feature = "test-support"))]
const FIXTURE_PREFIX: &str = "fixture$";

#[cfg(any(test, feature = "test-support"))]
impl CredentialHasher for FixtureCredentialHasher {
    fn hash(&self, plain: &str) -> Result<String, HashingError> {
        Ok(format!("{FIXTURE_PREFIX}{plain}"))
    }

    fn verify(&self, plain: &str, hash: &str) -> bool {
        hash.strip_prefix(FIXTURE_PREFIX) == Some(plain)
    }
}

pub(crate) fn map_hashing_error(error: HashingError) -> Error {
    match error {
        HashingError::Configuration { message } => {
            Error::service_unavailable(format!("credential hasher unavailable: {message}"))
        }
        HashingError::Hash { message } => Error::internal(format!("credential hashing failed: {message}")),
    }
}

/// Verify on the blocking pool.
pub async fn verify_blocking(
    hasher: Arc<dyn CredentialHasher>,
    plain: Zeroizing<String>,
    hash: String,
) -> Result<bool, Error> {
    tokio::task::spawn_blocking(move || hasher.verify(&plain, &hash))
        .await
        .map_err(|err| Error::internal(format!("verification task failed: {err}")))
}

#[cfg(test)]
mod tests {
    //! Regression coverage for this module.
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("secret123", true)]
    #[case("secret124", false)]
    fn fixture_hasher_round_trips(#[case] attempt: &str, #[case] expected: bool) {
        let hash = FixtureCredentialHasher.hash("secret123").expect("fixture hash");
        assert_eq!(FixtureCredentialHasher.verify(attempt, &hash), expected);
    }

    #[rstest]
    fn fixture_hasher_rejects_unprefixed_hashes() {
        assert!(!FixtureCredentialHasher.verify("secret123", "secret123"));
    }

    #[tokio::test]
    async fn verification_runs_off_the_async_worker() {
        let mut hasher = MockCredentialHasher::new();
        hasher
            .expect_verify()
            .returning(|plain, hash| plain == "secret123" && hash == "stored");

        let matches = verify_blocking(
            Arc::new(hasher),
            Zeroizing::new("secret123".to_owned()),
            "stored".to_owned(),
        )
        .await
        .expect("verification task completes");
        assert!(matches);
    }

    #[rstest]
    fn configuration_failures_are_unavailable() {
        let err = map_hashing_error(HashingError::configuration("memory cost too low"));
        assert_eq!(err.code(), crate::domain::ErrorCode::ServiceUnavailable);
    }
}
