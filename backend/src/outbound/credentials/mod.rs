//! Argon2id implementation of the credential hasher port.

use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::{Algorithm, Argon2, Params, Version};
use rand::RngCore;
use rand::rngs::OsRng;

use crate::domain::ports::{CredentialHasher, HashingError};

const SALT_LEN: usize = 16;

/// Argon2id cost parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Argon2Cost {
    /// Memory cost in KiB.
    pub memory_kib: u32,
    /// Number of passes.
    pub iterations: u32,
    /// Degree of parallelism.
    pub parallelism: u32,
}

impl Default for Argon2Cost {
    fn default() -> Self {
        Self {
            memory_kib: Params::DEFAULT_M_COST,
            iterations: Params::DEFAULT_T_COST,
            parallelism: Params::DEFAULT_P_COST,
        }
    }
}

/// Salted Argon2id hasher producing PHC strings.
#[derive(Clone)]
pub struct Argon2CredentialHasher {
    argon2: Argon2<'static>,
}

impl Argon2CredentialHasher {
    /// Build a hasher, rejecting cost parameters Argon2 does not accept.
    pub fn new(cost: Argon2Cost) -> Result<Self, HashingError> {
        let params = Params::new(cost.memory_kib, cost.iterations, cost.parallelism, None)
            .map_err(|err| HashingError::configuration(err.to_string()))?;
        Ok(Self {
            argon2: Argon2::new(Algorithm::Argon2id, Version::V0x13, params),
        })
    }
}

impl CredentialHasher for Argon2CredentialHasher {
    fn hash(&self, plain: &str) -> Result<String, HashingError> {
        let mut salt_bytes = [0_u8; SALT_LEN];
        OsRng.fill_bytes(&mut salt_bytes);
        let salt = SaltString::encode_b64(&salt_bytes)
            .map_err(|err| HashingError::hash(err.to_string()))?;
        self.argon2
            .hash_password(plain.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|err| HashingError::hash(err.to_string()))
    }

    fn verify(&self, plain: &str, hash: &str) -> bool {
        PasswordHash::new(hash)
            .is_ok_and(|parsed| self.argon2.verify_password(plain.as_bytes(), &parsed).is_ok())
    }
}

#[cfg(test)]
mod tests {
    //! Regression coverage for this module.
    use super::*;
    use rstest::{fixture, rstest};

    #[fixture]
    fn hasher() -> Argon2CredentialHasher {
        Argon2CredentialHasher::new(Argon2Cost {
            memory_kib: 1024,
            iterations: 1,
            parallelism: 1,
        })
        .expect("cheap test parameters")
    }

    #[rstest]
    fn hashes_are_salted_and_verifiable(hasher: Argon2CredentialHasher) {
        let first = hasher.hash("secret123").expect("hash");
        let second = hasher.hash("secret123").expect("hash");

        assert!(first.starts_with("$argon2id$"));
        assert_ne!(first, second);
        assert!(hasher.verify("secret123", &first));
        assert!(!hasher.verify("secret124", &first));
    }

    #[rstest]
    #[case("")]
    #[case("not-a-phc-string")]
    #[case("$argon2id$v=19$garbage")]
    fn malformed_hashes_never_verify(hasher: Argon2CredentialHasher, #[case] stored: &str) {
        assert!(!hasher.verify("secret123", stored));
    }

    #[rstest]
    fn rejects_zero_parallelism() {
        let result = Argon2CredentialHasher::new(Argon2Cost {
            parallelism: 0,
            ..Argon2Cost::default()
        });
        assert!(matches!(result, Err(HashingError::Configuration { .. })));
    }
}
