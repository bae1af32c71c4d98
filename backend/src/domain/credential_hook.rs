//! Pre-persist hook replacing plain-text passwords with hashes.

use std::sync::Arc;

use super::Error;
use super::entity::{FieldMap, FieldValue};
use super::ports::{CredentialHasher, PersistHook, map_hashing_error};
use super::user::{User, UserField};

/// Hashes the `password` field on insert and whenever a patch changes it.
#[derive(Clone)]
pub struct CredentialHashingHook {
    hasher: Arc<dyn CredentialHasher>,
}

impl CredentialHashingHook {
    /// Wrap a hasher.
    pub fn new(hasher: Arc<dyn CredentialHasher>) -> Self {
        Self { hasher }
    }

    fn hash_password(&self, fields: &mut FieldMap<UserField>) -> Result<(), Error> {
        let Some(value) = fields.get_mut(&UserField::Password) else {
            return Ok(());
        };
        let Some(plain) = value.as_text() else {
            return Err(Error::invalid_field("password", "password must be text"));
        };
        let hash = self.hasher.hash(plain).map_err(map_hashing_error)?;
        *value = FieldValue::Text(hash);
        Ok(())
    }
}

impl PersistHook<User> for CredentialHashingHook {
    fn before_create(&self, fields: &mut FieldMap<UserField>) -> Result<(), Error> {
        self.hash_password(fields)
    }

    fn before_update(&self, patch: &mut FieldMap<UserField>) -> Result<(), Error> {
        self.hash_password(patch)
    }
}
