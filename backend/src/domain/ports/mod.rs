//! Domain ports and supporting types for the hexagonal boundary.

mod macros;
pub(crate) use macros::define_port_error;

mod credential_hasher;
mod notifier;
mod repository;
mod search_index;
mod token_service;

#[cfg(test)]
pub use credential_hasher::MockCredentialHasher;
#[cfg(any(test, feature = "test-support"))]
pub use credential_hasher::FixtureCredentialHasher;
pub use credential_hasher::{CredentialHasher, HashingError, verify_blocking};
pub(crate) use credential_hasher::map_hashing_error;
#[cfg(test)]
pub use notifier::MockNotifier;
pub use notifier::{EmailMessage, Notifier, NotifierError};
pub use repository::{
    DuplicateException, HookStage, PersistHook, Precondition, Repository, run_persist_hook,
};
pub use search_index::{
    SEARCH_SORT_FIELDS, SearchDocument, SearchHits, SearchIndex, SearchIndexError,
};
pub(crate) use search_index::map_search_error;
#[cfg(test)]
pub use token_service::MockTokenService;
pub use token_service::{TokenClaims, TokenError, TokenPurpose, TokenService};
pub(crate) use token_service::map_token_error;
