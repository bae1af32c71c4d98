//! Domain primitives, entities and services.
//!
//! Purpose: define strongly typed entities and the services that drive the
//! account lifecycle and catalogue maintenance. Services talk to the outside
//! world only through the traits in [`ports`].
//!
//! Public surface:
//! - Error / ErrorCode: error payload and stable identifiers.
//! - Entity / Criteria / FindQuery: the generic repository vocabulary.
//! - User, CatalogueEntry: persisted entities.
//! - AuthService, CatalogueService: application services.

pub mod auth;
pub mod auth_service;
pub mod catalogue;
pub mod catalogue_service;
pub mod credential_hook;
pub mod entity;
pub mod error;
pub mod links;
pub mod ports;
pub mod trace_id;
pub mod user;

pub use self::auth::{
    Credentials, MAX_PASSWORD_LENGTH, MIN_PASSWORD_LENGTH, ResetLinkOutcome, SignInOutcome,
    SignInStatus, SignUpOutcome, SignUpRequest,
};
pub use self::auth_service::{AuthPorts, AuthService, DEFAULT_PASSWORD_RESET_TTL};
pub use self::catalogue::{CatalogueEntry, CatalogueField, CatalogueKind};
pub use self::catalogue_service::{CatalogueService, ChildReferences, ParentLock, RelationCheck};
pub use self::credential_hook::CredentialHashingHook;
pub use self::entity::{
    Criteria, Entity, EntityField, FieldErrors, FieldListError, FieldMap, FieldValue, FindQuery,
    field_map_from_json, retain_fillable, validate_field_lists,
};
pub use self::error::{Error, ErrorCode, ErrorValidationError};
pub use self::links::AppLinks;
pub use self::trace_id::TraceId;
pub use self::user::{Email, User, UserField};
