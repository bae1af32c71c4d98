//! Outbound adapters implementing domain ports for external infrastructure.
//!
//! - **persistence**: PostgreSQL-backed repositories using Diesel ORM
//! - **memory**: process-local repository and search index
//! - **credentials**: Argon2id credential hasher
//! - **tokens**: HMAC-signed JWT token service
//! - **notifier**: log-only email notifier
//!
//! Adapters are thin translators that convert between domain types and
//! infrastructure-specific representations. They contain no business logic.

pub mod credentials;
pub mod memory;
pub mod notifier;
pub mod persistence;
pub mod tokens;
