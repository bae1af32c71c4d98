//! PostgreSQL persistence adapters using Diesel ORM.
//!
//! Concrete `Repository` implementations backed by PostgreSQL through
//! `diesel-async` and a `bb8` pool. Enabled at runtime when `DATABASE_URL` is
//! set; otherwise the in-memory adapters stand in.
//!
//! Diesel row structs (`models.rs`) and table definitions (`schema.rs`) stay
//! private to this module. Every database failure is mapped to a domain
//! [`Error`](crate::domain::Error) before it leaves an adapter.
//!
//! # Example
//!
//! ```ignore
//! use research_backend::outbound::persistence::{DbPool, DieselUserRepository, PoolConfig};
//!
//! let pool = DbPool::new(PoolConfig::new("postgres://localhost/research")).await?;
//! let users = DieselUserRepository::new(pool, clock);
//! ```

mod diesel_basic_error_mapping;
mod diesel_catalogue_repository;
pub(crate) mod diesel_helpers;
mod diesel_user_repository;
mod models;
mod pool;
mod schema;

pub use diesel_catalogue_repository::DieselCatalogueRepository;
pub use diesel_user_repository::DieselUserRepository;
pub use pool::{DbPool, MIN_POOL_SIZE, PoolConfig, PoolError};
