//! Shared mapping from pool and Diesel failures to domain errors.

use diesel::result::{DatabaseErrorKind, Error as DieselError};
use tracing::debug;

use crate::domain::Error;

use super::pool::PoolError;

/// Failure inside a repository transaction.
///
/// Preconditions and entity validation surface domain errors that must roll
/// the transaction back without being re-mapped.
#[derive(Debug)]
pub(crate) enum TxError {
    Diesel(DieselError),
    Domain(Error),
}

impl From<DieselError> for TxError {
    fn from(error: DieselError) -> Self {
        Self::Diesel(error)
    }
}

impl From<Error> for TxError {
    fn from(error: Error) -> Self {
        Self::Domain(error)
    }
}

impl TxError {
    pub(crate) fn into_domain(self, entity: &str) -> Error {
        match self {
            Self::Diesel(error) => map_diesel_error(error, entity),
            Self::Domain(error) => error,
        }
    }
}

/// Pool exhaustion and connection failures are transient.
pub(crate) fn map_pool_error(error: PoolError) -> Error {
    let message = match error {
        PoolError::Checkout { message } | PoolError::Build { message } => message,
    };
    debug!(%message, "database pool unavailable");
    Error::service_unavailable("database unavailable")
}

/// Map Diesel failures for `entity` into domain errors.
///
/// Constraint violations become conflicts phrased for `entity`; connection
/// loss is reported as unavailable and everything else as internal.
pub(crate) fn map_diesel_error(error: DieselError, entity: &str) -> Error {
    match &error {
        DieselError::DatabaseError(kind, info) => {
            debug!(?kind, message = info.message(), entity, "diesel operation failed");
        }
        _ => debug!(
            error_type = %std::any::type_name_of_val(&error),
            entity,
            "diesel operation failed"
        ),
    }

    match error {
        DieselError::NotFound => Error::not_found(format!("{entity} not found")),
        DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _) => {
            Error::conflict(format!("{entity} already exists"))
        }
        DieselError::DatabaseError(DatabaseErrorKind::ForeignKeyViolation, _) => {
            Error::conflict(format!("{entity} conflicts with a related record"))
        }
        DieselError::DatabaseError(DatabaseErrorKind::ClosedConnection, _) => {
            Error::service_unavailable("database connection error")
        }
        DieselError::QueryBuilderError(_) => Error::internal("database query error"),
        _ => Error::internal("database error"),
    }
}
