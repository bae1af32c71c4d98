//! Validation failures raised while resolving page parameters.

use std::collections::BTreeMap;
use std::fmt;

/// A single invalid pagination parameter.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PaginationError {
    /// The value could not be parsed as an integer.
    #[error("{field} must be a number")]
    InvalidParameter {
        /// Name of the offending query parameter.
        field: &'static str,
    },
    /// `limit` is smaller than the configured minimum.
    #[error("limit must be at least {min}")]
    BelowMinimum {
        /// Configured minimum items per page.
        min: u32,
    },
    /// `limit` is larger than the configured maximum.
    #[error("limit must be at most {max}")]
    AboveMaximum {
        /// Configured maximum items per page.
        max: u32,
    },
    /// `page` is zero or negative.
    #[error("page must be greater than 0")]
    NonPositivePage,
    /// `sort` is not of the form `field:direction`.
    #[error("sort must look like field:asc or field:desc, got {value:?}")]
    InvalidSort {
        /// The raw sort value supplied by the caller.
        value: String,
    },
    /// `sort` names a field the collection cannot be ordered by.
    #[error("cannot sort by unknown field {field:?}")]
    UnknownSortField {
        /// The unrecognised field name.
        field: String,
    },
}

/// Every pagination failure of one request, keyed by parameter name.
///
/// ## Invariants
/// - Holds at most one error per parameter.
/// - Never constructed empty by this crate.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PaginationErrors(BTreeMap<&'static str, PaginationError>);

impl PaginationErrors {
    /// Create an empty error map.
    #[must_use]
    pub const fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// Record an error for `field`, replacing any previous one.
    pub fn insert(&mut self, field: &'static str, error: PaginationError) {
        self.0.insert(field, error);
    }

    /// Error recorded for `field`, if any.
    #[must_use]
    pub fn get(&self, field: &str) -> Option<&PaginationError> {
        self.0.get(field)
    }

    /// Whether no parameter failed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of failing parameters.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Iterate failures in parameter-name order.
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &PaginationError)> {
        self.0.iter().map(|(field, error)| (*field, error))
    }

    /// Render the failures as a field → message map for response bodies.
    #[must_use]
    pub fn field_messages(&self) -> BTreeMap<String, String> {
        self.0
            .iter()
            .map(|(field, error)| ((*field).to_owned(), error.to_string()))
            .collect()
    }

    pub(crate) fn into_result<T>(self, value: T) -> Result<T, Self> {
        if self.is_empty() { Ok(value) } else { Err(self) }
    }
}

impl fmt::Display for PaginationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (field, error) in &self.0 {
            if !first {
                f.write_str("; ")?;
            }
            write!(f, "{field}: {error}")?;
            first = false;
        }
        Ok(())
    }
}

impl std::error::Error for PaginationErrors {}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn display_joins_fields_in_name_order() {
        let mut errors = PaginationErrors::new();
        errors.insert("page", PaginationError::NonPositivePage);
        errors.insert("limit", PaginationError::BelowMinimum { min: 10 });

        assert_eq!(
            errors.to_string(),
            "limit: limit must be at least 10; page: page must be greater than 0"
        );
    }

    #[rstest]
    fn field_messages_key_by_parameter() {
        let mut errors = PaginationErrors::new();
        errors.insert("limit", PaginationError::InvalidParameter { field: "limit" });

        let messages = errors.field_messages();
        assert_eq!(messages.get("limit").map(String::as_str), Some("limit must be a number"));
        assert_eq!(errors.len(), 1);
    }
}
