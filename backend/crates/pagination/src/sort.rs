//! `field:direction` sort parameters.

use std::fmt;
use std::str::FromStr;

use crate::error::PaginationError;

/// Ordering direction of a sort.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum SortDirection {
    /// Smallest first. Used when the direction is omitted.
    #[default]
    Asc,
    /// Largest first.
    Desc,
}

impl SortDirection {
    /// Upper-case keyword understood by SQL backends.
    #[must_use]
    pub const fn relational(self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }

    /// Lower-case keyword understood by the search backend.
    #[must_use]
    pub const fn search(self) -> &'static str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        }
    }
}

impl FromStr for SortDirection {
    type Err = PaginationError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        if raw.eq_ignore_ascii_case("asc") {
            Ok(Self::Asc)
        } else if raw.eq_ignore_ascii_case("desc") {
            Ok(Self::Desc)
        } else {
            Err(PaginationError::InvalidSort {
                value: raw.to_owned(),
            })
        }
    }
}

/// Parsed `sort` query parameter.
///
/// The field name is kept as supplied; callers resolve it against their own
/// field list (see [`SortSpec::resolve_field`]).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortSpec {
    field: String,
    direction: SortDirection,
}

impl SortSpec {
    /// Build a sort from parts.
    #[must_use]
    pub fn new(field: impl Into<String>, direction: SortDirection) -> Self {
        Self {
            field: field.into(),
            direction,
        }
    }

    /// Parse `field` or `field:direction`.
    ///
    /// # Errors
    /// Returns [`PaginationError::InvalidSort`] when the field is empty, the
    /// direction is unknown, or more than one `:` separator is present.
    ///
    /// # Examples
    /// ```
    /// use pagination::{SortDirection, SortSpec};
    ///
    /// let sort = SortSpec::parse("createdAt:DESC").expect("valid sort");
    /// assert_eq!(sort.field(), "createdAt");
    /// assert_eq!(sort.direction(), SortDirection::Desc);
    /// assert_eq!(SortSpec::parse("title").expect("bare field").direction(), SortDirection::Asc);
    /// ```
    pub fn parse(raw: &str) -> Result<Self, PaginationError> {
        let invalid = || PaginationError::InvalidSort {
            value: raw.to_owned(),
        };
        let trimmed = raw.trim();
        let mut parts = trimmed.split(':');
        let field = parts.next().map(str::trim).unwrap_or_default();
        if field.is_empty() {
            return Err(invalid());
        }
        let direction = match parts.next().map(str::trim) {
            None | Some("") => SortDirection::Asc,
            Some(keyword) => keyword.parse().map_err(|_| invalid())?,
        };
        if parts.next().is_some() {
            return Err(invalid());
        }
        Ok(Self::new(field, direction))
    }

    /// Field name as supplied.
    #[must_use]
    pub fn field(&self) -> &str {
        &self.field
    }

    /// Ordering direction.
    #[must_use]
    pub const fn direction(&self) -> SortDirection {
        self.direction
    }

    /// Direction keyword for SQL backends (`ASC`/`DESC`).
    #[must_use]
    pub const fn relational_direction(&self) -> &'static str {
        self.direction.relational()
    }

    /// `field:asc` / `field:desc` clause for the search backend.
    #[must_use]
    pub fn search_clause(&self) -> String {
        format!("{}:{}", self.field, self.direction.search())
    }

    /// Resolve the field name with `lookup`, failing when it is unknown.
    ///
    /// # Errors
    /// Returns [`PaginationError::UnknownSortField`] when `lookup` yields
    /// `None`.
    pub fn resolve_field<F>(
        &self,
        lookup: impl FnOnce(&str) -> Option<F>,
    ) -> Result<(F, SortDirection), PaginationError> {
        lookup(&self.field)
            .map(|field| (field, self.direction))
            .ok_or_else(|| PaginationError::UnknownSortField {
                field: self.field.clone(),
            })
    }
}

impl fmt::Display for SortSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.field, self.direction.search())
    }
}
