//! Offset/limit arithmetic for a single page.

use crate::error::{PaginationError, PaginationErrors};
use crate::limits::PaginationLimits;

/// Validated offset/limit instructions for one page of results.
///
/// ## Invariants
/// - `items_per_page` lies within the limits it was computed against.
/// - `current_page >= 1`.
/// - `skip == items_per_page * (current_page - 1)`, saturating.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    items_per_page: u32,
    current_page: u64,
    skip: u64,
}

impl PageWindow {
    /// Validate raw `limit`/`page` strings and compute the window.
    ///
    /// Absent or blank values fall back to the minimum page size and the
    /// first page. Every invalid parameter is reported, not only the first.
    ///
    /// # Errors
    /// Returns [`PaginationErrors`] keyed by `limit` and/or `page`.
    ///
    /// # Examples
    /// ```
    /// use pagination::{PageWindow, PaginationLimits};
    ///
    /// let window = PageWindow::compute(&PaginationLimits::default(), Some("25"), Some("2"))
    ///     .expect("valid window");
    /// assert_eq!(window.skip(), 25);
    /// ```
    pub fn compute(
        limits: &PaginationLimits,
        limit: Option<&str>,
        page: Option<&str>,
    ) -> Result<Self, PaginationErrors> {
        let mut errors = PaginationErrors::new();
        let items_per_page = match parse_limit(limits, limit) {
            Ok(items) => items,
            Err(error) => {
                errors.insert("limit", error);
                limits.min_items_per_page()
            }
        };
        let current_page = match parse_page(page) {
            Ok(current) => current,
            Err(error) => {
                errors.insert("page", error);
                1
            }
        };
        errors.into_result(Self::from_validated(items_per_page, current_page))
    }

    /// First page at the default (minimum) page size.
    #[must_use]
    pub fn first(limits: &PaginationLimits) -> Self {
        Self::from_validated(limits.min_items_per_page(), 1)
    }

    fn from_validated(items_per_page: u32, current_page: u64) -> Self {
        let skip = u64::from(items_per_page).saturating_mul(current_page.saturating_sub(1));
        Self {
            items_per_page,
            current_page,
            skip,
        }
    }

    /// Number of items per page.
    #[must_use]
    pub const fn items_per_page(&self) -> u32 {
        self.items_per_page
    }

    /// One-based page number.
    #[must_use]
    pub const fn current_page(&self) -> u64 {
        self.current_page
    }

    /// Number of items to skip before this page starts.
    #[must_use]
    pub const fn skip(&self) -> u64 {
        self.skip
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|raw| !raw.is_empty())
}

fn parse_limit(limits: &PaginationLimits, raw: Option<&str>) -> Result<u32, PaginationError> {
    let Some(text) = non_blank(raw) else {
        return Ok(limits.min_items_per_page());
    };
    let requested: i64 = text
        .parse()
        .map_err(|_| PaginationError::InvalidParameter { field: "limit" })?;
    if requested < i64::from(limits.min_items_per_page()) {
        return Err(PaginationError::BelowMinimum {
            min: limits.min_items_per_page(),
        });
    }
    if requested > i64::from(limits.max_items_per_page()) {
        return Err(PaginationError::AboveMaximum {
            max: limits.max_items_per_page(),
        });
    }
    u32::try_from(requested).map_err(|_| PaginationError::AboveMaximum {
        max: limits.max_items_per_page(),
    })
}

fn parse_page(raw: Option<&str>) -> Result<u64, PaginationError> {
    let Some(text) = non_blank(raw) else {
        return Ok(1);
    };
    let requested: i64 = text
        .parse()
        .map_err(|_| PaginationError::InvalidParameter { field: "page" })?;
    u64::try_from(requested)
        .ok()
        .filter(|page| *page > 0)
        .ok_or(PaginationError::NonPositivePage)
}
