//! Configured bounds for items per page.

/// Rejected limit configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LimitsError {
    /// The minimum must allow at least one item per page.
    #[error("minimum items per page must be at least 1")]
    ZeroMinimum,
    /// The minimum exceeds the maximum.
    #[error("minimum items per page ({min}) exceeds maximum ({max})")]
    Inverted {
        /// Requested minimum.
        min: u32,
        /// Requested maximum.
        max: u32,
    },
}

/// Inclusive bounds for the `limit` parameter.
///
/// The minimum doubles as the default page size when `limit` is omitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaginationLimits {
    min_items_per_page: u32,
    max_items_per_page: u32,
}

/// Default minimum (and default page size).
pub(crate) const DEFAULT_MIN_ITEMS_PER_PAGE: u32 = 10;
/// Default maximum.
pub(crate) const DEFAULT_MAX_ITEMS_PER_PAGE: u32 = 100;

impl PaginationLimits {
    /// Validate and construct limits.
    ///
    /// # Errors
    /// Returns [`LimitsError`] when `min` is zero or larger than `max`.
    pub const fn new(min: u32, max: u32) -> Result<Self, LimitsError> {
        if min == 0 {
            return Err(LimitsError::ZeroMinimum);
        }
        if min > max {
            return Err(LimitsError::Inverted { min, max });
        }
        Ok(Self {
            min_items_per_page: min,
            max_items_per_page: max,
        })
    }

    /// Smallest accepted `limit`, also used when `limit` is absent.
    #[must_use]
    pub const fn min_items_per_page(&self) -> u32 {
        self.min_items_per_page
    }

    /// Largest accepted `limit`.
    #[must_use]
    pub const fn max_items_per_page(&self) -> u32 {
        self.max_items_per_page
    }
}

impl Default for PaginationLimits {
    fn default() -> Self {
        Self {
            min_items_per_page: DEFAULT_MIN_ITEMS_PER_PAGE,
            max_items_per_page: DEFAULT_MAX_ITEMS_PER_PAGE,
        }
    }
}
