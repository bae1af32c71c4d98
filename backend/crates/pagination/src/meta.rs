//! Result envelopes describing one page of a collection.

use serde::{Deserialize, Serialize};

use crate::window::PageWindow;

/// Page metadata returned alongside every list response.
///
/// `total_page` is `ceil(total_items / items_per_page)`; an empty
/// collection therefore reports zero pages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginationMeta {
    /// One-based page number that was served.
    pub current_page: u64,
    /// Page size used for the query.
    pub items_per_page: u32,
    /// Number of items matching the query across all pages.
    pub total_items: u64,
    /// Number of pages needed to serve `total_items`.
    pub total_page: u64,
}

impl PaginationMeta {
    /// Build metadata for `window` over a collection of `total_items`.
    #[must_use]
    pub fn new(total_items: u64, window: &PageWindow) -> Self {
        Self::from_parts(total_items, window.items_per_page(), window.current_page())
    }

    /// Build metadata from raw values.
    ///
    /// # Examples
    /// ```
    /// use pagination::PaginationMeta;
    ///
    /// let meta = PaginationMeta::from_parts(21, 10, 1);
    /// assert_eq!(meta.total_page, 3);
    /// ```
    #[must_use]
    pub fn from_parts(total_items: u64, items_per_page: u32, current_page: u64) -> Self {
        let per_page = u64::from(items_per_page);
        let total_page = if per_page == 0 {
            0
        } else {
            total_items.div_ceil(per_page)
        };
        Self {
            current_page,
            items_per_page,
            total_items,
            total_page,
        }
    }
}

/// One page of `T` plus its metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Paginated<T> {
    /// Items on this page, at most `items_per_page` long.
    pub data: Vec<T>,
    /// Metadata for the page.
    pub pagination: PaginationMeta,
}

impl<T> Paginated<T> {
    /// Wrap a page of items.
    #[must_use]
    pub const fn new(data: Vec<T>, pagination: PaginationMeta) -> Self {
        Self { data, pagination }
    }

    /// Transform every item while keeping the metadata.
    #[must_use]
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Paginated<U> {
        Paginated {
            data: self.data.into_iter().map(f).collect(),
            pagination: self.pagination,
        }
    }

    /// Fallible [`Paginated::map`].
    ///
    /// # Errors
    /// Returns the first error produced by `f`.
    pub fn try_map<U, E>(self, f: impl FnMut(T) -> Result<U, E>) -> Result<Paginated<U>, E> {
        Ok(Paginated {
            data: self.data.into_iter().map(f).collect::<Result<_, _>>()?,
            pagination: self.pagination,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::PaginationLimits;
    use rstest::rstest;
    use serde_json::json;

    #[rstest]
    #[case(0, 10, 0)]
    #[case(1, 10, 1)]
    #[case(10, 10, 1)]
    #[case(11, 10, 2)]
    #[case(95, 20, 5)]
    fn total_page_rounds_up(#[case] total: u64, #[case] per_page: u32, #[case] expected: u64) {
        assert_eq!(
            PaginationMeta::from_parts(total, per_page, 1).total_page,
            expected
        );
    }

    #[rstest]
    fn serialises_with_camel_case_keys() {
        let window = PageWindow::compute(&PaginationLimits::default(), Some("10"), Some("2"))
            .expect("valid window");
        let page = Paginated::new(vec!["a"], PaginationMeta::new(11, &window));

        let value = serde_json::to_value(&page).expect("serialise page");
        assert_eq!(
            value,
            json!({
                "data": ["a"],
                "pagination": {
                    "currentPage": 2,
                    "itemsPerPage": 10,
                    "totalItems": 11,
                    "totalPage": 2
                }
            })
        );
    }

    #[rstest]
    fn try_map_stops_at_first_failure() {
        let page = Paginated::new(vec!["1", "x", "3"], PaginationMeta::from_parts(3, 10, 1));
        let mapped = page.try_map(str::parse::<u8>);
        assert!(mapped.is_err());
    }
}
