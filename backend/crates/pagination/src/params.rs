//! Raw list query parameters and their validated form.

use serde::Deserialize;

use crate::error::PaginationErrors;
use crate::limits::PaginationLimits;
use crate::sort::SortSpec;
use crate::window::PageWindow;

/// `limit`, `page` and `sort` exactly as they arrived on the query string.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct PageParams {
    /// Requested page size.
    pub limit: Option<String>,
    /// Requested one-based page number.
    pub page: Option<String>,
    /// Requested ordering, `field` or `field:direction`.
    pub sort: Option<String>,
}

impl PageParams {
    /// Collect raw parameters.
    #[must_use]
    pub fn new(limit: Option<&str>, page: Option<&str>, sort: Option<&str>) -> Self {
        Self {
            limit: limit.map(str::to_owned),
            page: page.map(str::to_owned),
            sort: sort.map(str::to_owned),
        }
    }

    /// Validate every parameter against `limits`.
    ///
    /// A blank `sort` means insertion order.
    ///
    /// # Errors
    /// Returns all failing parameters keyed by name.
    pub fn resolve(&self, limits: &PaginationLimits) -> Result<PageRequest, PaginationErrors> {
        let (window, mut errors) =
            match PageWindow::compute(limits, self.limit.as_deref(), self.page.as_deref()) {
                Ok(window) => (window, PaginationErrors::new()),
                Err(errors) => (PageWindow::first(limits), errors),
            };
        let sort = self
            .sort
            .as_deref()
            .map(str::trim)
            .filter(|raw| !raw.is_empty())
            .and_then(|raw| {
                SortSpec::parse(raw)
                    .map_err(|error| errors.insert("sort", error))
                    .ok()
            });
        errors.into_result(PageRequest { window, sort })
    }
}

/// Validated page window plus optional ordering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    window: PageWindow,
    sort: Option<SortSpec>,
}

impl PageRequest {
    /// Build a request from validated parts.
    #[must_use]
    pub const fn new(window: PageWindow, sort: Option<SortSpec>) -> Self {
        Self { window, sort }
    }

    /// Offset/limit of the page.
    #[must_use]
    pub const fn window(&self) -> &PageWindow {
        &self.window
    }

    /// Requested ordering, if any.
    #[must_use]
    pub const fn sort(&self) -> Option<&SortSpec> {
        self.sort.as_ref()
    }

    /// Split into window and sort.
    #[must_use]
    pub fn into_parts(self) -> (PageWindow, Option<SortSpec>) {
        (self.window, self.sort)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{PaginationError, SortDirection};
    use rstest::rstest;

    #[rstest]
    fn resolves_window_and_sort() {
        let request = PageParams::new(Some("30"), Some("2"), Some("email:desc"))
            .resolve(&PaginationLimits::default())
            .expect("valid parameters");

        assert_eq!(request.window().skip(), 30);
        let sort = request.sort().expect("sort present");
        assert_eq!(sort.field(), "email");
        assert_eq!(sort.direction(), SortDirection::Desc);
    }

    #[rstest]
    #[case(None)]
    #[case(Some(""))]
    fn blank_sort_means_insertion_order(#[case] sort: Option<&str>) {
        let request = PageParams::new(None, None, sort)
            .resolve(&PaginationLimits::default())
            .expect("valid parameters");
        assert!(request.sort().is_none());
    }

    #[rstest]
    fn aggregates_window_and_sort_failures() {
        let errors = PageParams::new(Some("5"), Some("0"), Some("title:up"))
            .resolve(&PaginationLimits::default())
            .expect_err("three invalid parameters");

        assert_eq!(errors.len(), 3);
        assert_eq!(
            errors.get("limit"),
            Some(&PaginationError::BelowMinimum { min: 10 })
        );
        assert_eq!(errors.get("page"), Some(&PaginationError::NonPositivePage));
        assert!(matches!(
            errors.get("sort"),
            Some(PaginationError::InvalidSort { .. })
        ));
    }

    #[rstest]
    fn deserialises_from_query_like_json() {
        let params: PageParams =
            serde_json::from_str(r#"{"limit":"20","page":"1"}"#).expect("deserialise params");
        assert_eq!(params, PageParams::new(Some("20"), Some("1"), None));
    }
}
