//! Small conversions shared by the Diesel repositories.

use pagination::{PageWindow, PaginationMeta};

/// `OFFSET` / `LIMIT` operand; saturates at `i64::MAX`.
pub(crate) fn sql_bound(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

/// `(offset, limit)` for `window`.
pub(crate) fn window_bounds(window: &PageWindow) -> (i64, i64) {
    (
        sql_bound(window.skip()),
        sql_bound(u64::from(window.items_per_page())),
    )
}

/// Pagination block for a `COUNT(*)` result.
pub(crate) fn page_meta(total: i64, window: &PageWindow) -> PaginationMeta {
    PaginationMeta::new(u64::try_from(total).unwrap_or_default(), window)
}

#[cfg(test)]
mod tests {
    //! Regression coverage for this module.
    use super::*;
    use pagination::PaginationLimits;
    use rstest::rstest;

    #[rstest]
    fn bounds_follow_the_window() {
        let window = PageWindow::compute(&PaginationLimits::default(), Some("20"), Some("3"))
            .expect("valid window");
        assert_eq!(window_bounds(&window), (40, 20));
    }

    #[rstest]
    fn oversized_offsets_saturate() {
        assert_eq!(sql_bound(u64::MAX), i64::MAX);
    }

    #[rstest]
    fn negative_counts_are_treated_as_empty() {
        let window = PageWindow::first(&PaginationLimits::default());
        assert_eq!(page_meta(-1, &window).total_items, 0);
    }
}
