//! Page window arithmetic and pagination envelopes shared by list endpoints.
//!
//! Raw `limit`, `page` and `sort` query parameters arrive as strings. This
//! crate validates them against configured [`PaginationLimits`], reporting
//! every offending field at once through [`PaginationErrors`], and produces a
//! [`PageWindow`] (offset/limit) plus an optional [`SortSpec`].
//!
//! Repositories answer with a [`Paginated`] envelope whose
//! [`PaginationMeta`] is recomputed for every request.
//!
//! # Examples
//!
//! ```
//! use pagination::{PageParams, PaginationLimits};
//!
//! let params = PageParams::new(Some("20"), Some("3"), Some("title:desc"));
//! let request = params.resolve(&PaginationLimits::default()).expect("valid params");
//! assert_eq!(request.window().skip(), 40);
//! assert_eq!(request.sort().map(|sort| sort.relational_direction()), Some("DESC"));
//! ```

mod error;
mod limits;
mod meta;
mod params;
mod sort;
mod window;

pub use error::{PaginationError, PaginationErrors};
pub use limits::{LimitsError, PaginationLimits};
pub use meta::{Paginated, PaginationMeta};
pub use params::{PageParams, PageRequest};
pub use sort::{SortDirection, SortSpec};
pub use window::PageWindow;
