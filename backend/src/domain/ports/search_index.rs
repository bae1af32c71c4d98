//! Port for the denormalised user search index.
//!
//! Documents carry only the identifier and the searchable name fields. The
//! index is a keyed document store; re-indexing an id replaces its document.

use async_trait::async_trait;
use pagination::{PageWindow, SortSpec};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{Error, User};

use super::define_port_error;

/// Fields a search may be ordered by.
pub const SEARCH_SORT_FIELDS: &[&str] = &["firstName", "lastName"];

/// Searchable projection of a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchDocument {
    /// User identifier.
    pub id: Uuid,
    /// Given name.
    pub first_name: String,
    /// Family name.
    pub last_name: String,
}

impl From<&User> for SearchDocument {
    fn from(user: &User) -> Self {
        Self {
            id: user.id(),
            first_name: user.first_name().to_owned(),
            last_name: user.last_name().to_owned(),
        }
    }
}

/// One page of search results.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchHits {
    /// Number of documents matching across all pages.
    pub total: u64,
    /// Documents on this page.
    pub documents: Vec<SearchDocument>,
}

define_port_error! {
    /// Errors raised by search index adapters.
    pub enum SearchIndexError {
        /// The index could not be reached.
        Unavailable { message: String } => "search index unavailable: {message}",
        /// The index rejected the request.
        Query { message: String } => "search query failed: {message}",
    }
}

/// Keyed document store with case-insensitive prefix search on names.
#[async_trait]
pub trait SearchIndex: Send + Sync {
    /// Insert or replace `document`.
    async fn index_document(&self, document: &SearchDocument) -> Result<(), SearchIndexError>;

    /// Documents whose first or last name starts with `term`.
    ///
    /// An empty term matches every document.
    async fn search(
        &self,
        term: &str,
        window: &PageWindow,
        sort: Option<&SortSpec>,
    ) -> Result<SearchHits, SearchIndexError>;
}

pub(crate) fn map_search_error(error: SearchIndexError) -> Error {
    match error {
        SearchIndexError::Unavailable { message } => {
            Error::service_unavailable(format!("search index unavailable: {message}"))
        }
        SearchIndexError::Query { message } => Error::internal(format!("search query failed: {message}")),
    }
}
