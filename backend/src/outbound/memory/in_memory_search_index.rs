//! Process-local user search index.
//!
//! Matches are case-insensitive prefixes of either name. Without a sort the
//! results keep indexing order.

use std::cmp::Ordering;

use async_trait::async_trait;
use pagination::{PageWindow, SortDirection, SortSpec};
use tokio::sync::RwLock;

use crate::domain::ports::{SearchDocument, SearchHits, SearchIndex, SearchIndexError};

/// In-memory [`SearchIndex`].
#[derive(Debug, Default)]
pub struct InMemorySearchIndex {
    documents: RwLock<Vec<SearchDocument>>,
}

impl InMemorySearchIndex {
    /// Empty index.
    pub fn new() -> Self {
        Self::default()
    }
}

fn sort_key<'a>(document: &'a SearchDocument, field: &str) -> Result<&'a str, SearchIndexError> {
    match field {
        "firstName" => Ok(&document.first_name),
        "lastName" => Ok(&document.last_name),
        other => Err(SearchIndexError::query(format!(
            "attribute {other:?} is not sortable"
        ))),
    }
}

fn starts_with_ignore_case(value: &str, prefix: &str) -> bool {
    value.to_lowercase().starts_with(prefix)
}

#[async_trait]
impl SearchIndex for InMemorySearchIndex {
    async fn index_document(&self, document: &SearchDocument) -> Result<(), SearchIndexError> {
        let mut documents = self.documents.write().await;
        match documents.iter_mut().find(|existing| existing.id == document.id) {
            Some(existing) => existing.clone_from(document),
            None => documents.push(document.clone()),
        }
        Ok(())
    }

    async fn search(
        &self,
        term: &str,
        window: &PageWindow,
        sort: Option<&SortSpec>,
    ) -> Result<SearchHits, SearchIndexError> {
        let prefix = term.trim().to_lowercase();
        let documents = self.documents.read().await;
        let mut hits: Vec<&SearchDocument> = documents
            .iter()
            .filter(|document| {
                starts_with_ignore_case(&document.first_name, &prefix)
                    || starts_with_ignore_case(&document.last_name, &prefix)
            })
            .collect();
        if let Some(spec) = sort {
            let mut keyed = hits
                .into_iter()
                .map(|document| {
                    sort_key(document, spec.field()).map(|key| (key.to_lowercase(), document))
                })
                .collect::<Result<Vec<_>, _>>()?;
            keyed.sort_by(|(a, _), (b, _)| match spec.direction() {
                SortDirection::Asc => a.cmp(b),
                SortDirection::Desc => b.cmp(a),
            });
            hits = keyed.into_iter().map(|(_, document)| document).collect();
        }
        let total = u64::try_from(hits.len()).unwrap_or(u64::MAX);
        let skip = usize::try_from(window.skip()).unwrap_or(usize::MAX);
        let take = usize::try_from(window.items_per_page()).unwrap_or(usize::MAX);
        Ok(SearchHits {
            total,
            documents: hits.into_iter().skip(skip).take(take).cloned().collect(),
        })
    }
}
