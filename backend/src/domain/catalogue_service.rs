//! Generic CRUD over catalogue entries.
//!
//! One [`CatalogueService`] is built per catalogue kind. It owns the rules the
//! repository cannot express alone: the owning research category must exist,
//! labels are unique within their scope, no-op updates are reported, and
//! categories still referenced by dependent kinds cannot be deleted.
//!
//! Services that share a [`ParentLock`] serialise category deletes against
//! child writes: a create or re-parenting update holds the shared side from
//! the parent check until its row lands, and a category delete holds the
//! exclusive side across its relation guard and removal.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use pagination::{PageParams, Paginated, PaginationLimits};
use tokio::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{debug, info};
use uuid::Uuid;

use crate::domain::catalogue::{CatalogueEntry, CatalogueField, CatalogueKind, ResearchCategory};
use crate::domain::ports::{Precondition, Repository};
use crate::domain::{Criteria, Entity, Error, FieldMap, FindQuery, retain_fillable};

/// Whether dependent rows still point at a research category.
#[async_trait]
pub trait RelationCheck: Send + Sync {
    /// Display name of the dependent kind.
    fn dependent(&self) -> &'static str;

    /// Whether any dependent row references `category_id`.
    async fn is_referenced(&self, category_id: Uuid) -> Result<bool, Error>;
}

/// [`RelationCheck`] over the entries of a parented kind.
pub struct ChildReferences<K: CatalogueKind> {
    children: Arc<dyn Repository<CatalogueEntry<K>>>,
}

impl<K: CatalogueKind> ChildReferences<K> {
    /// Check references held by `children`.
    pub fn new(children: Arc<dyn Repository<CatalogueEntry<K>>>) -> Self {
        Self { children }
    }
}

#[async_trait]
impl<K: CatalogueKind> RelationCheck for ChildReferences<K> {
    fn dependent(&self) -> &'static str {
        K::NAME
    }

    async fn is_referenced(&self, category_id: Uuid) -> Result<bool, Error> {
        self.children
            .exists(&Criteria::by(CatalogueField::ResearchCategoryId, category_id))
            .await
    }
}

/// Lock shared by a research category service and the services of its
/// dependent kinds.
#[derive(Clone, Default)]
pub struct ParentLock(Arc<RwLock<()>>);

impl ParentLock {
    /// Fresh, unshared lock.
    pub fn new() -> Self {
        Self::default()
    }

    async fn child_write(&self, parented: bool) -> Option<RwLockReadGuard<'_, ()>> {
        if parented {
            Some(self.0.read().await)
        } else {
            None
        }
    }

    async fn parent_delete(&self, guarded: bool) -> Option<RwLockWriteGuard<'_, ()>> {
        if guarded {
            Some(self.0.write().await)
        } else {
            None
        }
    }
}

struct RelationGuard<'a> {
    checks: &'a [Arc<dyn RelationCheck>],
}

#[async_trait]
impl<K: CatalogueKind> Precondition<CatalogueEntry<K>> for RelationGuard<'_> {
    async fn check(&self, current: &CatalogueEntry<K>) -> Result<(), Error> {
        for check in self.checks {
            if check.is_referenced(current.id()).await? {
                return Err(Error::conflict(format!(
                    "{} is still referenced by at least one {}",
                    K::NAME,
                    check.dependent().to_lowercase()
                ))
                .with_sub_code("still_referenced"));
            }
        }
        Ok(())
    }
}

/// CRUD handler for catalogue kind `K`.
pub struct CatalogueService<K: CatalogueKind> {
    entries: Arc<dyn Repository<CatalogueEntry<K>>>,
    categories: Option<Arc<dyn Repository<CatalogueEntry<ResearchCategory>>>>,
    relations: Vec<Arc<dyn RelationCheck>>,
    parent_lock: ParentLock,
    limits: PaginationLimits,
}

impl<K: CatalogueKind> CatalogueService<K> {
    /// Service over `entries` with default pagination limits.
    pub fn new(entries: Arc<dyn Repository<CatalogueEntry<K>>>) -> Self {
        Self {
            entries,
            categories: None,
            relations: Vec::new(),
            parent_lock: ParentLock::new(),
            limits: PaginationLimits::default(),
        }
    }

    /// Check that referenced research categories exist.
    #[must_use]
    pub fn with_categories(
        mut self,
        categories: Arc<dyn Repository<CatalogueEntry<ResearchCategory>>>,
    ) -> Self {
        self.categories = Some(categories);
        self
    }

    /// Refuse deletes while `check` reports references.
    #[must_use]
    pub fn with_relation(mut self, check: Arc<dyn RelationCheck>) -> Self {
        self.relations.push(check);
        self
    }

    /// Share `lock` with the other services of the same category tree.
    #[must_use]
    pub fn with_parent_lock(mut self, lock: ParentLock) -> Self {
        self.parent_lock = lock;
        self
    }

    /// Override the pagination limits used by listings.
    #[must_use]
    pub fn with_limits(mut self, limits: PaginationLimits) -> Self {
        self.limits = limits;
        self
    }

    /// One page of entries.
    pub async fn list(&self, params: &PageParams) -> Result<Paginated<CatalogueEntry<K>>, Error> {
        self.list_matching(params, Criteria::any()).await
    }

    /// One page of the entries owned by `category_id`.
    pub async fn list_in_category(
        &self,
        category_id: Uuid,
        params: &PageParams,
    ) -> Result<Paginated<CatalogueEntry<K>>, Error> {
        self.list_matching(
            params,
            Criteria::by(CatalogueField::ResearchCategoryId, category_id),
        )
        .await
    }

    async fn list_matching(
        &self,
        params: &PageParams,
        criteria: Criteria<CatalogueField>,
    ) -> Result<Paginated<CatalogueEntry<K>>, Error> {
        let request = params.resolve(&self.limits)?;
        let query = FindQuery::from_request::<CatalogueEntry<K>>(&request, criteria)?;
        self.entries.find(&query).await
    }

    /// Entry with `id`.
    pub async fn get(&self, id: Uuid) -> Result<CatalogueEntry<K>, Error> {
        self.entries
            .find_one_or_fail(&Criteria::by(CatalogueField::Id, id), None)
            .await
    }

    /// Create an entry from caller-supplied fields.
    pub async fn create(&self, fields: FieldMap<CatalogueField>) -> Result<CatalogueEntry<K>, Error> {
        let fields = retain_fillable::<CatalogueEntry<K>>(fields);
        let draft =
            CatalogueEntry::<K>::hydrate(Uuid::nil(), &fields, DateTime::<Utc>::UNIX_EPOCH)?;
        let _parent = self.parent_lock.child_write(K::PARENTED).await;
        self.ensure_parent_exists(draft.research_category_id()).await?;
        self.ensure_label_free(&draft, None).await?;

        let entry = self.entries.create(fields).await?;
        info!(kind = K::KIND, id = %entry.id(), "catalogue entry created");
        Ok(entry)
    }

    /// Apply `patch` to the entry with `id`.
    ///
    /// Fails with `NotModified` when the patch changes nothing.
    pub async fn update(
        &self,
        id: Uuid,
        patch: FieldMap<CatalogueField>,
    ) -> Result<CatalogueEntry<K>, Error> {
        let patch = retain_fillable::<CatalogueEntry<K>>(patch);
        let existing = self.get(id).await?;
        if existing.is_unchanged_by(&patch) {
            debug!(kind = K::KIND, %id, "update changes nothing");
            return Err(Error::not_modified(format!("{} was not modified", K::NAME)));
        }
        let draft = existing.merge(&patch, existing.updated_at())?;
        let _parent = self.parent_lock.child_write(K::PARENTED).await;
        if draft.research_category_id() != existing.research_category_id() {
            self.ensure_parent_exists(draft.research_category_id()).await?;
        }
        self.ensure_label_free(&draft, Some(id)).await?;

        let entry = self.entries.update(&existing, patch, None).await?;
        info!(kind = K::KIND, %id, "catalogue entry updated");
        Ok(entry)
    }

    /// Delete the entry with `id`, refusing while dependents reference it.
    pub async fn delete(&self, id: Uuid) -> Result<(), Error> {
        let guard = RelationGuard {
            checks: &self.relations,
        };
        let _children = self.parent_lock.parent_delete(!self.relations.is_empty()).await;
        self.entries
            .delete(&Criteria::by(CatalogueField::Id, id), Some(&guard))
            .await?;
        info!(kind = K::KIND, %id, "catalogue entry deleted");
        Ok(())
    }

    async fn ensure_parent_exists(&self, parent: Option<Uuid>) -> Result<(), Error> {
        let (Some(categories), Some(parent)) = (self.categories.as_ref(), parent) else {
            return Ok(());
        };
        categories
            .find_one_or_fail(&Criteria::by(CatalogueField::Id, parent), None)
            .await
            .map(drop)
    }

    async fn ensure_label_free(
        &self,
        draft: &CatalogueEntry<K>,
        own_id: Option<Uuid>,
    ) -> Result<(), Error> {
        let scope =
            CatalogueEntry::<K>::uniqueness_scope(draft.label(), draft.research_category_id());
        let message = if K::PARENTED {
            format!("{} already exists in this research category", K::NAME)
        } else {
            format!("{} already exists", K::NAME)
        };
        let is_self = move |found: &CatalogueEntry<K>| Some(found.id()) == own_id;
        self.entries
            .check_duplicate(&scope, &message, Some(&is_self))
            .await
    }
}

#[cfg(test)]
#[path = "catalogue_service_tests.rs"]
mod tests;
