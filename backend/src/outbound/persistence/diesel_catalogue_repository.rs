//! PostgreSQL-backed `Repository<CatalogueEntry<K>>` over one shared table.
//!
//! Every catalogue kind lives in `catalogue_entries`, scoped by the `kind`
//! discriminator. Label uniqueness is enforced by partial unique indexes (one
//! for global kinds, one per research category) and parent references are
//! restricted by a self-referencing foreign key.
//!
//! Deleting a research category locks its row before the relation guard
//! runs; a concurrent child insert needs a key-share lock on the same row, so
//! it either commits first (and the guard sees it) or waits for the delete.

use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;
use diesel::pg::Pg;
use diesel::prelude::*;
use diesel_async::scoped_futures::ScopedFutureExt;
use diesel_async::{AsyncConnection, RunQueryDsl};
use mockable::Clock;
use pagination::{Paginated, SortDirection};
use tracing::debug;
use uuid::Uuid;

use crate::domain::ports::{Precondition, Repository};
use crate::domain::{
    CatalogueEntry, CatalogueField, CatalogueKind, Criteria, Entity, Error, FieldMap, FieldValue,
    FindQuery, retain_fillable,
};

use super::diesel_basic_error_mapping::{TxError, map_diesel_error, map_pool_error};
use super::diesel_helpers::{page_meta, window_bounds};
use super::models::{CatalogueChangeset, CatalogueRow, NewCatalogueRow};
use super::pool::DbPool;
use super::schema::catalogue_entries;

type EntryQuery = catalogue_entries::BoxedQuery<'static, Pg>;

/// Diesel-backed repository for catalogue kind `K`.
pub struct DieselCatalogueRepository<K: CatalogueKind> {
    pool: DbPool,
    clock: Arc<dyn Clock>,
    kind: PhantomData<K>,
}

impl<K: CatalogueKind> DieselCatalogueRepository<K> {
    /// Repository over `pool`, timestamping rows with `clock`.
    pub fn new(pool: DbPool, clock: Arc<dyn Clock>) -> Self {
        Self {
            pool,
            clock,
            kind: PhantomData,
        }
    }
}

impl<K: CatalogueKind> Clone for DieselCatalogueRepository<K> {
    fn clone(&self) -> Self {
        Self::new(self.pool.clone(), Arc::clone(&self.clock))
    }
}

fn diesel_error<K: CatalogueKind>(error: diesel::result::Error) -> Error {
    map_diesel_error(error, K::NAME)
}

fn filtered<K: CatalogueKind>(criteria: &Criteria<CatalogueField>) -> EntryQuery {
    let mut query = catalogue_entries::table
        .filter(catalogue_entries::kind.eq(K::KIND))
        .into_boxed();
    for (field, value) in criteria.conditions() {
        query = match (field, value) {
            (CatalogueField::Id, FieldValue::Uuid(id)) => {
                query.filter(catalogue_entries::id.eq(*id))
            }
            (CatalogueField::ResearchCategoryId, FieldValue::Null) => {
                query.filter(catalogue_entries::research_category_id.is_null())
            }
            (CatalogueField::ResearchCategoryId, FieldValue::Uuid(parent)) => {
                query.filter(catalogue_entries::research_category_id.eq(*parent))
            }
            (CatalogueField::Title | CatalogueField::Content, FieldValue::Text(label))
                if *field == K::LABEL =>
            {
                query.filter(catalogue_entries::label.eq(label.clone()))
            }
            // The other label column is always null for this kind.
            (CatalogueField::Title | CatalogueField::Content, FieldValue::Null)
                if *field != K::LABEL =>
            {
                query
            }
            (CatalogueField::CreatedAt, FieldValue::Timestamp(at)) => {
                query.filter(catalogue_entries::created_at.eq(*at))
            }
            (CatalogueField::UpdatedAt, FieldValue::Timestamp(at)) => {
                query.filter(catalogue_entries::updated_at.eq(*at))
            }
            _ => query.filter(catalogue_entries::id.is_null()),
        };
    }
    query
}

macro_rules! order {
    ($query:expr, $column:expr, $direction:expr) => {
        match $direction {
            SortDirection::Asc => $query.order_by($column.asc()),
            SortDirection::Desc => $query.order_by($column.desc()),
        }
    };
}

fn ordered(query: EntryQuery, sort: Option<(CatalogueField, SortDirection)>) -> EntryQuery {
    let Some((field, direction)) = sort else {
        return query
            .order_by(catalogue_entries::created_at.asc())
            .then_order_by(catalogue_entries::id.asc());
    };
    let sorted = match field {
        CatalogueField::Id => order!(query, catalogue_entries::id, direction),
        CatalogueField::ResearchCategoryId => {
            order!(query, catalogue_entries::research_category_id, direction)
        }
        CatalogueField::Title | CatalogueField::Content => {
            order!(query, catalogue_entries::label, direction)
        }
        CatalogueField::CreatedAt => order!(query, catalogue_entries::created_at, direction),
        CatalogueField::UpdatedAt => order!(query, catalogue_entries::updated_at, direction),
    };
    sorted.then_order_by(catalogue_entries::id.asc())
}

#[async_trait]
impl<K: CatalogueKind> Repository<CatalogueEntry<K>> for DieselCatalogueRepository<K> {
    async fn find_one(
        &self,
        criteria: &Criteria<CatalogueField>,
    ) -> Result<Option<CatalogueEntry<K>>, Error> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let row = ordered(filtered::<K>(criteria), None)
            .select(CatalogueRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(diesel_error::<K>)?;
        Ok(row.map(CatalogueRow::into_entry))
    }

    async fn find(
        &self,
        query: &FindQuery<CatalogueField>,
    ) -> Result<Paginated<CatalogueEntry<K>>, Error> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let total: i64 = filtered::<K>(&query.criteria)
            .count()
            .get_result(&mut conn)
            .await
            .map_err(diesel_error::<K>)?;
        let (offset, limit) = window_bounds(&query.window);
        let rows: Vec<CatalogueRow> = ordered(filtered::<K>(&query.criteria), query.sort)
            .offset(offset)
            .limit(limit)
            .select(CatalogueRow::as_select())
            .load(&mut conn)
            .await
            .map_err(diesel_error::<K>)?;
        Ok(Paginated::new(
            rows.into_iter().map(CatalogueRow::into_entry).collect(),
            page_meta(total, &query.window),
        ))
    }

    async fn count(&self, criteria: &Criteria<CatalogueField>) -> Result<u64, Error> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let total: i64 = filtered::<K>(criteria)
            .count()
            .get_result(&mut conn)
            .await
            .map_err(diesel_error::<K>)?;
        Ok(u64::try_from(total).unwrap_or_default())
    }

    async fn create(
        &self,
        fields: FieldMap<CatalogueField>,
    ) -> Result<CatalogueEntry<K>, Error> {
        let fields = retain_fillable::<CatalogueEntry<K>>(fields);
        let entry = CatalogueEntry::<K>::hydrate(Uuid::new_v4(), &fields, self.clock.utc())?;

        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        diesel::insert_into(catalogue_entries::table)
            .values(NewCatalogueRow::from(&entry))
            .execute(&mut conn)
            .await
            .map_err(diesel_error::<K>)?;
        debug!(kind = K::KIND, id = %entry.id(), "catalogue row inserted");
        Ok(entry)
    }

    async fn update(
        &self,
        existing: &CatalogueEntry<K>,
        patch: FieldMap<CatalogueField>,
        precondition: Option<&dyn Precondition<CatalogueEntry<K>>>,
    ) -> Result<CatalogueEntry<K>, Error> {
        let id = existing.id();
        let now = self.clock.utc();

        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let updated = conn
            .transaction::<_, TxError, _>(|conn| {
                async move {
                    let current = catalogue_entries::table
                        .filter(catalogue_entries::id.eq(id))
                        .filter(catalogue_entries::kind.eq(K::KIND))
                        .select(CatalogueRow::as_select())
                        .for_update()
                        .get_result(conn)
                        .await
                        .optional()?
                        .map(CatalogueRow::into_entry::<K>)
                        .ok_or_else(|| Error::not_found(CatalogueEntry::<K>::not_found_message()))?;
                    if let Some(check) = precondition {
                        check.check(&current).await?;
                    }
                    let merged = current.merge(&patch, now)?;
                    diesel::update(catalogue_entries::table.filter(catalogue_entries::id.eq(id)))
                        .set(CatalogueChangeset::from(&merged))
                        .execute(conn)
                        .await?;
                    Ok(merged)
                }
                .scope_boxed()
            })
            .await
            .map_err(|err| err.into_domain(K::NAME))?;
        debug!(kind = K::KIND, %id, "catalogue row updated");
        Ok(updated)
    }

    async fn delete(
        &self,
        criteria: &Criteria<CatalogueField>,
        precondition: Option<&dyn Precondition<CatalogueEntry<K>>>,
    ) -> Result<(), Error> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let removed = conn
            .transaction::<_, TxError, _>(|conn| {
                async move {
                    let ids: Vec<Uuid> = filtered::<K>(criteria)
                        .select(catalogue_entries::id)
                        .load(conn)
                        .await?;
                    let locked: Vec<CatalogueEntry<K>> = catalogue_entries::table
                        .filter(catalogue_entries::id.eq_any(&ids))
                        .select(CatalogueRow::as_select())
                        .for_update()
                        .load(conn)
                        .await?
                        .into_iter()
                        .map(CatalogueRow::into_entry::<K>)
                        .filter(|entry| criteria.matches(entry))
                        .collect();
                    if locked.is_empty() {
                        return Err(
                            Error::not_found(CatalogueEntry::<K>::not_found_message()).into()
                        );
                    }
                    if let Some(check) = precondition {
                        for entry in &locked {
                            check.check(entry).await?;
                        }
                    }
                    let targets: Vec<Uuid> = locked.iter().map(CatalogueEntry::id).collect();
                    let removed = diesel::delete(
                        catalogue_entries::table.filter(catalogue_entries::id.eq_any(targets)),
                    )
                    .execute(conn)
                    .await?;
                    Ok(removed)
                }
                .scope_boxed()
            })
            .await
            .map_err(|err| err.into_domain(K::NAME))?;
        debug!(kind = K::KIND, removed, "catalogue rows deleted");
        Ok(())
    }
}
