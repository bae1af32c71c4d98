//! Generic data-access port shared by every entity.
//!
//! Adapters implement [`Repository`] once per storage technology; services
//! consume `Arc<dyn Repository<E>>` and never see rows or SQL. Mutations accept
//! a [`Precondition`] evaluated against the *stored* row under the same lock or
//! transaction as the write, which is how single-use reset links, relation
//! guards and self-excluding uniqueness checks stay race free.

use std::sync::Arc;

use async_trait::async_trait;
use pagination::Paginated;

use crate::domain::{Criteria, Entity, EntityField, Error, FieldMap, FindQuery, TraceId};

/// Check run against the current stored entity before a mutation commits.
#[async_trait]
pub trait Precondition<E: Entity>: Send + Sync {
    /// Fail with the error the mutation should surface.
    async fn check(&self, current: &E) -> Result<(), Error>;
}

#[async_trait]
impl<E, F> Precondition<E> for F
where
    E: Entity,
    F: Fn(&E) -> Result<(), Error> + Send + Sync,
{
    async fn check(&self, current: &E) -> Result<(), Error> {
        self(current)
    }
}

/// Synchronous transformation applied to fields before they are persisted.
///
/// Adapters run hooks on the blocking pool because they may be CPU bound
/// (password hashing).
pub trait PersistHook<E: Entity>: Send + Sync {
    /// Rewrite `fields` in place before a create.
    fn before_create(&self, fields: &mut FieldMap<E::Field>) -> Result<(), Error>;

    /// Rewrite `patch` in place before an update.
    fn before_update(&self, patch: &mut FieldMap<E::Field>) -> Result<(), Error>;
}

/// Which mutation a hook is being run for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookStage {
    /// Insert of a new row.
    Create,
    /// Patch of an existing row.
    Update,
}

/// Run `hook` on the blocking pool, propagating the caller's trace id into
/// any error it raises.
pub async fn run_persist_hook<E: Entity>(
    hook: Option<&Arc<dyn PersistHook<E>>>,
    stage: HookStage,
    mut fields: FieldMap<E::Field>,
) -> Result<FieldMap<E::Field>, Error> {
    let Some(hook) = hook.map(Arc::clone) else {
        return Ok(fields);
    };
    let trace_id = TraceId::current();
    let result = tokio::task::spawn_blocking(move || {
        match stage {
            HookStage::Create => hook.before_create(&mut fields),
            HookStage::Update => hook.before_update(&mut fields),
        }
        .map(|()| fields)
    })
    .await
    .map_err(|err| Error::internal(format!("persist hook task failed: {err}")))?;
    result.map_err(|err| match (trace_id, err.trace_id()) {
        (Some(id), None) => err.with_trace_id(id.to_string()),
        _ => err,
    })
}

/// Exception predicate for [`Repository::check_duplicate`].
pub type DuplicateException<'a, E> = &'a (dyn Fn(&E) -> bool + Send + Sync);

/// Generic persistence contract for entity `E`.
#[async_trait]
pub trait Repository<E: Entity>: Send + Sync {
    /// First entity matching `criteria`, in insertion order.
    async fn find_one(&self, criteria: &Criteria<E::Field>) -> Result<Option<E>, Error>;

    /// Like [`Repository::find_one`] but fails with `NotFound`.
    ///
    /// The message defaults to `"<Entity> not found"`.
    async fn find_one_or_fail(
        &self,
        criteria: &Criteria<E::Field>,
        not_found_message: Option<&str>,
    ) -> Result<E, Error> {
        self.find_one(criteria).await?.ok_or_else(|| {
            Error::not_found(not_found_message.map_or_else(E::not_found_message, str::to_owned))
        })
    }

    /// One page of entities matching the query.
    async fn find(&self, query: &FindQuery<E::Field>) -> Result<Paginated<E>, Error>;

    /// Number of entities matching `criteria`.
    async fn count(&self, criteria: &Criteria<E::Field>) -> Result<u64, Error>;

    /// Whether any entity matches `criteria`.
    async fn exists(&self, criteria: &Criteria<E::Field>) -> Result<bool, Error> {
        Ok(self.count(criteria).await? > 0)
    }

    /// Persist a new entity built from the fillable subset of `fields`.
    async fn create(&self, fields: FieldMap<E::Field>) -> Result<E, Error>;

    /// Merge `patch` into the stored copy of `existing`.
    ///
    /// `precondition` sees the row as currently stored, not `existing`.
    async fn update(
        &self,
        existing: &E,
        patch: FieldMap<E::Field>,
        precondition: Option<&dyn Precondition<E>>,
    ) -> Result<E, Error>;

    /// Delete every entity matching `criteria`, failing with `NotFound` when
    /// none does. `precondition` runs against each row before removal.
    async fn delete(
        &self,
        criteria: &Criteria<E::Field>,
        precondition: Option<&dyn Precondition<E>>,
    ) -> Result<(), Error>;

    /// Fail with `Conflict` when an entity matches `criteria`, unless
    /// `exception` accepts it.
    async fn check_duplicate(
        &self,
        criteria: &Criteria<E::Field>,
        conflict_message: &str,
        exception: Option<DuplicateException<'_, E>>,
    ) -> Result<(), Error> {
        match self.find_one(criteria).await? {
            Some(found) if !exception.is_some_and(|accept| accept(&found)) => {
                Err(Error::conflict(conflict_message))
            }
            _ => Ok(()),
        }
    }

    /// External names of fields stripped from every response.
    fn hidden_fields(&self) -> Vec<&'static str> {
        E::HIDDEN.iter().map(|field| field.name()).collect()
    }
}
