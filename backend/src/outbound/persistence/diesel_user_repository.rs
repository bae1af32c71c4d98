//! PostgreSQL-backed `Repository<User>` implementation using Diesel ORM.
//!
//! Mutations run in a transaction that locks the affected rows with
//! `SELECT ... FOR UPDATE` before evaluating the caller's precondition, so a
//! single-use reset link cannot be consumed twice by concurrent requests.
//! The unique index on `users.email` backs the service-level duplicate check.

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

use crate::domain::ports::{HookStage, PersistHook, Precondition, Repository, run_persist_hook};
use crate::domain::{
    Criteria, Entity, Error, FieldMap, FieldValue, FindQuery, User, UserField, retain_fillable,
};

use super::diesel_basic_error_mapping::{TxError, map_diesel_error, map_pool_error};
use super::diesel_helpers::{page_meta, window_bounds};
use super::models::{NewUserRow, UserChangeset, UserRow};
use super::pool::DbPool;
use super::schema::users;

type UserQuery = users::BoxedQuery<'static, Pg>;

/// Diesel-backed implementation of `Repository<User>`.
#[derive(Clone)]
pub struct DieselUserRepository {
    pool: DbPool,
    hook: Option<Arc<dyn PersistHook<User>>>,
    clock: Arc<dyn Clock>,
}

impl DieselUserRepository {
    /// Repository over `pool`, timestamping rows with `clock`.
    pub fn new(pool: DbPool, clock: Arc<dyn Clock>) -> Self {
        Self {
            pool,
            hook: None,
            clock,
        }
    }

    /// Run `hook` before every create and update.
    #[must_use]
    pub fn with_hook(mut self, hook: Arc<dyn PersistHook<User>>) -> Self {
        self.hook = Some(hook);
        self
    }
}

fn diesel_error(error: diesel::result::Error) -> Error {
    map_diesel_error(error, User::NAME)
}

fn filtered(criteria: &Criteria<UserField>) -> UserQuery {
    let mut query = users::table.into_boxed();
    for (field, value) in criteria.conditions() {
        query = match (field, value) {
            (UserField::Id, FieldValue::Uuid(id)) => query.filter(users::id.eq(*id)),
            (UserField::FirstName, FieldValue::Text(text)) => {
                query.filter(users::first_name.eq(text.clone()))
            }
            (UserField::LastName, FieldValue::Text(text)) => {
                query.filter(users::last_name.eq(text.clone()))
            }
            (UserField::Email, FieldValue::Text(text)) => {
                query.filter(users::email.eq(text.clone()))
            }
            (UserField::Password, FieldValue::Text(text)) => {
                query.filter(users::password.eq(text.clone()))
            }
            (UserField::Photo, FieldValue::Null) => query.filter(users::photo.is_null()),
            (UserField::Photo, FieldValue::Text(text)) => {
                query.filter(users::photo.eq(text.clone()))
            }
            (UserField::RememberMeToken, FieldValue::Null) => {
                query.filter(users::remember_me_token.is_null())
            }
            (UserField::RememberMeToken, FieldValue::Text(text)) => {
                query.filter(users::remember_me_token.eq(text.clone()))
            }
            (UserField::ResetStamp, FieldValue::Integer(stamp)) => {
                query.filter(users::reset_stamp.eq(*stamp))
            }
            (UserField::IsAdmin, FieldValue::Bool(flag)) => query.filter(users::is_admin.eq(*flag)),
            (UserField::IsVerified, FieldValue::Bool(flag)) => {
                query.filter(users::is_verified.eq(*flag))
            }
            (UserField::CreatedAt, FieldValue::Timestamp(at)) => {
                query.filter(users::created_at.eq(*at))
            }
            (UserField::UpdatedAt, FieldValue::Timestamp(at)) => {
                query.filter(users::updated_at.eq(*at))
            }
            // Mistyped value: matches nothing.
            _ => query.filter(users::id.is_null()),
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

fn ordered(query: UserQuery, sort: Option<(UserField, SortDirection)>) -> UserQuery {
    let Some((field, direction)) = sort else {
        return query
            .order_by(users::created_at.asc())
            .then_order_by(users::id.asc());
    };
    let sorted = match field {
        UserField::Id => order!(query, users::id, direction),
        UserField::FirstName => order!(query, users::first_name, direction),
        UserField::LastName => order!(query, users::last_name, direction),
        UserField::Email => order!(query, users::email, direction),
        UserField::Password => order!(query, users::password, direction),
        UserField::Photo => order!(query, users::photo, direction),
        UserField::RememberMeToken => order!(query, users::remember_me_token, direction),
        UserField::ResetStamp => order!(query, users::reset_stamp, direction),
        UserField::IsAdmin => order!(query, users::is_admin, direction),
        UserField::IsVerified => order!(query, users::is_verified, direction),
        UserField::CreatedAt => order!(query, users::created_at, direction),
        UserField::UpdatedAt => order!(query, users::updated_at, direction),
    };
    sorted.then_order_by(users::id.asc())
}

#[async_trait]
impl Repository<User> for DieselUserRepository {
    async fn find_one(&self, criteria: &Criteria<UserField>) -> Result<Option<User>, Error> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let row = ordered(filtered(criteria), None)
            .select(UserRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(diesel_error)?;
        Ok(row.map(User::from))
    }

    async fn find(&self, query: &FindQuery<UserField>) -> Result<Paginated<User>, Error> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let total: i64 = filtered(&query.criteria)
            .count()
            .get_result(&mut conn)
            .await
            .map_err(diesel_error)?;
        let (offset, limit) = window_bounds(&query.window);
        let rows: Vec<UserRow> = ordered(filtered(&query.criteria), query.sort)
            .offset(offset)
            .limit(limit)
            .select(UserRow::as_select())
            .load(&mut conn)
            .await
            .map_err(diesel_error)?;
        Ok(Paginated::new(
            rows.into_iter().map(User::from).collect(),
            page_meta(total, &query.window),
        ))
    }

    async fn count(&self, criteria: &Criteria<UserField>) -> Result<u64, Error> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let total: i64 = filtered(criteria)
            .count()
            .get_result(&mut conn)
            .await
            .map_err(diesel_error)?;
        Ok(u64::try_from(total).unwrap_or_default())
    }

    async fn create(&self, fields: FieldMap<UserField>) -> Result<User, Error> {
        let fields = retain_fillable::<User>(fields);
        let fields = run_persist_hook(self.hook.as_ref(), HookStage::Create, fields).await?;
        let user = User::hydrate(Uuid::new_v4(), &fields, self.clock.utc())?;

        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        diesel::insert_into(users::table)
            .values(NewUserRow::from(&user))
            .execute(&mut conn)
            .await
            .map_err(diesel_error)?;
        debug!(id = %user.id(), "user row inserted");
        Ok(user)
    }

    async fn update(
        &self,
        existing: &User,
        patch: FieldMap<UserField>,
        precondition: Option<&dyn Precondition<User>>,
    ) -> Result<User, Error> {
        let patch = run_persist_hook(self.hook.as_ref(), HookStage::Update, patch).await?;
        let id = existing.id();
        let now = self.clock.utc();

        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let updated = conn
            .transaction::<_, TxError, _>(|conn| {
                async move {
                    let current = users::table
                        .filter(users::id.eq(id))
                        .select(UserRow::as_select())
                        .for_update()
                        .get_result(conn)
                        .await
                        .optional()?
                        .map(User::from)
                        .ok_or_else(|| Error::not_found(User::not_found_message()))?;
                    if let Some(check) = precondition {
                        check.check(&current).await?;
                    }
                    let merged = current.merge(&patch, now)?;
                    diesel::update(users::table.filter(users::id.eq(id)))
                        .set(UserChangeset::from(&merged))
                        .execute(conn)
                        .await?;
                    Ok(merged)
                }
                .scope_boxed()
            })
            .await
            .map_err(|err| err.into_domain(User::NAME))?;
        debug!(%id, "user row updated");
        Ok(updated)
    }

    async fn delete(
        &self,
        criteria: &Criteria<UserField>,
        precondition: Option<&dyn Precondition<User>>,
    ) -> Result<(), Error> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let removed = conn
            .transaction::<_, TxError, _>(|conn| {
                async move {
                    let ids: Vec<Uuid> = filtered(criteria).select(users::id).load(conn).await?;
                    let locked: Vec<User> = users::table
                        .filter(users::id.eq_any(&ids))
                        .select(UserRow::as_select())
                        .for_update()
                        .load(conn)
                        .await?
                        .into_iter()
                        .map(User::from)
                        .filter(|user| criteria.matches(user))
                        .collect();
                    if locked.is_empty() {
                        return Err(Error::not_found(User::not_found_message()).into());
                    }
                    if let Some(check) = precondition {
                        for user in &locked {
                            check.check(user).await?;
                        }
                    }
                    let targets: Vec<Uuid> = locked.iter().map(User::id).collect();
                    let removed = diesel::delete(users::table.filter(users::id.eq_any(targets)))
                        .execute(conn)
                        .await?;
                    Ok(removed)
                }
                .scope_boxed()
            })
            .await
            .map_err(|err| err.into_domain(User::NAME))?;
        debug!(removed, "user rows deleted");
        Ok(())
    }
}
