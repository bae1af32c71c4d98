//! Process-local [`Repository`] backed by a mutex-guarded vector.
//!
//! Rows keep insertion order. Every mutation holds the lock from the moment the
//! stored row is read until the write lands, so a [`Precondition`] observes
//! exactly the row it guards. Persist hooks run on the blocking pool before the
//! lock is taken.

use std::cmp::Ordering;
use std::sync::Arc;

use async_trait::async_trait;
use mockable::Clock;
use pagination::{Paginated, PaginationMeta, SortDirection};
use tokio::sync::Mutex;
use tracing::debug;
use uuid::Uuid;

use crate::domain::ports::{HookStage, PersistHook, Precondition, Repository, run_persist_hook};
use crate::domain::{
    Criteria, Entity, EntityField, Error, FieldMap, FindQuery, retain_fillable,
};

/// In-memory repository for entity `E`.
pub struct InMemoryRepository<E: Entity> {
    rows: Mutex<Vec<E>>,
    unique: Vec<Vec<E::Field>>,
    hook: Option<Arc<dyn PersistHook<E>>>,
    clock: Arc<dyn Clock>,
}

impl<E: Entity> InMemoryRepository<E> {
    /// Empty repository timestamping rows with `clock`.
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            rows: Mutex::new(Vec::new()),
            unique: Vec::new(),
            hook: None,
            clock,
        }
    }

    /// Reject writes producing two rows with equal values for `fields`.
    ///
    /// Rows where any of the fields is null never conflict.
    #[must_use]
    pub fn with_unique(mut self, fields: &[E::Field]) -> Self {
        self.unique.push(fields.to_vec());
        self
    }

    /// Run `hook` before every create and update.
    #[must_use]
    pub fn with_hook(mut self, hook: Arc<dyn PersistHook<E>>) -> Self {
        self.hook = Some(hook);
        self
    }

    fn violated_constraint(&self, rows: &[E], candidate: &E) -> Option<&[E::Field]> {
        self.unique
            .iter()
            .find(|fields| {
                let key: Vec<_> = fields.iter().map(|field| candidate.value(*field)).collect();
                if key.iter().any(|value| value.is_null()) {
                    return false;
                }
                rows.iter().filter(|row| row.id() != candidate.id()).any(|row| {
                    fields
                        .iter()
                        .zip(&key)
                        .all(|(field, value)| row.value(*field) == *value)
                })
            })
            .map(Vec::as_slice)
    }

    fn ensure_unique(&self, rows: &[E], candidate: &E) -> Result<(), Error> {
        match self.violated_constraint(rows, candidate) {
            Some(fields) => {
                let names: Vec<_> = fields.iter().map(|field| field.name()).collect();
                debug!(entity = E::NAME, fields = ?names, "unique constraint violated");
                Err(Error::conflict(format!("{} already exists", E::NAME)))
            }
            None => Ok(()),
        }
    }
}

fn compare<E: Entity>(a: &E, b: &E, field: E::Field, direction: SortDirection) -> Ordering {
    let ordering = a.value(field).cmp(&b.value(field));
    match direction {
        SortDirection::Asc => ordering,
        SortDirection::Desc => ordering.reverse(),
    }
}

fn to_index(value: u64) -> usize {
    usize::try_from(value).unwrap_or(usize::MAX)
}

#[async_trait]
impl<E: Entity> Repository<E> for InMemoryRepository<E> {
    async fn find_one(&self, criteria: &Criteria<E::Field>) -> Result<Option<E>, Error> {
        let rows = self.rows.lock().await;
        Ok(rows.iter().find(|row| criteria.matches(*row)).cloned())
    }

    async fn find(&self, query: &FindQuery<E::Field>) -> Result<Paginated<E>, Error> {
        let rows = self.rows.lock().await;
        let mut matching: Vec<&E> = rows
            .iter()
            .filter(|row| query.criteria.matches(*row))
            .collect();
        if let Some((field, direction)) = query.sort {
            matching.sort_by(|a, b| compare(*a, *b, field, direction));
        }
        let total = u64::try_from(matching.len()).unwrap_or(u64::MAX);
        let data = matching
            .into_iter()
            .skip(to_index(query.window.skip()))
            .take(to_index(u64::from(query.window.items_per_page())))
            .cloned()
            .collect();
        Ok(Paginated::new(data, PaginationMeta::new(total, &query.window)))
    }

    async fn count(&self, criteria: &Criteria<E::Field>) -> Result<u64, Error> {
        let rows = self.rows.lock().await;
        let count = rows.iter().filter(|row| criteria.matches(*row)).count();
        Ok(u64::try_from(count).unwrap_or(u64::MAX))
    }

    async fn create(&self, fields: FieldMap<E::Field>) -> Result<E, Error> {
        let fields = retain_fillable::<E>(fields);
        let fields = run_persist_hook(self.hook.as_ref(), HookStage::Create, fields).await?;
        let entity = E::hydrate(Uuid::new_v4(), &fields, self.clock.utc())?;

        let mut rows = self.rows.lock().await;
        self.ensure_unique(&rows, &entity)?;
        rows.push(entity.clone());
        debug!(entity = E::NAME, id = %entity.id(), "row inserted");
        Ok(entity)
    }

    async fn update(
        &self,
        existing: &E,
        patch: FieldMap<E::Field>,
        precondition: Option<&dyn Precondition<E>>,
    ) -> Result<E, Error> {
        let patch = run_persist_hook(self.hook.as_ref(), HookStage::Update, patch).await?;

        let mut rows = self.rows.lock().await;
        let position = rows
            .iter()
            .position(|row| row.id() == existing.id())
            .ok_or_else(|| Error::not_found(E::not_found_message()))?;
        let current = rows
            .get(position)
            .ok_or_else(|| Error::not_found(E::not_found_message()))?;
        if let Some(check) = precondition {
            check.check(current).await?;
        }
        let merged = current.merge(&patch, self.clock.utc())?;
        self.ensure_unique(&rows, &merged)?;
        if let Some(slot) = rows.get_mut(position) {
            *slot = merged.clone();
        }
        debug!(entity = E::NAME, id = %merged.id(), "row updated");
        Ok(merged)
    }

    async fn delete(
        &self,
        criteria: &Criteria<E::Field>,
        precondition: Option<&dyn Precondition<E>>,
    ) -> Result<(), Error> {
        let mut rows = self.rows.lock().await;
        let targets: Vec<&E> = rows.iter().filter(|row| criteria.matches(*row)).collect();
        if targets.is_empty() {
            return Err(Error::not_found(E::not_found_message()));
        }
        if let Some(check) = precondition {
            for target in &targets {
                check.check(target).await?;
            }
        }
        let before = rows.len();
        rows.retain(|row| !criteria.matches(row));
        debug!(entity = E::NAME, removed = before - rows.len(), "rows deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    //! Regression coverage for this module.
    use super::*;
    use crate::domain::ports::FixtureCredentialHasher;
    use crate::domain::{CredentialHashingHook, ErrorCode, FieldValue, User, UserField};
    use crate::test_support::MutableClock;
    use pagination::PageWindow;
    use rstest::{fixture, rstest};

    #[fixture]
    fn clock() -> Arc<MutableClock> {
        Arc::new(MutableClock::fixed())
    }

    fn users(clock: Arc<MutableClock>) -> InMemoryRepository<User> {
        InMemoryRepository::new(clock)
            .with_unique(&[UserField::Email])
            .with_hook(Arc::new(CredentialHashingHook::new(Arc::new(
                FixtureCredentialHasher,
            ))))
    }

    fn sign_up_fields(first: &str, email: &str) -> FieldMap<UserField> {
        FieldMap::from([
            (UserField::FirstName, FieldValue::from(first)),
            (UserField::LastName, FieldValue::from("Lovelace")),
            (UserField::Email, FieldValue::from(email)),
            (UserField::Password, FieldValue::from("secret123")),
            (UserField::IsAdmin, FieldValue::from(true)),
        ])
    }

    fn window(limit: u32, page: u64) -> PageWindow {
        let limit = limit.to_string();
        let page = page.to_string();
        PageWindow::compute(
            &pagination::PaginationLimits::default(),
            Some(limit.as_str()),
            Some(page.as_str()),
        )
        .expect("valid window")
    }

    #[rstest]
    #[tokio::test]
    async fn create_drops_non_fillable_fields_and_hashes(clock: Arc<MutableClock>) {
        let repo = users(clock);
        let user = repo
            .create(sign_up_fields("Ada", "ada@example.com"))
            .await
            .expect("create succeeds");

        assert!(!user.is_admin());
        assert!(!user.is_verified());
        assert_eq!(user.password_hash(), "fixture$secret123");
    }

    #[rstest]
    #[tokio::test]
    async fn duplicate_email_conflicts(clock: Arc<MutableClock>) {
        let repo = users(clock);
        repo.create(sign_up_fields("Ada", "ada@example.com"))
            .await
            .expect("first create");
        let err = repo
            .create(sign_up_fields("Ada", "ADA@example.com"))
            .await
            .expect_err("email taken");
        assert_eq!(err.code(), ErrorCode::Conflict);
    }

    #[rstest]
    #[tokio::test]
    async fn find_pages_in_insertion_order(clock: Arc<MutableClock>) {
        let repo = users(clock);
        for (index, name) in ["Ada", "Grace", "Edsger"].into_iter().enumerate() {
            repo.create(sign_up_fields(name, &format!("user{index}@example.com")))
                .await
                .expect("create");
        }

        let page = repo
            .find(&FindQuery::new(window(2, 2)))
            .await
            .expect("find succeeds");
        assert_eq!(page.pagination.total_items, 3);
        assert_eq!(page.pagination.total_page, 2);
        let names: Vec<_> = page.data.iter().map(User::first_name).collect();
        assert_eq!(names, ["Edsger"]);
    }

    #[rstest]
    #[tokio::test]
    async fn find_sorts_descending(clock: Arc<MutableClock>) {
        let repo = users(clock);
        for (index, name) in ["Ada", "Grace", "Edsger"].into_iter().enumerate() {
            repo.create(sign_up_fields(name, &format!("user{index}@example.com")))
                .await
                .expect("create");
        }

        let query =
            FindQuery::new(window(10, 1)).with_sort(UserField::FirstName, SortDirection::Desc);
        let page = repo.find(&query).await.expect("find succeeds");
        let names: Vec<_> = page.data.iter().map(User::first_name).collect();
        assert_eq!(names, ["Grace", "Edsger", "Ada"]);
    }

    #[rstest]
    #[tokio::test]
    async fn update_runs_precondition_against_stored_row(clock: Arc<MutableClock>) {
        let repo = users(Arc::clone(&clock));
        let stale = repo
            .create(sign_up_fields("Ada", "ada@example.com"))
            .await
            .expect("create");
        let verify = FieldMap::from([(UserField::IsVerified, FieldValue::from(true))]);
        repo.update(&stale, verify.clone(), None)
            .await
            .expect("first verification");

        let guard = |current: &User| {
            if current.is_verified() {
                Err(Error::conflict("already verified"))
            } else {
                Ok(())
            }
        };
        let err = repo
            .update(&stale, verify, Some(&guard))
            .await
            .expect_err("stored row already verified");
        assert_eq!(err.code(), ErrorCode::Conflict);
    }

    #[rstest]
    #[tokio::test]
    async fn update_refreshes_updated_at(clock: Arc<MutableClock>) {
        let repo = users(Arc::clone(&clock));
        let user = repo
            .create(sign_up_fields("Ada", "ada@example.com"))
            .await
            .expect("create");
        clock.advance_seconds(60);
        let patch = FieldMap::from([(UserField::LastName, FieldValue::from("Byron"))]);
        let updated = repo.update(&user, patch, None).await.expect("update");

        assert_eq!(updated.created_at(), user.created_at());
        assert!(updated.updated_at() > user.updated_at());
    }

    #[rstest]
    #[tokio::test]
    async fn delete_reports_missing_rows(clock: Arc<MutableClock>) {
        let repo = users(clock);
        let err = repo
            .delete(&Criteria::by(UserField::Id, Uuid::new_v4()), None)
            .await
            .expect_err("nothing to delete");
        assert_eq!(err.code(), ErrorCode::NotFound);
        assert_eq!(err.message(), "User not found");
    }

    #[rstest]
    #[tokio::test]
    async fn rejected_delete_keeps_rows(clock: Arc<MutableClock>) {
        let repo = users(clock);
        let user = repo
            .create(sign_up_fields("Ada", "ada@example.com"))
            .await
            .expect("create");
        let refuse = |_: &User| Err(Error::conflict("still referenced"));
        let criteria = Criteria::by(UserField::Id, user.id());

        repo.delete(&criteria, Some(&refuse))
            .await
            .expect_err("precondition refuses");
        assert!(repo.exists(&criteria).await.expect("exists"));
    }

    #[rstest]
    #[tokio::test]
    async fn check_duplicate_honours_exception(clock: Arc<MutableClock>) {
        let repo = users(clock);
        let user = repo
            .create(sign_up_fields("Ada", "ada@example.com"))
            .await
            .expect("create");
        let criteria = Criteria::by(UserField::Email, "ada@example.com");
        let own_id = user.id();
        let is_self = move |found: &User| found.id() == own_id;

        repo.check_duplicate(&criteria, "taken", Some(&is_self))
            .await
            .expect("own row is not a duplicate");
        let err = repo
            .check_duplicate(&criteria, "taken", None)
            .await
            .expect_err("duplicate");
        assert_eq!(err.message(), "taken");
    }
}
