//! Integration tests for `DieselCatalogueRepository` against embedded
//! PostgreSQL.
//!
//! These go straight at the repository so the partial unique indexes and the
//! `ON DELETE RESTRICT` parent reference are what reject bad writes.

use std::sync::Arc;

use mockable::Clock;
use pagination::PageParams;
use research_backend::domain::catalogue::{Discipline, OrderType, ResearchCategory};
use research_backend::domain::ports::Repository;
use research_backend::domain::{
    CatalogueEntry, CatalogueField, CatalogueKind, CatalogueService, ChildReferences, Criteria,
    ErrorCode, FieldMap, FieldValue, ParentLock,
};
use research_backend::outbound::persistence::{DbPool, DieselCatalogueRepository};
use research_backend::test_support::MutableClock;
use rstest::{fixture, rstest};
use uuid::Uuid;

mod support;

use support::{PgContext, handle_cluster_setup_failure, pg_context};

type Repo<K> = Arc<dyn Repository<CatalogueEntry<K>>>;

struct TestContext {
    pg: PgContext,
    categories: Repo<ResearchCategory>,
    disciplines: Repo<Discipline>,
    order_types: Repo<OrderType>,
}

fn repo<K: CatalogueKind>(pool: &DbPool, clock: &Arc<dyn Clock>) -> Repo<K> {
    Arc::new(DieselCatalogueRepository::<K>::new(pool.clone(), Arc::clone(clock)))
}

#[fixture]
fn repo_context() -> Option<TestContext> {
    match pg_context() {
        Ok(pg) => {
            let clock: Arc<dyn Clock> = Arc::new(MutableClock::fixed());
            Some(TestContext {
                categories: repo(&pg.pool, &clock),
                disciplines: repo(&pg.pool, &clock),
                order_types: repo(&pg.pool, &clock),
                pg,
            })
        }
        Err(reason) => handle_cluster_setup_failure(reason),
    }
}

fn titled(title: &str) -> FieldMap<CatalogueField> {
    FieldMap::from([(CatalogueField::Title, FieldValue::from(title))])
}

fn titled_in(title: &str, category: Uuid) -> FieldMap<CatalogueField> {
    let mut fields = titled(title);
    fields.insert(CatalogueField::ResearchCategoryId, FieldValue::from(category));
    fields
}

#[rstest]
fn labels_are_unique_within_their_scope(repo_context: Option<TestContext>) {
    let Some(context) = repo_context else {
        eprintln!("SKIP-TEST-CLUSTER: labels_are_unique_within_their_scope skipped");
        return;
    };

    context.pg.runtime.block_on(async {
        let science = context.categories.create(titled("Science")).await.expect("science");
        let arts = context.categories.create(titled("Arts")).await.expect("arts");

        context
            .disciplines
            .create(titled_in("History", science.id()))
            .await
            .expect("first history");
        context
            .disciplines
            .create(titled_in("History", arts.id()))
            .await
            .expect("same label in another category");
        let err = context
            .disciplines
            .create(titled_in("History", science.id()))
            .await
            .expect_err("same label in the same category");
        assert_eq!(err.code(), ErrorCode::Conflict);
        assert_eq!(err.message(), "Discipline already exists");

        context.order_types.create(titled("Express")).await.expect("order type");
        let err = context
            .order_types
            .create(titled("Express"))
            .await
            .expect_err("global duplicate");
        assert_eq!(err.message(), "Order type already exists");

        // Kinds share the table but not the label scope.
        context
            .categories
            .create(titled("Express"))
            .await
            .expect("category may reuse an order type label");
    });
}

#[rstest]
fn referenced_categories_are_restricted(repo_context: Option<TestContext>) {
    let Some(context) = repo_context else {
        eprintln!("SKIP-TEST-CLUSTER: referenced_categories_are_restricted skipped");
        return;
    };

    context.pg.runtime.block_on(async {
        let science = context.categories.create(titled("Science")).await.expect("science");
        context
            .disciplines
            .create(titled_in("Physics", science.id()))
            .await
            .expect("discipline");

        let err = context
            .categories
            .delete(&Criteria::by(CatalogueField::Id, science.id()), None)
            .await
            .expect_err("foreign key restricts the delete");
        assert_eq!(err.code(), ErrorCode::Conflict);
        assert_eq!(err.message(), "Research category conflicts with a related record");

        let orphan = context
            .disciplines
            .create(titled_in("Chemistry", Uuid::new_v4()))
            .await
            .expect_err("parent must exist");
        assert_eq!(orphan.code(), ErrorCode::Conflict);

        assert!(
            context
                .categories
                .exists(&Criteria::by(CatalogueField::Id, science.id()))
                .await
                .expect("lookup")
        );
    });
}

#[rstest]
fn guarded_deletes_race_child_creates_safely(repo_context: Option<TestContext>) {
    let Some(context) = repo_context else {
        eprintln!("SKIP-TEST-CLUSTER: guarded_deletes_race_child_creates_safely skipped");
        return;
    };

    let lock = ParentLock::new();
    let categories = Arc::new(
        CatalogueService::new(Arc::clone(&context.categories))
            .with_relation(Arc::new(ChildReferences::new(Arc::clone(&context.disciplines))))
            .with_parent_lock(lock.clone()),
    );
    let disciplines = Arc::new(
        CatalogueService::new(Arc::clone(&context.disciplines))
            .with_categories(Arc::clone(&context.categories))
            .with_parent_lock(lock),
    );

    context.pg.runtime.block_on(async {
        let science = categories.create(titled("Science")).await.expect("science");
        let id = science.id();

        let create = tokio::spawn({
            let disciplines = Arc::clone(&disciplines);
            async move { disciplines.create(titled_in("Physics", id)).await }
        });
        let delete = tokio::spawn({
            let categories = Arc::clone(&categories);
            async move { categories.delete(id).await }
        });
        let (created, deleted) = tokio::join!(create, delete);
        let (created, deleted) = (created.expect("create task"), deleted.expect("delete task"));

        let children = disciplines
            .list_in_category(id, &PageParams::default())
            .await
            .expect("children");
        match (created, deleted) {
            (Ok(_), Err(err)) => {
                assert_eq!(err.sub_code(), Some("still_referenced"));
                assert_eq!(children.pagination.total_items, 1);
            }
            (Err(err), Ok(())) => {
                assert_eq!(err.code(), ErrorCode::NotFound);
                assert_eq!(children.pagination.total_items, 0);
            }
            (created, deleted) => panic!("inconsistent outcome: {created:?} / {deleted:?}"),
        }
    });
}
