//! Regression coverage for the catalogue service.

use super::*;
use crate::domain::catalogue::{Discipline, OrderType, PaperType};
use crate::domain::{ErrorCode, FieldValue};
use crate::outbound::memory::InMemoryRepository;
use crate::test_support::MutableClock;
use rstest::{fixture, rstest};

type Repo<K> = Arc<dyn Repository<CatalogueEntry<K>>>;

struct Catalogue {
    categories: CatalogueService<ResearchCategory>,
    disciplines: CatalogueService<Discipline>,
    paper_types: CatalogueService<PaperType>,
    order_types: CatalogueService<OrderType>,
}

fn repo<K: CatalogueKind>(clock: &Arc<MutableClock>) -> Repo<K> {
    let scope = if K::PARENTED {
        vec![CatalogueField::ResearchCategoryId, K::LABEL]
    } else {
        vec![K::LABEL]
    };
    let clock: Arc<dyn mockable::Clock> = Arc::clone(clock) as Arc<dyn mockable::Clock>;
    Arc::new(InMemoryRepository::new(clock).with_unique(&scope))
}

/// Category store that yields to the scheduler after every lookup, widening
/// the window between a parent check and the write that depends on it.
struct YieldingCategories(Repo<ResearchCategory>);

#[async_trait]
impl Repository<CatalogueEntry<ResearchCategory>> for YieldingCategories {
    async fn find_one(
        &self,
        criteria: &Criteria<CatalogueField>,
    ) -> Result<Option<CatalogueEntry<ResearchCategory>>, Error> {
        let found = self.0.find_one(criteria).await;
        tokio::task::yield_now().await;
        found
    }

    async fn find(
        &self,
        query: &FindQuery<CatalogueField>,
    ) -> Result<Paginated<CatalogueEntry<ResearchCategory>>, Error> {
        self.0.find(query).await
    }

    async fn count(&self, criteria: &Criteria<CatalogueField>) -> Result<u64, Error> {
        self.0.count(criteria).await
    }

    async fn create(
        &self,
        fields: FieldMap<CatalogueField>,
    ) -> Result<CatalogueEntry<ResearchCategory>, Error> {
        self.0.create(fields).await
    }

    async fn update(
        &self,
        existing: &CatalogueEntry<ResearchCategory>,
        patch: FieldMap<CatalogueField>,
        precondition: Option<&dyn Precondition<CatalogueEntry<ResearchCategory>>>,
    ) -> Result<CatalogueEntry<ResearchCategory>, Error> {
        self.0.update(existing, patch, precondition).await
    }

    async fn delete(
        &self,
        criteria: &Criteria<CatalogueField>,
        precondition: Option<&dyn Precondition<CatalogueEntry<ResearchCategory>>>,
    ) -> Result<(), Error> {
        self.0.delete(criteria, precondition).await
    }
}

fn catalogue_over(category_repo: Repo<ResearchCategory>, clock: &Arc<MutableClock>) -> Catalogue {
    let discipline_repo = repo::<Discipline>(clock);
    let paper_type_repo = repo::<PaperType>(clock);
    let lock = ParentLock::new();
    Catalogue {
        categories: CatalogueService::new(Arc::clone(&category_repo))
            .with_relation(Arc::new(ChildReferences::new(Arc::clone(&discipline_repo))))
            .with_relation(Arc::new(ChildReferences::new(Arc::clone(&paper_type_repo))))
            .with_parent_lock(lock.clone()),
        disciplines: CatalogueService::new(discipline_repo)
            .with_categories(Arc::clone(&category_repo))
            .with_parent_lock(lock.clone()),
        paper_types: CatalogueService::new(paper_type_repo)
            .with_categories(category_repo)
            .with_parent_lock(lock),
        order_types: CatalogueService::new(repo::<OrderType>(clock)),
    }
}

#[fixture]
fn catalogue() -> Catalogue {
    let clock = Arc::new(MutableClock::fixed());
    catalogue_over(repo::<ResearchCategory>(&clock), &clock)
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
#[tokio::test]
async fn create_then_get(catalogue: Catalogue) {
    let created = catalogue
        .order_types
        .create(titled("  Express  "))
        .await
        .expect("create succeeds");
    let fetched = catalogue.order_types.get(created.id()).await.expect("get");
    assert_eq!(fetched.label(), "Express");
}

#[rstest]
#[tokio::test]
async fn get_unknown_uses_kind_copy(catalogue: Catalogue) {
    let err = catalogue
        .order_types
        .get(Uuid::new_v4())
        .await
        .expect_err("missing");
    assert_eq!(err.code(), ErrorCode::NotFound);
    assert_eq!(err.message(), "Order type not found");
}

#[rstest]
#[tokio::test]
async fn duplicate_labels_conflict_globally(catalogue: Catalogue) {
    catalogue
        .order_types
        .create(titled("Express"))
        .await
        .expect("first");
    let err = catalogue
        .order_types
        .create(titled("Express"))
        .await
        .expect_err("duplicate");
    assert_eq!(err.code(), ErrorCode::Conflict);
    assert_eq!(err.message(), "Order type already exists");
}

#[rstest]
#[tokio::test]
async fn parented_labels_are_unique_per_category(catalogue: Catalogue) {
    let science = catalogue.categories.create(titled("Science")).await.expect("category");
    let arts = catalogue.categories.create(titled("Arts")).await.expect("category");

    catalogue
        .disciplines
        .create(titled_in("History", science.id()))
        .await
        .expect("first");
    catalogue
        .disciplines
        .create(titled_in("History", arts.id()))
        .await
        .expect("other category is a separate scope");
    let err = catalogue
        .disciplines
        .create(titled_in("History", science.id()))
        .await
        .expect_err("duplicate within category");
    assert_eq!(err.code(), ErrorCode::Conflict);
}

#[rstest]
#[tokio::test]
async fn unknown_parent_is_not_found(catalogue: Catalogue) {
    let err = catalogue
        .disciplines
        .create(titled_in("Physics", Uuid::new_v4()))
        .await
        .expect_err("no such category");
    assert_eq!(err.code(), ErrorCode::NotFound);
    assert_eq!(err.message(), "Research category not found");
}

#[rstest]
#[tokio::test]
async fn invalid_labels_fail_before_lookups(catalogue: Catalogue) {
    let err = catalogue
        .disciplines
        .create(titled_in("ab", Uuid::new_v4()))
        .await
        .expect_err("too short");
    assert_eq!(err.code(), ErrorCode::InvalidRequest);
    assert!(err.field_errors().is_some_and(|map| map.contains_key("title")));
}

#[rstest]
#[tokio::test]
async fn unchanged_update_is_not_modified(catalogue: Catalogue) {
    let entry = catalogue
        .order_types
        .create(titled("Express"))
        .await
        .expect("create");
    let err = catalogue
        .order_types
        .update(entry.id(), titled("Express"))
        .await
        .expect_err("no change");
    assert_eq!(err.code(), ErrorCode::NotModified);
}

#[rstest]
#[tokio::test]
async fn update_checks_duplicates_excluding_self(catalogue: Catalogue) {
    let express = catalogue
        .order_types
        .create(titled("Express"))
        .await
        .expect("create");
    catalogue
        .order_types
        .create(titled("Standard"))
        .await
        .expect("create");

    let renamed = catalogue
        .order_types
        .update(express.id(), titled("Priority"))
        .await
        .expect("rename");
    assert_eq!(renamed.label(), "Priority");

    let err = catalogue
        .order_types
        .update(express.id(), titled("Standard"))
        .await
        .expect_err("taken by another entry");
    assert_eq!(err.code(), ErrorCode::Conflict);
}

#[rstest]
#[tokio::test]
async fn referenced_category_cannot_be_deleted(catalogue: Catalogue) {
    let science = catalogue.categories.create(titled("Science")).await.expect("category");
    let review = catalogue
        .paper_types
        .create(titled_in("Review", science.id()))
        .await
        .expect("paper type");

    let err = catalogue
        .categories
        .delete(science.id())
        .await
        .expect_err("still referenced");
    assert_eq!(err.code(), ErrorCode::Conflict);
    assert_eq!(err.sub_code(), Some("still_referenced"));

    catalogue.paper_types.delete(review.id()).await.expect("delete child");
    catalogue
        .categories
        .delete(science.id())
        .await
        .expect("unreferenced category deletes");
}

#[rstest]
#[tokio::test]
async fn listing_sorts_by_visible_fields(catalogue: Catalogue) {
    for title in ["Standard", "Express", "Priority"] {
        catalogue.order_types.create(titled(title)).await.expect("create");
    }
    let page = catalogue
        .order_types
        .list(&PageParams::new(None, None, Some("title:desc")))
        .await
        .expect("list");
    let titles: Vec<_> = page.data.iter().map(CatalogueEntry::label).collect();
    assert_eq!(titles, ["Standard", "Priority", "Express"]);
    assert_eq!(page.pagination.total_items, 3);
}

#[rstest]
#[case(Some("0"), None, None, "limit")]
#[case(None, Some("-1"), None, "page")]
#[case(None, None, Some("colour"), "sort")]
#[tokio::test]
async fn listing_rejects_bad_parameters(
    catalogue: Catalogue,
    #[case] limit: Option<&str>,
    #[case] page: Option<&str>,
    #[case] sort: Option<&str>,
    #[case] field: &str,
) {
    let err = catalogue
        .order_types
        .list(&PageParams::new(limit, page, sort))
        .await
        .expect_err("invalid parameters");
    assert_eq!(err.code(), ErrorCode::InvalidRequest);
    assert!(err.field_errors().is_some_and(|map| map.contains_key(field)));
}

#[tokio::test]
async fn category_delete_never_strands_a_concurrent_child() {
    let clock = Arc::new(MutableClock::fixed());
    let categories: Repo<ResearchCategory> =
        Arc::new(YieldingCategories(repo::<ResearchCategory>(&clock)));
    let catalogue = catalogue_over(categories, &clock);
    let science = catalogue.categories.create(titled("Science")).await.expect("category");

    let (created, deleted) = tokio::join!(
        catalogue.disciplines.create(titled_in("Physics", science.id())),
        catalogue.categories.delete(science.id()),
    );

    let children = catalogue
        .disciplines
        .list_in_category(science.id(), &PageParams::default())
        .await
        .expect("list children");
    match (created, deleted) {
        (Ok(child), Err(err)) => {
            assert_eq!(err.sub_code(), Some("still_referenced"));
            assert_eq!(children.data.len(), 1);
            assert_eq!(children.data[0].id(), child.id());
            catalogue.categories.get(science.id()).await.expect("category kept");
        }
        (Err(err), Ok(())) => {
            assert_eq!(err.code(), ErrorCode::NotFound);
            assert!(children.data.is_empty());
        }
        (created, deleted) => panic!("inconsistent outcome: {created:?} / {deleted:?}"),
    }
}

#[rstest]
#[tokio::test]
async fn listing_in_category_is_scoped_to_the_parent(catalogue: Catalogue) {
    let science = catalogue.categories.create(titled("Science")).await.expect("category");
    let arts = catalogue.categories.create(titled("Arts")).await.expect("category");
    for (title, parent) in [("Physics", science.id()), ("Chemistry", science.id()), ("History", arts.id())] {
        catalogue
            .disciplines
            .create(titled_in(title, parent))
            .await
            .expect("discipline");
    }

    let page = catalogue
        .disciplines
        .list_in_category(science.id(), &PageParams::new(None, None, Some("title")))
        .await
        .expect("list");
    let titles: Vec<_> = page.data.iter().map(CatalogueEntry::label).collect();
    assert_eq!(titles, ["Chemistry", "Physics"]);
    assert_eq!(page.pagination.total_items, 2);
}
