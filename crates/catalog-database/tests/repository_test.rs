//! Integration tests for the generic repository over an in-memory SQLite store.

use std::collections::HashSet;

use catalog_core::ErrorKind;
use catalog_core::config::TextConfig;
use catalog_core::traits::{Session, Store};
use catalog_core::types::{Paging, Predicate, Sort};
use catalog_database::{Repository, SqliteStore};
use catalog_entity::{
    Category, CategoryField, CategoryGet, Product, ProductCategory, ProductCategoryField,
    ProductField, ProductGet, ProductRelation,
};

async fn store() -> SqliteStore {
    SqliteStore::in_memory(TextConfig::default())
        .await
        .expect("in-memory store")
}

async fn seed_categories(store: &SqliteStore, names: &[&str]) -> Vec<Category> {
    let repo = Repository::<Category>::new();
    let mut session = store.begin().await.expect("begin");
    let mut out = Vec::new();
    for name in names {
        out.push(
            repo.insert(&mut session, Category::new(*name))
                .await
                .expect("insert category"),
        );
    }
    session.commit().await.expect("commit");
    out
}

#[tokio::test]
async fn test_insert_assigns_fresh_identity() {
    let store = store().await;
    let repo = Repository::<Category>::new();

    let mut session = store.begin().await.expect("begin");
    let mut input = Category::new("Books");
    input.id = 42;
    let first = repo.insert(&mut session, input).await.expect("insert");
    let second = repo
        .insert(&mut session, Category::new("Music"))
        .await
        .expect("insert");
    session.commit().await.expect("commit");

    assert_ne!(first.id, 42);
    assert_ne!(first.id, second.id);

    let mut session = store.begin().await.expect("begin");
    repo.delete_where(&mut session, &Predicate::eq(CategoryField::Id, second.id))
        .await
        .expect("delete");
    let third = repo
        .insert(&mut session, Category::new("Games"))
        .await
        .expect("insert");
    assert!(third.id > second.id, "identities are never reused");
}

#[tokio::test]
async fn test_total_is_independent_of_paging() {
    let store = store().await;
    seed_categories(&store, &["a1", "a2", "a3", "b1", "a4"]).await;
    let repo = Repository::<Category>::new();
    let filter = Predicate::contains(CategoryField::Name, "a");

    let mut session = store.begin().await.expect("begin");
    for (skip, take) in [(None, None), (Some(0), Some(2)), (Some(3), Some(10)), (Some(9), Some(1))] {
        let page = repo
            .list_with_total::<CategoryGet, _>(
                &mut session,
                &filter,
                &Sort::asc(CategoryField::Name),
                Paging::new(skip, take),
            )
            .await
            .expect("list");
        assert_eq!(page.total, 4);
    }
}

#[tokio::test]
async fn test_page_is_slice_of_sorted_sequence() {
    let store = store().await;
    seed_categories(&store, &["delta", "alpha", "echo", "charlie", "bravo"]).await;
    let repo = Repository::<Category>::new();
    let mut session = store.begin().await.expect("begin");

    let full: Vec<String> = repo
        .list_with_total::<CategoryGet, _>(
            &mut session,
            &Predicate::True,
            &Sort::asc(CategoryField::Name),
            Paging::unbounded(),
        )
        .await
        .expect("list")
        .data
        .into_iter()
        .map(|c| c.name)
        .collect();
    assert_eq!(full, ["alpha", "bravo", "charlie", "delta", "echo"]);

    let page = repo
        .list_with_total::<CategoryGet, _>(
            &mut session,
            &Predicate::True,
            &Sort::asc(CategoryField::Name),
            Paging::new(Some(1), Some(2)),
        )
        .await
        .expect("list");
    let names: Vec<_> = page.data.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, ["bravo", "charlie"]);

    let beyond = repo
        .list_with_total::<CategoryGet, _>(
            &mut session,
            &Predicate::True,
            &Sort::asc(CategoryField::Name),
            Paging::new(Some(10), Some(2)),
        )
        .await
        .expect("list");
    assert!(beyond.data.is_empty());
    assert_eq!(beyond.total, 5);
}

#[tokio::test]
async fn test_ties_are_broken_by_identity() {
    let store = store().await;
    let seeded = seed_categories(&store, &["same", "same", "same"]).await;
    let repo = Repository::<Category>::new();
    let mut session = store.begin().await.expect("begin");

    let page = repo
        .list_with_total::<CategoryGet, _>(
            &mut session,
            &Predicate::True,
            &Sort::desc(CategoryField::Name),
            Paging::unbounded(),
        )
        .await
        .expect("list");
    let ids: Vec<_> = page.data.iter().map(|c| c.id).collect();
    let expected: Vec<_> = seeded.iter().map(|c| c.id).collect();
    assert_eq!(ids, expected);
}

#[tokio::test]
async fn test_find_one_returns_lowest_identity() {
    let store = store().await;
    let seeded = seed_categories(&store, &["x", "x"]).await;
    let repo = Repository::<Category>::new();
    let mut session = store.begin().await.expect("begin");

    let found: Option<CategoryGet> = repo
        .find_one(&mut session, &Predicate::eq(CategoryField::Name, "x"))
        .await
        .expect("find");
    assert_eq!(found.map(|c| c.id), Some(seeded[0].id));

    let missing: Option<CategoryGet> = repo
        .find_one(&mut session, &Predicate::eq(CategoryField::Name, "y"))
        .await
        .expect("find");
    assert!(missing.is_none());

    let err = repo
        .get_one::<CategoryGet, _>(&mut session, &Predicate::eq(CategoryField::Id, 999_i64))
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::NotFound);
}

#[tokio::test]
async fn test_update_touches_only_mutated_fields() {
    let store = store().await;
    let repo = Repository::<Product>::new();

    let mut session = store.begin().await.expect("begin");
    let stored = repo
        .insert(
            &mut session,
            Product::new("Lamp", Some("Desk lamp".into()), 1200),
        )
        .await
        .expect("insert");

    let matched = repo
        .update_where(
            &mut session,
            &Predicate::eq(ProductField::Id, stored.id),
            &[],
            |p| p.price = 900,
        )
        .await
        .expect("update");
    assert_eq!(matched, 1);

    let after: Product = repo
        .get_one(&mut session, &Predicate::eq(ProductField::Id, stored.id))
        .await
        .expect("get");
    assert_eq!(after.price, 900);
    assert_eq!(after.name, stored.name);
    assert_eq!(after.description, stored.description);
    assert_eq!(after.created_date, stored.created_date);
}

#[tokio::test]
async fn test_update_with_no_match_is_noop() {
    let store = store().await;
    let repo = Repository::<Category>::new();
    let mut session = store.begin().await.expect("begin");

    let mut calls = 0;
    let matched = repo
        .update_where(
            &mut session,
            &Predicate::eq(CategoryField::Id, 7_i64),
            &[],
            |_| calls += 1,
        )
        .await
        .expect("update");
    assert_eq!(matched, 0);
    assert_eq!(calls, 0);
}

#[tokio::test]
async fn test_update_rejects_identity_and_creation_changes() {
    let store = store().await;
    let seeded = seed_categories(&store, &["Books"]).await;
    let repo = Repository::<Category>::new();
    let filter = Predicate::eq(CategoryField::Id, seeded[0].id);

    let mut session = store.begin().await.expect("begin");
    let err = repo
        .update_where(&mut session, &filter, &[], |c| c.id += 1)
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::Validation);

    let err = repo
        .update_where(&mut session, &filter, &[], |c| {
            c.created_date = chrono::Utc::now() + chrono::Duration::days(1)
        })
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::Validation);
}

#[tokio::test]
async fn test_replacing_unincluded_relation_is_rejected() {
    let store = store().await;
    let seeded = seed_categories(&store, &["Books"]).await;
    let repo = Repository::<Product>::new();

    let mut session = store.begin().await.expect("begin");
    let product = repo
        .insert(&mut session, Product::new("Atlas", None, 10))
        .await
        .expect("insert");
    let category_id = seeded[0].id;
    let err = repo
        .update_where(
            &mut session,
            &Predicate::eq(ProductField::Id, product.id),
            &[],
            move |p| p.categories = Some(vec![ProductCategory::to_category(category_id)]),
        )
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::Validation);
}

#[tokio::test]
async fn test_included_relation_is_reconciled() {
    let store = store().await;
    let seeded = seed_categories(&store, &["Books", "Maps", "Travel"]).await;
    let (books, maps, travel) = (seeded[0].id, seeded[1].id, seeded[2].id);
    let products = Repository::<Product>::new();
    let edges = Repository::<ProductCategory>::new();

    let mut session = store.begin().await.expect("begin");
    let product = products
        .insert(
            &mut session,
            Product::new("Atlas", None, 10).with_categories([books, maps]),
        )
        .await
        .expect("insert");
    assert_eq!(product.categories.as_ref().map(Vec::len), Some(2));

    products
        .update_where(
            &mut session,
            &Predicate::eq(ProductField::Id, product.id),
            &[ProductRelation::Categories],
            move |p| {
                if let Some(categories) = p.categories.as_mut() {
                    categories.retain(|e| e.category_id != books);
                    categories.push(ProductCategory::to_category(travel));
                }
            },
        )
        .await
        .expect("update");

    let page = edges
        .list_with_total::<ProductCategory, _>(
            &mut session,
            &Predicate::eq(ProductCategoryField::ProductId, product.id),
            &Sort::asc(ProductCategoryField::CategoryId),
            Paging::unbounded(),
        )
        .await
        .expect("list");
    let ids: Vec<_> = page.data.iter().map(|e| e.category_id).collect();
    assert_eq!(ids, [maps, travel]);
}

#[tokio::test]
async fn test_duplicate_edges_are_integrity_violations() {
    let store = store().await;
    let seeded = seed_categories(&store, &["Books"]).await;
    let repo = Repository::<Product>::new();

    let mut session = store.begin().await.expect("begin");
    let err = repo
        .insert(
            &mut session,
            Product::new("Atlas", None, 10).with_categories([seeded[0].id, seeded[0].id]),
        )
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::IntegrityViolation);
}

#[tokio::test]
async fn test_delete_where_removes_exactly_matches() {
    let store = store().await;
    seed_categories(&store, &["keep", "drop", "drop"]).await;
    let repo = Repository::<Category>::new();
    let filter = Predicate::eq(CategoryField::Name, "drop");

    let mut session = store.begin().await.expect("begin");
    assert_eq!(repo.delete_where(&mut session, &filter).await.expect("delete"), 2);
    assert_eq!(repo.delete_where(&mut session, &filter).await.expect("delete"), 0);

    let found: Option<Category> = repo.find_one(&mut session, &filter).await.expect("find");
    assert!(found.is_none());
    let rest = repo
        .list_with_total::<CategoryGet, _>(
            &mut session,
            &Predicate::True,
            &Sort::unsorted(),
            Paging::unbounded(),
        )
        .await
        .expect("list");
    assert_eq!(rest.total, 1);
}

#[tokio::test]
async fn test_deleting_product_removes_edges() {
    let store = store().await;
    let seeded = seed_categories(&store, &["Books", "Maps"]).await;
    let products = Repository::<Product>::new();
    let edges = Repository::<ProductCategory>::new();

    let mut session = store.begin().await.expect("begin");
    let product = products
        .insert(
            &mut session,
            Product::new("Atlas", None, 10).with_categories(seeded.iter().map(|c| c.id)),
        )
        .await
        .expect("insert");
    products
        .delete_where(&mut session, &Predicate::eq(ProductField::Id, product.id))
        .await
        .expect("delete");

    let left = edges
        .list_with_total::<ProductCategory, _>(
            &mut session,
            &Predicate::True,
            &Sort::unsorted(),
            Paging::unbounded(),
        )
        .await
        .expect("list");
    assert_eq!(left.total, 0);
}

#[tokio::test]
async fn test_projection_joins_category_names() {
    let store = store().await;
    let seeded = seed_categories(&store, &["Maps", "Books"]).await;
    let repo = Repository::<Product>::new();

    let mut session = store.begin().await.expect("begin");
    let product = repo
        .insert(
            &mut session,
            Product::new("Atlas", None, 10).with_categories(seeded.iter().map(|c| c.id)),
        )
        .await
        .expect("insert");
    let got: ProductGet = repo
        .get_one(&mut session, &Predicate::eq(ProductField::Id, product.id))
        .await
        .expect("get");

    let names: Vec<_> = got
        .categories
        .iter()
        .map(|c| c.category_name.as_str())
        .collect();
    assert_eq!(names, ["Maps", "Books"]);
}

#[tokio::test]
async fn test_untranslatable_filter_fails_before_io() {
    let store = store().await;
    let repo = Repository::<Category>::new();
    let mut session = store.begin().await.expect("begin");

    let err = repo
        .delete_where(&mut session, &Predicate::eq(CategoryField::Name, 5_i64))
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::Translation);
    assert!(!err.is_retryable());
}

#[tokio::test]
async fn test_search_folds_turkish_case() {
    let store = store().await;
    seed_categories(&store, &["IŞIK", "İzmir", "Işıklar", "Iris"]).await;
    let repo = Repository::<Category>::new();
    let mut session = store.begin().await.expect("begin");

    for (needle, expected) in [
        ("ışık", vec!["IŞIK", "Işıklar"]),
        ("Işık", vec!["IŞIK", "Işıklar"]),
        ("izmir", vec!["İzmir"]),
        ("İZMİR", vec!["İzmir"]),
    ] {
        let page = repo
            .list_with_total::<CategoryGet, _>(
                &mut session,
                &Predicate::contains(CategoryField::Name, needle),
                &Sort::asc(CategoryField::Id),
                Paging::unbounded(),
            )
            .await
            .expect("list");
        let names: Vec<_> = page.data.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, expected, "search for {needle}");
    }
}

#[tokio::test]
async fn test_names_sort_in_turkish_order() {
    let store = store().await;
    seed_categories(&store, &["zeytin", "çay", "ımsak", "cam", "İpek", "Ilık"]).await;
    let repo = Repository::<Category>::new();
    let mut session = store.begin().await.expect("begin");

    let page = repo
        .list_with_total::<CategoryGet, _>(
            &mut session,
            &Predicate::True,
            &Sort::asc(CategoryField::Name),
            Paging::unbounded(),
        )
        .await
        .expect("list");
    let names: Vec<_> = page.data.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, ["cam", "çay", "Ilık", "ımsak", "İpek", "zeytin"]);
}

#[tokio::test]
async fn test_concurrent_inserts_get_distinct_identities() {
    const WRITERS: usize = 16;
    let store = store().await;

    let handles: Vec<_> = (0..WRITERS)
        .map(|i| {
            let store = store.clone();
            tokio::spawn(async move {
                let repo = Repository::<Category>::new();
                let mut session = store.begin().await.expect("begin");
                let stored = repo
                    .insert(&mut session, Category::new(format!("writer {i}")))
                    .await
                    .expect("insert");
                session.commit().await.expect("commit");
                stored.id
            })
        })
        .collect();

    let mut ids = HashSet::new();
    for handle in handles {
        ids.insert(handle.await.expect("join"));
    }
    assert_eq!(ids.len(), WRITERS);

    let repo = Repository::<Category>::new();
    let mut session = store.begin().await.expect("begin");
    let all = repo
        .list_with_total::<CategoryGet, _>(
            &mut session,
            &Predicate::True,
            &Sort::unsorted(),
            Paging::unbounded(),
        )
        .await
        .expect("list");
    assert_eq!(all.total, WRITERS as u64);
}
