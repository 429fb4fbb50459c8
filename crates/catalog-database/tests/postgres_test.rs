//! Round-trip tests against a real PostgreSQL database.
//!
//! Ignored by default. Run with
//! `CATALOG_TEST_DATABASE_URL=postgres://... cargo test -- --ignored --test-threads=1`,
//! since every test truncates the catalog tables.

use sqlx::PgPool;

use catalog_core::ErrorKind;
use catalog_core::config::{IsolationLevel, TextConfig};
use catalog_core::traits::{Session, Store};
use catalog_core::types::{Paging, Predicate, Sort};
use catalog_database::migration::run_migrations;
use catalog_database::{DatabasePool, PgStore, Repository};
use catalog_entity::{
    Category, CategoryField, CategoryGet, Product, ProductCategory, ProductField, ProductGet,
    ProductRelation,
};

async fn setup() -> PgStore {
    let url = std::env::var("CATALOG_TEST_DATABASE_URL")
        .expect("CATALOG_TEST_DATABASE_URL must be set for PostgreSQL tests");
    let pool = PgPool::connect(&url).await.expect("Failed to connect");
    run_migrations(&pool).await.expect("Failed to run migrations");
    sqlx::query("TRUNCATE product_categories, products, categories RESTART IDENTITY CASCADE")
        .execute(&pool)
        .await
        .expect("Failed to clean database");
    PgStore::new(
        &DatabasePool::from_pool(pool),
        TextConfig::default(),
        IsolationLevel::RepeatableRead,
    )
}

#[tokio::test]
#[ignore]
async fn test_category_scenario() {
    let store = setup().await;
    let repo = Repository::<Category>::new();

    let mut session = store.begin().await.expect("begin");
    let stored = repo
        .insert(&mut session, Category::new("Electronics"))
        .await
        .expect("insert");
    session.commit().await.expect("commit");

    let mut session = store.begin().await.expect("begin");
    let page = repo
        .list_with_total::<CategoryGet, _>(
            &mut session,
            &Predicate::contains(CategoryField::Name, "elect"),
            &Sort::asc(CategoryField::Name),
            Paging::new(Some(0), Some(10)),
        )
        .await
        .expect("list");
    assert_eq!(page.total, 1);
    assert_eq!(page.data[0].id, stored.id);
    assert_eq!(page.data[0].created_date, stored.created_date);

    let by_id = Predicate::eq(CategoryField::Id, stored.id);
    let matched = repo
        .update_where(&mut session, &by_id, &[], |c| c.name = "Gadgets".into())
        .await
        .expect("update");
    assert_eq!(matched, 1);
    let renamed: CategoryGet = repo.get_one(&mut session, &by_id).await.expect("get");
    assert_eq!(renamed.name, "Gadgets");

    repo.delete_where(&mut session, &by_id).await.expect("delete");
    let err = repo
        .get_one::<CategoryGet, _>(&mut session, &by_id)
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::NotFound);
    session.commit().await.expect("commit");
}

#[tokio::test]
#[ignore]
async fn test_product_association_replacement() {
    let store = setup().await;
    let categories = Repository::<Category>::new();
    let products = Repository::<Product>::new();

    let mut session = store.begin().await.expect("begin");
    let a = categories.insert(&mut session, Category::new("A")).await.expect("a");
    let b = categories.insert(&mut session, Category::new("B")).await.expect("b");
    let c = categories.insert(&mut session, Category::new("C")).await.expect("c");
    let product = products
        .insert(
            &mut session,
            Product::new("Atlas", Some("World maps".into()), 1500).with_categories([a.id, b.id]),
        )
        .await
        .expect("product");

    products
        .update_where(
            &mut session,
            &Predicate::eq(ProductField::Id, product.id),
            &[ProductRelation::Categories],
            |p| p.categories = Some(vec![ProductCategory::to_category(c.id)]),
        )
        .await
        .expect("update");
    session.commit().await.expect("commit");

    let mut session = store.begin().await.expect("begin");
    let got: ProductGet = products
        .get_one(&mut session, &Predicate::eq(ProductField::Id, product.id))
        .await
        .expect("get");
    assert_eq!(got.categories.len(), 1);
    assert_eq!(got.categories[0].category_id, c.id);
    assert_eq!(got.categories[0].category_name, "C");
}

#[tokio::test]
#[ignore]
async fn test_dropped_session_rolls_back() {
    let store = setup().await;
    let repo = Repository::<Category>::new();

    let mut session = store.begin().await.expect("begin");
    repo.insert(&mut session, Category::new("Ephemeral"))
        .await
        .expect("insert");
    drop(session);

    let mut session = store.begin().await.expect("begin");
    let page = repo
        .list_with_total::<CategoryGet, _>(
            &mut session,
            &Predicate::True,
            &Sort::unsorted(),
            Paging::unbounded(),
        )
        .await
        .expect("list");
    assert_eq!(page.total, 0);
}

#[tokio::test]
#[ignore]
async fn test_negative_price_hits_check_constraint() {
    let store = setup().await;
    let mut session = store.begin().await.expect("begin");
    let err = sqlx::query("INSERT INTO products (name, price, created_date) VALUES ('x', -1, now())")
        .execute(store.pool())
        .await
        .unwrap_err();
    assert_eq!(
        catalog_database::error::classify(&err),
        ErrorKind::IntegrityViolation
    );

    let err = Repository::<Product>::new()
        .insert(&mut session, Product::new("x", None, -1))
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::Validation);
}
