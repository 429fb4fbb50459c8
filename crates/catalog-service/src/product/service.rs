//! Product listing, lookup and CRUD, including category assignment.

use std::collections::HashSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use catalog_core::error::AppError;
use catalog_core::result::AppResult;
use catalog_core::traits::{Session, Store};
use catalog_core::types::{PagedList, Predicate, SortKeyRegistry};
use catalog_database::Repository;
use catalog_entity::{
    Product, ProductCategory, ProductCategoryField, ProductField, ProductGet, ProductRelation,
};

use crate::category::service::require_id;
use crate::listing::ListRequest;

/// Request to create a product.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateProductRequest {
    /// Product name.
    pub name: String,
    /// Optional description.
    #[serde(default)]
    pub description: Option<String>,
    /// Price, never negative.
    pub price: i64,
    /// Categories to assign.
    #[serde(default)]
    pub categories: Vec<i64>,
}

/// Request to update a product. The category list replaces the current one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateProductRequest {
    /// New name.
    pub name: String,
    /// New description.
    #[serde(default)]
    pub description: Option<String>,
    /// New price.
    pub price: i64,
    /// Complete new set of categories.
    #[serde(default)]
    pub categories: Vec<i64>,
}

/// Manages products and their category assignments.
#[derive(Debug, Clone)]
pub struct ProductService<S: Store> {
    /// Backing store.
    store: Arc<S>,
    /// Product repository.
    products: Repository<Product>,
    /// Assignment repository.
    assignments: Repository<ProductCategory>,
    /// Accepted sort keys.
    sort_keys: SortKeyRegistry<ProductField>,
}

impl<S: Store> ProductService<S> {
    /// Creates a new product service.
    pub fn new(store: Arc<S>) -> AppResult<Self> {
        Ok(Self {
            store,
            products: Repository::new(),
            assignments: Repository::new(),
            sort_keys: Product::sort_keys()?,
        })
    }

    /// Lists products with their categories and the total count of matches.
    pub async fn list(&self, request: &ListRequest) -> AppResult<PagedList<ProductGet>> {
        let filter = request.filter(ProductField::CreatedDate, ProductField::Name);
        let sort = request.sort(&self.sort_keys);

        let mut session = self.store.begin().await?;
        let page = self
            .products
            .list_with_total(&mut session, &filter, &sort, request.paging())
            .await?;
        session.commit().await?;
        Ok(page)
    }

    /// Gets a product by ID.
    pub async fn get(&self, id: i64) -> AppResult<ProductGet> {
        let mut session = self.store.begin().await?;
        let product = self
            .products
            .get_one(&mut session, &Predicate::eq(ProductField::Id, id))
            .await?;
        session.commit().await?;
        Ok(product)
    }

    /// Creates a product assigned to the given categories.
    pub async fn create(&self, request: CreateProductRequest) -> AppResult<ProductGet> {
        check_fields(&request.name, request.price)?;
        check_categories(&request.categories)?;

        let product = Product::new(request.name, request.description, request.price)
            .with_categories(request.categories);

        let mut session = self.store.begin().await?;
        let stored = self.products.insert(&mut session, product).await?;
        let created: ProductGet = self
            .products
            .get_one(&mut session, &Predicate::eq(ProductField::Id, stored.id))
            .await?;
        session.commit().await?;

        info!(
            product_id = stored.id,
            categories = created.categories.len(),
            "Product created"
        );
        Ok(created)
    }

    /// Updates a product and replaces its categories.
    ///
    /// Clearing the old assignments and writing the new ones happen in one
    /// session; a failure in either leaves the product as it was.
    pub async fn update(&self, id: i64, request: UpdateProductRequest) -> AppResult<ProductGet> {
        require_id(id)?;
        check_fields(&request.name, request.price)?;
        check_categories(&request.categories)?;

        let filter = Predicate::eq(ProductField::Id, id);
        let mut session = self.store.begin().await?;

        let cleared = self
            .assignments
            .delete_range_where(
                &mut session,
                &Predicate::eq(ProductCategoryField::ProductId, id),
            )
            .await?;

        let matched = self
            .products
            .update_where(
                &mut session,
                &filter,
                &[ProductRelation::Categories],
                |p| {
                    p.name.clone_from(&request.name);
                    p.description.clone_from(&request.description);
                    p.price = request.price;
                    p.categories = Some(
                        request
                            .categories
                            .iter()
                            .map(|c| ProductCategory::new(p.id, *c))
                            .collect(),
                    );
                },
            )
            .await?;
        if matched == 0 {
            return Err(AppError::not_found("Product not found"));
        }

        let updated: ProductGet = self.products.get_one(&mut session, &filter).await?;
        session.commit().await?;

        info!(
            product_id = id,
            cleared,
            categories = updated.categories.len(),
            "Product updated"
        );
        Ok(updated)
    }

    /// Deletes a product and its category assignments.
    pub async fn delete(&self, id: i64) -> AppResult<()> {
        require_id(id)?;

        let mut session = self.store.begin().await?;
        let removed = self
            .products
            .delete_where(&mut session, &Predicate::eq(ProductField::Id, id))
            .await?;
        if removed == 0 {
            return Err(AppError::not_found("Product not found"));
        }
        session.commit().await?;

        info!(product_id = id, "Product deleted");
        Ok(())
    }
}

fn check_fields(name: &str, price: i64) -> AppResult<()> {
    if name.trim().is_empty() {
        warn!("Rejected product without a name");
        return Err(AppError::validation("Product name cannot be empty"));
    }
    if price < 0 {
        warn!(price, "Rejected negative product price");
        return Err(AppError::validation("Product price cannot be negative"));
    }
    Ok(())
}

fn check_categories(ids: &[i64]) -> AppResult<()> {
    let mut seen = HashSet::with_capacity(ids.len());
    for id in ids {
        require_id(*id)?;
        if !seen.insert(*id) {
            warn!(category_id = id, "Rejected duplicate category");
            return Err(AppError::validation(format!(
                "Category {id} is listed more than once"
            )));
        }
    }
    Ok(())
}
