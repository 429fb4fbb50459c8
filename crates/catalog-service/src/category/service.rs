//! Category listing, lookup and CRUD.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use catalog_core::error::AppError;
use catalog_core::result::AppResult;
use catalog_core::traits::{Session, Store};
use catalog_core::types::{PagedList, Predicate, SortKeyRegistry};
use catalog_database::Repository;
use catalog_entity::{Category, CategoryField, CategoryGet};

use crate::listing::ListRequest;

/// Request to create a category.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateCategoryRequest {
    /// Category name.
    pub name: String,
}

/// Request to rename a category.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateCategoryRequest {
    /// New name.
    pub name: String,
}

/// Manages categories.
#[derive(Debug, Clone)]
pub struct CategoryService<S: Store> {
    /// Backing store.
    store: Arc<S>,
    /// Category repository.
    repo: Repository<Category>,
    /// Accepted sort keys.
    sort_keys: SortKeyRegistry<CategoryField>,
}

impl<S: Store> CategoryService<S> {
    /// Creates a new category service.
    pub fn new(store: Arc<S>) -> AppResult<Self> {
        Ok(Self {
            store,
            repo: Repository::new(),
            sort_keys: Category::sort_keys()?,
        })
    }

    /// Lists categories with the total count of matches.
    pub async fn list(&self, request: &ListRequest) -> AppResult<PagedList<CategoryGet>> {
        let filter = request.filter(CategoryField::CreatedDate, CategoryField::Name);
        let sort = request.sort(&self.sort_keys);

        let mut session = self.store.begin().await?;
        let page = self
            .repo
            .list_with_total(&mut session, &filter, &sort, request.paging())
            .await?;
        session.commit().await?;
        Ok(page)
    }

    /// Gets a category by ID.
    pub async fn get(&self, id: i64) -> AppResult<CategoryGet> {
        let mut session = self.store.begin().await?;
        let category = self
            .repo
            .get_one(&mut session, &Predicate::eq(CategoryField::Id, id))
            .await?;
        session.commit().await?;
        Ok(category)
    }

    /// Creates a category.
    pub async fn create(&self, request: CreateCategoryRequest) -> AppResult<CategoryGet> {
        if request.name.trim().is_empty() {
            warn!("Rejected category without a name");
            return Err(AppError::validation("Category name cannot be empty"));
        }

        let mut session = self.store.begin().await?;
        let stored = self
            .repo
            .insert(&mut session, Category::new(request.name))
            .await?;
        session.commit().await?;

        info!(category_id = stored.id, name = %stored.name, "Category created");
        Ok(CategoryGet {
            id: stored.id,
            name: stored.name,
            created_date: stored.created_date,
        })
    }

    /// Renames a category.
    pub async fn update(&self, id: i64, request: UpdateCategoryRequest) -> AppResult<CategoryGet> {
        require_id(id)?;
        if request.name.trim().is_empty() {
            warn!(category_id = id, "Rejected blank category name");
            return Err(AppError::validation("Category name cannot be empty"));
        }

        let filter = Predicate::eq(CategoryField::Id, id);
        let mut session = self.store.begin().await?;
        let matched = self
            .repo
            .update_where(&mut session, &filter, &[], |c| c.name.clone_from(&request.name))
            .await?;
        if matched == 0 {
            return Err(AppError::not_found("Category not found"));
        }
        let updated = self.repo.get_one(&mut session, &filter).await?;
        session.commit().await?;

        info!(category_id = id, "Category updated");
        Ok(updated)
    }

    /// Deletes a category and its product assignments.
    pub async fn delete(&self, id: i64) -> AppResult<()> {
        require_id(id)?;

        let mut session = self.store.begin().await?;
        let removed = self
            .repo
            .delete_where(&mut session, &Predicate::eq(CategoryField::Id, id))
            .await?;
        if removed == 0 {
            return Err(AppError::not_found("Category not found"));
        }
        session.commit().await?;

        info!(category_id = id, "Category deleted");
        Ok(())
    }
}

/// Reject identities the store can never have assigned.
pub(crate) fn require_id(id: i64) -> AppResult<()> {
    if id <= 0 {
        warn!(id, "Rejected non-positive identity");
        return Err(AppError::validation(format!("Invalid identity {id}")));
    }
    Ok(())
}
