//! Read projections of products.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use catalog_core::AppResult;
use catalog_core::traits::{Projection, Selection};
use catalog_core::types::Record;

use super::model::{Product, ProductField, ProductRelation};

/// A category a product belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryInProduct {
    /// Category identity.
    pub category_id: i64,
    /// Category name.
    pub category_name: String,
}

/// Product as returned by listings and lookups.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductGet {
    /// Identity.
    pub id: i64,
    /// Display name.
    pub name: String,
    /// Free-form description.
    pub description: Option<String>,
    /// Price.
    pub price: i64,
    /// Insertion time.
    pub created_date: DateTime<Utc>,
    /// Categories this product is assigned to.
    pub categories: Vec<CategoryInProduct>,
}

impl Projection<Product> for ProductGet {
    fn selection() -> Selection<Product> {
        Selection::fields(&[
            ProductField::Id,
            ProductField::Name,
            ProductField::Description,
            ProductField::Price,
            ProductField::CreatedDate,
        ])
        .relation(
            ProductRelation::Categories,
            "categories",
            &["category_id", "category_name"],
        )
    }

    fn from_row(mut row: Record) -> AppResult<Self> {
        let categories = row
            .take_list("categories")?
            .into_iter()
            .map(|mut c| {
                Ok(CategoryInProduct {
                    category_id: c.take_i64("category_id")?,
                    category_name: c.take_text("category_name")?,
                })
            })
            .collect::<AppResult<Vec<_>>>()?;

        Ok(Self {
            id: row.take_i64("id")?,
            name: row.take_text("name")?,
            description: row.take_opt_text("description")?,
            price: row.take_i64("price")?,
            created_date: row.take_timestamp("created_date")?,
            categories,
        })
    }
}
