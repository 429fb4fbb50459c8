//! Product entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use catalog_core::traits::{Entity, Field, Lookup, Relation, RelationDef, TableSchema};
use catalog_core::types::{Record, SortKeyRegistry, ValueKind};
use catalog_core::{AppError, AppResult};

use crate::product_category::ProductCategory;
use crate::product_category::model::{edges_from_rows, edges_to_rows};

/// A catalog product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    /// Store-assigned identity.
    pub id: i64,
    /// Display name.
    pub name: String,
    /// Free-form description.
    pub description: Option<String>,
    /// Price in the smallest currency unit. Never negative.
    pub price: i64,
    /// When the product was inserted. Set by the repository.
    pub created_date: DateTime<Utc>,
    /// Edges to categories, when loaded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub categories: Option<Vec<ProductCategory>>,
}

impl Product {
    /// A product ready to insert.
    pub fn new(name: impl Into<String>, description: Option<String>, price: i64) -> Self {
        Self {
            id: 0,
            name: name.into(),
            description,
            price,
            created_date: Utc::now(),
            categories: None,
        }
    }

    /// Attach edges to the given categories.
    pub fn with_categories(mut self, category_ids: impl IntoIterator<Item = i64>) -> Self {
        self.categories = Some(
            category_ids
                .into_iter()
                .map(|category_id| ProductCategory::new(self.id, category_id))
                .collect(),
        );
        self
    }

    /// Sort keys accepted by the product listing.
    pub fn sort_keys() -> AppResult<SortKeyRegistry<ProductField>> {
        SortKeyRegistry::builder(ProductField::Id)
            .key("Id", ProductField::Id)
            .key("Name", ProductField::Name)
            .key("Description", ProductField::Description)
            .key("Price", ProductField::Price)
            .key("CreatedDate", ProductField::CreatedDate)
            .build()
    }
}

/// Columns of `products`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProductField {
    /// `id`
    Id,
    /// `name`
    Name,
    /// `description`
    Description,
    /// `price`
    Price,
    /// `created_date`
    CreatedDate,
}

impl Field for ProductField {
    fn column(&self) -> &'static str {
        match self {
            Self::Id => "id",
            Self::Name => "name",
            Self::Description => "description",
            Self::Price => "price",
            Self::CreatedDate => "created_date",
        }
    }

    fn kind(&self) -> ValueKind {
        match self {
            Self::Id | Self::Price => ValueKind::Integer,
            Self::Name | Self::Description => ValueKind::Text,
            Self::CreatedDate => ValueKind::Timestamp,
        }
    }

    fn nullable(&self) -> bool {
        matches!(self, Self::Description)
    }
}

/// Includable relations of [`Product`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProductRelation {
    /// Edges to the categories of this product.
    Categories,
}

static CATEGORIES: RelationDef = RelationDef {
    name: "categories",
    parent_key: "id",
    foreign_key: "product_id",
    child: TableSchema::of::<ProductCategory>,
    lookups: &[Lookup {
        alias: "category_name",
        via: "category_id",
        table: "categories",
        key: "id",
        column: "name",
        kind: ValueKind::Text,
    }],
};

impl Relation for ProductRelation {
    fn all() -> &'static [Self] {
        &[Self::Categories]
    }

    fn def(&self) -> &'static RelationDef {
        match self {
            Self::Categories => &CATEGORIES,
        }
    }
}

const FIELDS: &[ProductField] = &[
    ProductField::Id,
    ProductField::Name,
    ProductField::Description,
    ProductField::Price,
    ProductField::CreatedDate,
];

impl Entity for Product {
    type Field = ProductField;
    type Relation = ProductRelation;

    const TABLE: &'static str = "products";
    const NAME: &'static str = "Product";

    fn fields() -> &'static [Self::Field] {
        FIELDS
    }

    fn key() -> &'static [Self::Field] {
        &[ProductField::Id]
    }

    fn generated_key() -> Option<Self::Field> {
        Some(ProductField::Id)
    }

    fn created_at() -> Option<Self::Field> {
        Some(ProductField::CreatedDate)
    }

    fn to_record(&self) -> Record {
        Record::new()
            .with("id", self.id)
            .with("name", self.name.as_str())
            .with("description", self.description.clone())
            .with("price", self.price)
            .with("created_date", self.created_date)
    }

    fn from_record(mut record: Record) -> AppResult<Self> {
        Ok(Self {
            id: record.take_i64("id")?,
            name: record.take_text("name")?,
            description: record.take_opt_text("description")?,
            price: record.take_i64("price")?,
            created_date: record.take_timestamp("created_date")?,
            categories: None,
        })
    }

    fn related(&self, relation: Self::Relation) -> Option<Vec<Record>> {
        match relation {
            ProductRelation::Categories => self.categories.as_deref().map(edges_to_rows),
        }
    }

    fn set_related(&mut self, relation: Self::Relation, rows: Vec<Record>) -> AppResult<()> {
        match relation {
            ProductRelation::Categories => self.categories = Some(edges_from_rows(rows)?),
        }
        Ok(())
    }

    fn check(&self) -> AppResult<()> {
        if self.name.trim().is_empty() {
            return Err(AppError::validation("Product name is required"));
        }
        if self.price < 0 {
            return Err(AppError::validation(format!(
                "Product price must not be negative, got {}",
                self.price
            )));
        }
        Ok(())
    }
}
