//! Association entity between products and categories.

use serde::{Deserialize, Serialize};

use catalog_core::AppResult;
use catalog_core::traits::{Entity, Field, ForeignKey, NoRelation, OnDelete};
use catalog_core::types::{Record, ValueKind};

/// One many-to-many edge. The pair is the identity; there is no surrogate
/// key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProductCategory {
    /// Product side of the edge.
    pub product_id: i64,
    /// Category side of the edge.
    pub category_id: i64,
}

impl ProductCategory {
    /// Create an edge.
    pub fn new(product_id: i64, category_id: i64) -> Self {
        Self {
            product_id,
            category_id,
        }
    }

    /// An edge to `category_id` whose product side is filled in on save.
    pub fn to_category(category_id: i64) -> Self {
        Self::new(0, category_id)
    }
}

/// Columns of `product_categories`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProductCategoryField {
    /// `product_id`
    ProductId,
    /// `category_id`
    CategoryId,
}

impl Field for ProductCategoryField {
    fn column(&self) -> &'static str {
        match self {
            Self::ProductId => "product_id",
            Self::CategoryId => "category_id",
        }
    }

    fn kind(&self) -> ValueKind {
        ValueKind::Integer
    }
}

const FIELDS: &[ProductCategoryField] = &[
    ProductCategoryField::ProductId,
    ProductCategoryField::CategoryId,
];

const FOREIGN_KEYS: &[ForeignKey] = &[
    ForeignKey {
        column: "product_id",
        table: "products",
        references: "id",
        on_delete: OnDelete::Cascade,
    },
    ForeignKey {
        column: "category_id",
        table: "categories",
        references: "id",
        on_delete: OnDelete::Cascade,
    },
];

impl Entity for ProductCategory {
    type Field = ProductCategoryField;
    type Relation = NoRelation;

    const TABLE: &'static str = "product_categories";
    const NAME: &'static str = "ProductCategory";

    fn fields() -> &'static [Self::Field] {
        FIELDS
    }

    fn key() -> &'static [Self::Field] {
        FIELDS
    }

    fn foreign_keys() -> &'static [ForeignKey] {
        FOREIGN_KEYS
    }

    fn to_record(&self) -> Record {
        Record::new()
            .with("product_id", self.product_id)
            .with("category_id", self.category_id)
    }

    fn from_record(mut record: Record) -> AppResult<Self> {
        Ok(Self {
            product_id: record.take_i64("product_id")?,
            category_id: record.take_i64("category_id")?,
        })
    }
}

/// Convert loaded relation rows into edges.
pub(crate) fn edges_from_rows(rows: Vec<Record>) -> AppResult<Vec<ProductCategory>> {
    rows.into_iter().map(ProductCategory::from_record).collect()
}

/// Convert edges into relation rows.
pub(crate) fn edges_to_rows(edges: &[ProductCategory]) -> Vec<Record> {
    edges.iter().map(Entity::to_record).collect()
}
