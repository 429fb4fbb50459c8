//! Category entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use catalog_core::traits::{Entity, Field, Lookup, Relation, RelationDef, TableSchema};
use catalog_core::types::{Record, SortKeyRegistry, ValueKind};
use catalog_core::{AppError, AppResult};

use crate::product_category::ProductCategory;
use crate::product_category::model::{edges_from_rows, edges_to_rows};

/// A product category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    /// Store-assigned identity.
    pub id: i64,
    /// Display name.
    pub name: String,
    /// When the category was inserted. Set by the repository.
    pub created_date: DateTime<Utc>,
    /// Edges to products, when loaded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub products: Option<Vec<ProductCategory>>,
}

impl Category {
    /// A category ready to insert.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: 0,
            name: name.into(),
            created_date: Utc::now(),
            products: None,
        }
    }

    /// Sort keys accepted by the category listing.
    ///
    /// `CreateDate` is kept as an alias of `CreatedDate` for older clients.
    pub fn sort_keys() -> AppResult<SortKeyRegistry<CategoryField>> {
        SortKeyRegistry::builder(CategoryField::Id)
            .key("Id", CategoryField::Id)
            .key("Name", CategoryField::Name)
            .key("CreatedDate", CategoryField::CreatedDate)
            .key("CreateDate", CategoryField::CreatedDate)
            .build()
    }
}

/// Columns of `categories`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CategoryField {
    /// `id`
    Id,
    /// `name`
    Name,
    /// `created_date`
    CreatedDate,
}

impl Field for CategoryField {
    fn column(&self) -> &'static str {
        match self {
            Self::Id => "id",
            Self::Name => "name",
            Self::CreatedDate => "created_date",
        }
    }

    fn kind(&self) -> ValueKind {
        match self {
            Self::Id => ValueKind::Integer,
            Self::Name => ValueKind::Text,
            Self::CreatedDate => ValueKind::Timestamp,
        }
    }
}

/// Includable relations of [`Category`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CategoryRelation {
    /// Edges to the products in this category.
    Products,
}

static PRODUCTS: RelationDef = RelationDef {
    name: "products",
    parent_key: "id",
    foreign_key: "category_id",
    child: TableSchema::of::<ProductCategory>,
    lookups: &[Lookup {
        alias: "product_name",
        via: "product_id",
        table: "products",
        key: "id",
        column: "name",
        kind: ValueKind::Text,
    }],
};

impl Relation for CategoryRelation {
    fn all() -> &'static [Self] {
        &[Self::Products]
    }

    fn def(&self) -> &'static RelationDef {
        match self {
            Self::Products => &PRODUCTS,
        }
    }
}

const FIELDS: &[CategoryField] = &[
    CategoryField::Id,
    CategoryField::Name,
    CategoryField::CreatedDate,
];

impl Entity for Category {
    type Field = CategoryField;
    type Relation = CategoryRelation;

    const TABLE: &'static str = "categories";
    const NAME: &'static str = "Category";

    fn fields() -> &'static [Self::Field] {
        FIELDS
    }

    fn key() -> &'static [Self::Field] {
        &[CategoryField::Id]
    }

    fn generated_key() -> Option<Self::Field> {
        Some(CategoryField::Id)
    }

    fn created_at() -> Option<Self::Field> {
        Some(CategoryField::CreatedDate)
    }

    fn to_record(&self) -> Record {
        Record::new()
            .with("id", self.id)
            .with("name", self.name.as_str())
            .with("created_date", self.created_date)
    }

    fn from_record(mut record: Record) -> AppResult<Self> {
        Ok(Self {
            id: record.take_i64("id")?,
            name: record.take_text("name")?,
            created_date: record.take_timestamp("created_date")?,
            products: None,
        })
    }

    fn related(&self, relation: Self::Relation) -> Option<Vec<Record>> {
        match relation {
            CategoryRelation::Products => self.products.as_deref().map(edges_to_rows),
        }
    }

    fn set_related(&mut self, relation: Self::Relation, rows: Vec<Record>) -> AppResult<()> {
        match relation {
            CategoryRelation::Products => self.products = Some(edges_from_rows(rows)?),
        }
        Ok(())
    }

    fn check(&self) -> AppResult<()> {
        if self.name.trim().is_empty() {
            return Err(AppError::validation("Category name is required"));
        }
        Ok(())
    }
}
