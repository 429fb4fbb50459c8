//! # catalog-entity
//!
//! Entity models for the catalog. Every entity implements
//! [`catalog_core::traits::Entity`], describing its table, typed fields,
//! identity, foreign keys and includable relations. Read projections and
//! the sort-key registries used by listing endpoints live next to the
//! entity they read.

pub mod category;
pub mod product;
pub mod product_category;

pub use category::{Category, CategoryField, CategoryGet, CategoryRelation};
pub use product::{CategoryInProduct, Product, ProductField, ProductGet, ProductRelation};
pub use product_category::{ProductCategory, ProductCategoryField};
