//! Product-to-category association.

pub mod model;

pub use model::{ProductCategory, ProductCategoryField};
