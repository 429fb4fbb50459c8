//! Product domain entities.

pub mod model;
pub mod projection;

pub use model::{Product, ProductField, ProductRelation};
pub use projection::{CategoryInProduct, ProductGet};
