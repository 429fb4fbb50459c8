//! # catalog-service
//!
//! Catalog use cases built on the generic repository. Services assemble
//! filters, sort orders and paging from request parameters, open one store
//! session per call and commit only when every step of the call succeeded.
//!
//! Services follow constructor injection: the store is provided at
//! construction time as an `Arc`.

pub mod category;
pub mod listing;
pub mod product;

pub use category::{CategoryService, CreateCategoryRequest, UpdateCategoryRequest};
pub use listing::ListRequest;
pub use product::{CreateProductRequest, ProductService, UpdateProductRequest};
