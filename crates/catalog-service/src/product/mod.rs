//! Product use cases.

pub mod service;

pub use service::{CreateProductRequest, ProductService, UpdateProductRequest};
