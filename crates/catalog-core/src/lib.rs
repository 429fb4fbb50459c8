//! # catalog-core
//!
//! Core crate for the catalog backend. Contains the error taxonomy,
//! configuration schemas, the column value model, the predicate combinator,
//! sort-key registry, paging types, and the entity, projection, and store
//! traits that every storage backend implements.
//!
//! This crate has **no** internal dependencies on other catalog crates.

pub mod config;
pub mod error;
pub mod result;
pub mod traits;
pub mod types;

pub use error::{AppError, ErrorKind};
pub use result::AppResult;
