//! Category domain entities.

pub mod model;
pub mod projection;

pub use model::{Category, CategoryField, CategoryRelation};
pub use projection::CategoryGet;
