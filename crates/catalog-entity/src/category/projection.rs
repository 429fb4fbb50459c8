//! Read projections of categories.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use catalog_core::AppResult;
use catalog_core::traits::{Projection, Selection};
use catalog_core::types::Record;

use super::model::{Category, CategoryField};

/// Category as returned by listings and lookups.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryGet {
    /// Identity.
    pub id: i64,
    /// Display name.
    pub name: String,
    /// Insertion time.
    pub created_date: DateTime<Utc>,
}

impl Projection<Category> for CategoryGet {
    fn selection() -> Selection<Category> {
        Selection::fields(&[
            CategoryField::Id,
            CategoryField::Name,
            CategoryField::CreatedDate,
        ])
    }

    fn from_row(mut row: Record) -> AppResult<Self> {
        Ok(Self {
            id: row.take_i64("id")?,
            name: row.take_text("name")?,
            created_date: row.take_timestamp("created_date")?,
        })
    }
}
