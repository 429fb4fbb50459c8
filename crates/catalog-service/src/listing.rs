//! Listing request shared by the category and product listings.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use catalog_core::traits::Field;
use catalog_core::types::{Paging, Predicate, Sort, SortKeyRegistry};

/// Filter, sort and paging parameters of a listing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListRequest {
    /// Earliest creation date, inclusive.
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
    /// Latest creation date, inclusive.
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
    /// Substring to look for in the name.
    #[serde(default)]
    pub search: Option<String>,
    /// Sort-key identifier.
    #[serde(default)]
    pub order: Option<String>,
    /// `ascend` sorts ascending, anything else descending.
    #[serde(default)]
    pub sort_dir: Option<String>,
    /// Rows to skip.
    #[serde(default)]
    pub skip: Option<u64>,
    /// Rows to return.
    #[serde(default)]
    pub take: Option<u64>,
}

impl ListRequest {
    /// AND of the date bounds on `created` and the name search on `name`.
    ///
    /// Absent parameters add no clause; a blank search is absent.
    pub fn filter<F: Field>(&self, created: F, name: F) -> Predicate<F> {
        let search = self
            .search
            .as_deref()
            .filter(|s| !s.trim().is_empty());

        Predicate::all([
            self.start_date.map(|d| Predicate::on_or_after(created, d)),
            self.end_date.map(|d| Predicate::on_or_before(created, d)),
            search.map(|s| Predicate::contains(name, s)),
        ])
    }

    /// Sort order resolved through `registry`.
    pub fn sort<F: Field>(&self, registry: &SortKeyRegistry<F>) -> Sort<F> {
        registry.order(self.order.as_deref(), self.sort_dir.as_deref())
    }

    /// Paging window.
    pub fn paging(&self) -> Paging {
        Paging::new(self.skip, self.take)
    }
}
