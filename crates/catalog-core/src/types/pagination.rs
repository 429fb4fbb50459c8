//! Paging types for list operations.

use serde::{Deserialize, Serialize};

/// Offset window for a listing. `None` means "no limit" for that side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Paging {
    /// Number of matching rows to skip.
    #[serde(default)]
    pub skip: Option<u64>,
    /// Maximum number of rows to return.
    #[serde(default)]
    pub take: Option<u64>,
}

impl Paging {
    /// Create a paging window.
    pub fn new(skip: Option<u64>, take: Option<u64>) -> Self {
        Self { skip, take }
    }

    /// Every matching row.
    pub fn unbounded() -> Self {
        Self::default()
    }

    /// The first `take` rows.
    pub fn first(take: u64) -> Self {
        Self::new(None, Some(take))
    }

    /// Page number `page` (1-based) of size `page_size`.
    pub fn page(page: u64, page_size: u64) -> Self {
        Self::new(
            Some(page.saturating_sub(1).saturating_mul(page_size)),
            Some(page_size),
        )
    }

    /// Whether a window over `total` rows is certainly empty.
    pub fn is_empty_for(&self, total: u64) -> bool {
        self.take == Some(0) || self.skip.unwrap_or(0) >= total
    }
}

/// One page of a listing plus the count of all matching rows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PagedList<T> {
    /// Rows on this page, in order.
    pub data: Vec<T>,
    /// Number of rows matching the filter, ignoring skip and take.
    pub total: u64,
}

impl<T> PagedList<T> {
    /// Create a paged list.
    pub fn new(data: Vec<T>, total: u64) -> Self {
        Self { data, total }
    }

    /// A page with no rows.
    pub fn empty(total: u64) -> Self {
        Self::new(Vec::new(), total)
    }

    /// Transform every row, keeping the total.
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> PagedList<U> {
        PagedList {
            data: self.data.into_iter().map(f).collect(),
            total: self.total,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_to_window() {
        assert_eq!(Paging::page(1, 20), Paging::new(Some(0), Some(20)));
        assert_eq!(Paging::page(3, 20), Paging::new(Some(40), Some(20)));
        assert_eq!(Paging::page(0, 20), Paging::new(Some(0), Some(20)));
    }

    #[test]
    fn test_is_empty_for() {
        assert!(Paging::new(Some(5), Some(10)).is_empty_for(5));
        assert!(Paging::first(0).is_empty_for(100));
        assert!(!Paging::new(Some(4), None).is_empty_for(5));
        assert!(Paging::unbounded().is_empty_for(0));
    }
}
