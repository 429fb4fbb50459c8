//! Shared value, filter, sorting, paging and query types.

pub mod filter;
pub mod pagination;
pub mod query;
pub mod sorting;
pub mod value;

pub use self::filter::{FilterOp, Predicate};
pub use self::pagination::{PagedList, Paging};
pub use self::query::{Condition, OrderBy, RelationFetch, SelectQuery};
pub use self::sorting::{Sort, SortDirection, SortKey, SortKeyRegistry, SortKeyRegistryBuilder};
pub use self::value::{Record, Value, ValueKind};
