//! Sorting types and the sort-key registry.

use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::result::AppResult;
use crate::traits::entity::Field;
use crate::types::query::OrderBy;

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    /// Ascending order.
    #[default]
    Asc,
    /// Descending order.
    Desc,
}

impl SortDirection {
    /// Return the SQL keyword for this direction.
    pub fn as_sql(&self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }

    /// Interpret a client-supplied direction.
    ///
    /// `ascend`, `asc`, and `ascending` (any case) mean ascending. Anything
    /// else, including no value, means descending.
    pub fn from_request(value: Option<&str>) -> Self {
        match value.map(str::trim) {
            Some(v)
                if v.eq_ignore_ascii_case("ascend")
                    || v.eq_ignore_ascii_case("asc")
                    || v.eq_ignore_ascii_case("ascending") =>
            {
                Self::Asc
            }
            _ => Self::Desc,
        }
    }
}

/// One ordering key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortKey<F> {
    /// Field to sort by.
    pub field: F,
    /// Sort direction.
    pub direction: SortDirection,
}

/// An ordered list of sort keys. Earlier keys take precedence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sort<F> {
    keys: Vec<SortKey<F>>,
}

impl<F: Field> Sort<F> {
    /// No explicit ordering.
    pub fn unsorted() -> Self {
        Self { keys: Vec::new() }
    }

    /// Sort by a single field.
    pub fn by(field: F, direction: SortDirection) -> Self {
        Self::unsorted().then_by(field, direction)
    }

    /// Ascending sort on the given field.
    pub fn asc(field: F) -> Self {
        Self::by(field, SortDirection::Asc)
    }

    /// Descending sort on the given field.
    pub fn desc(field: F) -> Self {
        Self::by(field, SortDirection::Desc)
    }

    /// Append a lower-precedence key.
    pub fn then_by(mut self, field: F, direction: SortDirection) -> Self {
        self.keys.push(SortKey { field, direction });
        self
    }

    /// The keys in precedence order.
    pub fn keys(&self) -> &[SortKey<F>] {
        &self.keys
    }

    /// Whether `field` is already one of the keys.
    pub fn contains(&self, field: F) -> bool {
        self.keys.iter().any(|k| k.field == field)
    }

    /// Lower into store-neutral ordering instructions.
    pub fn lower(&self) -> Vec<OrderBy> {
        self.keys
            .iter()
            .map(|k| OrderBy {
                column: k.field.column(),
                kind: k.field.kind(),
                direction: k.direction,
            })
            .collect()
    }
}

impl<F: Field> Default for Sort<F> {
    fn default() -> Self {
        Self::unsorted()
    }
}

/// Maps client-facing sort-key identifiers to typed fields.
///
/// Built once at startup through [`SortKeyRegistry::builder`], which
/// rejects empty and duplicate identifiers. Unknown or absent identifiers
/// resolve to the fallback field (normally the identity).
#[derive(Debug, Clone)]
pub struct SortKeyRegistry<F> {
    entries: Vec<(&'static str, F)>,
    fallback: F,
}

impl<F: Field> SortKeyRegistry<F> {
    /// Start a registry whose unknown keys resolve to `fallback`.
    pub fn builder(fallback: F) -> SortKeyRegistryBuilder<F> {
        SortKeyRegistryBuilder {
            entries: Vec::new(),
            fallback,
        }
    }

    /// Resolve an identifier. Matching is exact.
    pub fn resolve(&self, key: Option<&str>) -> F {
        key.and_then(|k| {
            self.entries
                .iter()
                .find(|(name, _)| *name == k)
                .map(|(_, field)| *field)
        })
        .unwrap_or(self.fallback)
    }

    /// Resolve a key and a client direction into a [`Sort`].
    pub fn order(&self, key: Option<&str>, direction: Option<&str>) -> Sort<F> {
        Sort::by(self.resolve(key), SortDirection::from_request(direction))
    }

    /// Registered identifiers in registration order.
    pub fn keys(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.entries.iter().map(|(name, _)| *name)
    }

    /// The field unknown identifiers resolve to.
    pub fn fallback(&self) -> F {
        self.fallback
    }
}

/// Builder for [`SortKeyRegistry`].
#[derive(Debug)]
pub struct SortKeyRegistryBuilder<F> {
    entries: Vec<(&'static str, F)>,
    fallback: F,
}

impl<F: Field> SortKeyRegistryBuilder<F> {
    /// Register an identifier for a field.
    pub fn key(mut self, name: &'static str, field: F) -> Self {
        self.entries.push((name, field));
        self
    }

    /// Validate and build the registry.
    pub fn build(self) -> AppResult<SortKeyRegistry<F>> {
        for (idx, (name, _)) in self.entries.iter().enumerate() {
            if name.trim().is_empty() {
                return Err(AppError::configuration("Sort key identifier is empty"));
            }
            if self.entries[..idx].iter().any(|(other, _)| other == name) {
                return Err(AppError::configuration(format!(
                    "Sort key '{name}' registered twice"
                )));
            }
        }
        Ok(SortKeyRegistry {
            entries: self.entries,
            fallback: self.fallback,
        })
    }
}
