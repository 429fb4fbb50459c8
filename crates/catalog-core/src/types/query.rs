//! Store-neutral query model.
//!
//! Repositories lower typed predicates and sorts into these structures;
//! stores translate them into their own query language.

use chrono::NaiveDate;

use crate::error::AppError;
use crate::result::AppResult;
use crate::traits::entity::{ColumnDef, RelationDef, TableSchema};
use crate::types::filter::FilterOp;
use crate::types::pagination::Paging;
use crate::types::sorting::SortDirection;
use crate::types::value::{Record, Value, ValueKind};

/// A lowered boolean condition over column names.
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    /// Matches every row.
    True,
    /// Matches no row.
    False,
    /// `column <op> value`
    Compare {
        /// Column name.
        column: &'static str,
        /// Declared column kind.
        kind: ValueKind,
        /// Operator.
        op: FilterOp,
        /// Bound value.
        value: Value,
    },
    /// `date(column) <op> date`, evaluated in UTC.
    OnDate {
        /// Column name.
        column: &'static str,
        /// Declared column kind (timestamp or date).
        kind: ValueKind,
        /// Operator.
        op: FilterOp,
        /// Bound date.
        date: NaiveDate,
    },
    /// Literal substring match.
    Contains {
        /// Column name.
        column: &'static str,
        /// Substring.
        needle: String,
    },
    /// `column IN (values...)`, never empty.
    In {
        /// Column name.
        column: &'static str,
        /// Declared column kind.
        kind: ValueKind,
        /// Accepted values.
        values: Vec<Value>,
    },
    /// `column IS NULL`
    IsNull {
        /// Column name.
        column: &'static str,
    },
    /// Conjunction. Empty means true.
    And(Vec<Condition>),
    /// Disjunction. Empty means false.
    Or(Vec<Condition>),
    /// Negation.
    Not(Box<Condition>),
}

impl Condition {
    /// `column = value` for a column of the given schema.
    pub fn column_eq(schema: &TableSchema, column: &'static str, value: Value) -> AppResult<Self> {
        let def = schema.require_column(column)?;
        Ok(Self::Compare {
            column: def.name,
            kind: def.kind,
            op: FilterOp::Eq,
            value,
        })
    }

    /// Match exactly the row whose key columns equal those of `record`.
    pub fn key_of(schema: &TableSchema, record: &Record) -> AppResult<Self> {
        let mut parts = Vec::with_capacity(schema.key.len());
        for column in &schema.key {
            let value = record.value(column).clone();
            if value.is_null() {
                return Err(AppError::validation(format!(
                    "Key column '{column}' of {} is null",
                    schema.name
                )));
            }
            parts.push(Self::column_eq(schema, column, value)?);
        }
        Ok(match parts.len() {
            1 => parts.remove(0),
            _ => Self::And(parts),
        })
    }
}

/// A lowered ordering instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderBy {
    /// Column name.
    pub column: &'static str,
    /// Declared column kind; text columns sort with the configured collation.
    pub kind: ValueKind,
    /// Direction.
    pub direction: SortDirection,
}

/// A related collection to materialize alongside each selected row.
#[derive(Debug, Clone)]
pub struct RelationFetch {
    /// The relation.
    pub def: &'static RelationDef,
    /// Output column holding the rows as [`Value::List`].
    pub alias: &'static str,
    /// Child or lookup columns to include in each related row.
    pub columns: Vec<&'static str>,
}

/// A lowered read query against one table.
#[derive(Debug, Clone)]
pub struct SelectQuery {
    /// Table name.
    pub table: &'static str,
    /// Selected columns.
    pub columns: Vec<ColumnDef>,
    /// Related collections to materialize.
    pub relations: Vec<RelationFetch>,
    /// Row filter.
    pub filter: Condition,
    /// Ordering, highest precedence first.
    pub order: Vec<OrderBy>,
    /// Offset window.
    pub paging: Paging,
    /// Lock the selected rows until the session ends.
    pub lock: bool,
}

impl SelectQuery {
    /// Select `columns` from `table` with no filter.
    pub fn new(table: &'static str, columns: Vec<ColumnDef>) -> Self {
        Self {
            table,
            columns,
            relations: Vec::new(),
            filter: Condition::True,
            order: Vec::new(),
            paging: Paging::unbounded(),
            lock: false,
        }
    }

    /// Select every column of a table.
    pub fn all_columns(schema: &TableSchema) -> Self {
        Self::new(schema.name, schema.columns.clone())
    }

    /// Set the filter.
    pub fn filter(mut self, filter: Condition) -> Self {
        self.filter = filter;
        self
    }

    /// Set the ordering.
    pub fn order(mut self, order: Vec<OrderBy>) -> Self {
        self.order = order;
        self
    }

    /// Set the offset window.
    pub fn paging(mut self, paging: Paging) -> Self {
        self.paging = paging;
        self
    }

    /// Materialize a related collection.
    pub fn relation(mut self, fetch: RelationFetch) -> Self {
        self.relations.push(fetch);
        self
    }

    /// Lock selected rows for the rest of the session.
    pub fn for_update(mut self) -> Self {
        self.lock = true;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::entity::ForeignKey;

    fn edges() -> TableSchema {
        TableSchema {
            name: "product_categories",
            columns: vec![
                ColumnDef::new("product_id", ValueKind::Integer),
                ColumnDef::new("category_id", ValueKind::Integer),
            ],
            key: vec!["product_id", "category_id"],
            generated_key: None,
            foreign_keys: Vec::<ForeignKey>::new(),
        }
    }

    #[test]
    fn test_key_of_composite_key() {
        let record = Record::new().with("product_id", 1_i64).with("category_id", 2_i64);
        let condition = Condition::key_of(&edges(), &record).expect("key");
        match condition {
            Condition::And(parts) => assert_eq!(parts.len(), 2),
            other => panic!("expected conjunction, got {other:?}"),
        }
    }

    #[test]
    fn test_key_of_rejects_null_key() {
        let record = Record::new().with("product_id", 1_i64);
        let err = Condition::key_of(&edges(), &record).unwrap_err();
        assert_eq!(err.kind, crate::ErrorKind::Validation);
    }

    #[test]
    fn test_column_eq_unknown_column() {
        let err = Condition::column_eq(&edges(), "price", Value::Integer(1)).unwrap_err();
        assert_eq!(err.kind, crate::ErrorKind::Translation);
    }
}
