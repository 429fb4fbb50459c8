//! Result shapes selected at the store.
//!
//! A [`Projection`] names the columns and related collections it needs and
//! is built from the rows the store returns. Unselected columns and
//! unrelated rows are never materialized.

use crate::error::AppError;
use crate::result::AppResult;
use crate::traits::entity::{ColumnDef, Entity, Relation, TableSchema};
use crate::types::query::RelationFetch;
use crate::types::value::Record;

/// A related collection requested by a projection.
#[derive(Debug, Clone)]
pub struct RelationSelection<R> {
    /// The relation.
    pub relation: R,
    /// Output column name.
    pub alias: &'static str,
    /// Child or lookup columns per related row.
    pub columns: Vec<&'static str>,
}

/// What a projection reads from entity `T`.
#[derive(Debug, Clone)]
pub struct Selection<T: Entity> {
    /// Scalar fields.
    pub fields: Vec<T::Field>,
    /// Related collections.
    pub relations: Vec<RelationSelection<T::Relation>>,
}

impl<T: Entity> Selection<T> {
    /// Select the given fields.
    pub fn fields(fields: &[T::Field]) -> Self {
        Self {
            fields: fields.to_vec(),
            relations: Vec::new(),
        }
    }

    /// Select every field and no relation.
    pub fn all() -> Self {
        Self::fields(T::fields())
    }

    /// Also select a related collection under `alias`.
    pub fn relation(
        mut self,
        relation: T::Relation,
        alias: &'static str,
        columns: &[&'static str],
    ) -> Self {
        self.relations.push(RelationSelection {
            relation,
            alias,
            columns: columns.to_vec(),
        });
        self
    }

    /// Lower into selected columns and relation fetches, checking that every
    /// relation column exists on the child table or as a lookup.
    pub fn lower(&self) -> AppResult<(Vec<ColumnDef>, Vec<RelationFetch>)> {
        if self.fields.is_empty() && self.relations.is_empty() {
            return Err(AppError::translation(format!(
                "Empty selection over {}",
                T::TABLE
            )));
        }

        let columns = self.fields.iter().map(|f| ColumnDef::of(*f)).collect();
        let mut fetches = Vec::with_capacity(self.relations.len());
        for selection in &self.relations {
            let def = selection.relation.def();
            let child: TableSchema = (def.child)();
            for column in &selection.columns {
                if child.column(column).is_none() && def.lookup(column).is_none() {
                    return Err(AppError::translation(format!(
                        "Relation '{}' of {} has no column '{column}'",
                        def.name,
                        T::TABLE
                    )));
                }
            }
            fetches.push(RelationFetch {
                def,
                alias: selection.alias,
                columns: selection.columns.clone(),
            });
        }
        Ok((columns, fetches))
    }
}

/// A result shape built from rows of entity `T`.
pub trait Projection<T: Entity>: Sized + Send {
    /// Columns and relations to read.
    fn selection() -> Selection<T>;

    /// Build one result from a row shaped by [`Projection::selection`].
    fn from_row(row: Record) -> AppResult<Self>;
}

impl<T: Entity> Projection<T> for T {
    fn selection() -> Selection<T> {
        Selection::all()
    }

    fn from_row(row: Record) -> AppResult<Self> {
        T::from_record(row)
    }
}

