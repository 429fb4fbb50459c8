//! Entity metadata traits.
//!
//! An [`Entity`] describes one table: its typed fields, identity columns,
//! store-generated key, creation timestamp, foreign keys and includable
//! relations. Repositories and stores work only from this metadata; no
//! entity-specific code lives below the entity crate.

use std::fmt;

use crate::error::AppError;
use crate::result::AppResult;
use crate::types::value::{Record, ValueKind};

/// A typed column of one entity kind, usually a field-less enum.
pub trait Field: Copy + Eq + fmt::Debug + Send + Sync + 'static {
    /// Column name in the store.
    fn column(&self) -> &'static str;

    /// Declared column kind.
    fn kind(&self) -> ValueKind;

    /// Whether the column accepts `NULL`.
    fn nullable(&self) -> bool {
        false
    }
}

/// Untyped column metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnDef {
    /// Column name.
    pub name: &'static str,
    /// Declared kind.
    pub kind: ValueKind,
    /// Whether `NULL` is accepted.
    pub nullable: bool,
}

impl ColumnDef {
    /// A required column.
    pub const fn new(name: &'static str, kind: ValueKind) -> Self {
        Self {
            name,
            kind,
            nullable: false,
        }
    }

    /// A nullable column.
    pub const fn optional(name: &'static str, kind: ValueKind) -> Self {
        Self {
            name,
            kind,
            nullable: true,
        }
    }

    /// Column metadata for a typed field.
    pub fn of<F: Field>(field: F) -> Self {
        Self {
            name: field.column(),
            kind: field.kind(),
            nullable: field.nullable(),
        }
    }
}

/// What happens to referencing rows when the referenced row is deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OnDelete {
    /// Delete the referencing rows too.
    Cascade,
    /// Refuse the delete while referencing rows exist.
    Restrict,
}

/// A single-column foreign key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ForeignKey {
    /// Referencing column.
    pub column: &'static str,
    /// Referenced table.
    pub table: &'static str,
    /// Referenced column.
    pub references: &'static str,
    /// Delete policy.
    pub on_delete: OnDelete,
}

/// A column joined into relation rows from another table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Lookup {
    /// Output name in the relation row.
    pub alias: &'static str,
    /// Child column holding the reference.
    pub via: &'static str,
    /// Referenced table.
    pub table: &'static str,
    /// Referenced key column.
    pub key: &'static str,
    /// Column read from the referenced row.
    pub column: &'static str,
    /// Kind of the read column.
    pub kind: ValueKind,
}

/// A child collection owned by a parent row.
#[derive(Debug)]
pub struct RelationDef {
    /// Relation name, used in logs and errors.
    pub name: &'static str,
    /// Parent column the children point at.
    pub parent_key: &'static str,
    /// Child column pointing at the parent.
    pub foreign_key: &'static str,
    /// Schema of the child table.
    pub child: fn() -> TableSchema,
    /// Columns that projections may join in from other tables.
    pub lookups: &'static [Lookup],
}

impl RelationDef {
    /// Find a lookup by its output name.
    pub fn lookup(&self, alias: &str) -> Option<&'static Lookup> {
        self.lookups.iter().find(|l| l.alias == alias)
    }
}

/// An includable relation of one entity kind.
pub trait Relation: Copy + Eq + fmt::Debug + Send + Sync + 'static {
    /// Every relation of the entity.
    fn all() -> &'static [Self];

    /// Static description of this relation.
    fn def(&self) -> &'static RelationDef;
}

/// Relation type for entities without child collections.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoRelation {}

impl Relation for NoRelation {
    fn all() -> &'static [Self] {
        &[]
    }

    fn def(&self) -> &'static RelationDef {
        match *self {}
    }
}

/// Untyped table metadata handed to stores.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableSchema {
    /// Table name.
    pub name: &'static str,
    /// Every column.
    pub columns: Vec<ColumnDef>,
    /// Identity columns.
    pub key: Vec<&'static str>,
    /// Column whose value the store assigns on insert.
    pub generated_key: Option<&'static str>,
    /// Outgoing foreign keys.
    pub foreign_keys: Vec<ForeignKey>,
}

impl TableSchema {
    /// Build the schema of an entity kind.
    pub fn of<T: Entity>() -> Self {
        Self {
            name: T::TABLE,
            columns: T::fields().iter().map(|f| ColumnDef::of(*f)).collect(),
            key: T::key().iter().map(|f| f.column()).collect(),
            generated_key: T::generated_key().map(|f| f.column()),
            foreign_keys: T::foreign_keys().to_vec(),
        }
    }

    /// Look up a column.
    pub fn column(&self, name: &str) -> Option<&ColumnDef> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Look up a column that must exist.
    pub fn require_column(&self, name: &str) -> AppResult<&ColumnDef> {
        self.column(name).ok_or_else(|| {
            AppError::translation(format!("Table {} has no column '{name}'", self.name))
        })
    }

    /// Column names in declaration order.
    pub fn column_names(&self) -> Vec<&'static str> {
        self.columns.iter().map(|c| c.name).collect()
    }

    /// Whether `name` is one of the identity columns.
    pub fn is_key(&self, name: &str) -> bool {
        self.key.contains(&name)
    }
}

/// A persisted record type.
///
/// Scalar columns travel through [`Entity::to_record`] and
/// [`Entity::from_record`]. Loaded relations are exchanged separately
/// through [`Entity::related`] and [`Entity::set_related`] so that an
/// unloaded relation (`None`) can be told apart from an empty one.
pub trait Entity: Clone + fmt::Debug + Send + Sync + Unpin + 'static {
    /// Typed columns.
    type Field: Field;
    /// Includable relations.
    type Relation: Relation;

    /// Table name.
    const TABLE: &'static str;
    /// Human-readable kind name for messages.
    const NAME: &'static str;

    /// Every column, in declaration order.
    fn fields() -> &'static [Self::Field];

    /// Identity columns.
    fn key() -> &'static [Self::Field];

    /// Identity column assigned by the store on insert.
    fn generated_key() -> Option<Self::Field> {
        None
    }

    /// Column stamped with the insertion time and never changed afterwards.
    fn created_at() -> Option<Self::Field> {
        None
    }

    /// Outgoing foreign keys.
    fn foreign_keys() -> &'static [ForeignKey] {
        &[]
    }

    /// Scalar columns as a record.
    fn to_record(&self) -> Record;

    /// Build from scalar columns. Relations start unloaded.
    fn from_record(record: Record) -> AppResult<Self>;

    /// Rows of a loaded relation, `None` when it is not loaded.
    fn related(&self, _relation: Self::Relation) -> Option<Vec<Record>> {
        None
    }

    /// Replace a relation with loaded rows.
    fn set_related(&mut self, _relation: Self::Relation, _rows: Vec<Record>) -> AppResult<()> {
        Ok(())
    }

    /// Domain checks run before every insert and after every mutation.
    fn check(&self) -> AppResult<()> {
        Ok(())
    }
}
