//! Traits implemented by entities, projections and storage backends.

pub mod entity;
pub mod projection;
pub mod store;

pub use self::entity::{
    ColumnDef, Entity, Field, ForeignKey, Lookup, NoRelation, OnDelete, Relation, RelationDef,
    TableSchema,
};
pub use self::projection::{Projection, RelationSelection, Selection};
pub use self::store::{Session, Store};
