//! Storage backend traits.

use async_trait::async_trait;

use crate::result::AppResult;
use crate::traits::entity::TableSchema;
use crate::types::query::{Condition, SelectQuery};
use crate::types::value::Record;

/// A storage backend that hands out sessions.
///
/// Implementations are shared across requests; sessions are not.
#[async_trait]
pub trait Store: Send + Sync + 'static {
    /// One unit of work against this store.
    type Session: Session;

    /// Start a session. Every statement run through it belongs to one
    /// transaction.
    async fn begin(&self) -> AppResult<Self::Session>;

    /// Check that the store is reachable.
    async fn health_check(&self) -> AppResult<bool>;
}

/// One transaction against a store.
///
/// A session must be ended with [`Session::commit`] to keep its writes.
/// Dropping it on any other path (error, panic, cancelled future) rolls
/// every statement back.
#[async_trait]
pub trait Session: Send {
    /// Run a read query and return one record per selected row.
    async fn fetch(&mut self, query: &SelectQuery) -> AppResult<Vec<Record>>;

    /// Count rows of `table` matching `filter`.
    async fn count(&mut self, table: &TableSchema, filter: &Condition) -> AppResult<u64>;

    /// Insert one row and return it as stored, generated key included.
    async fn insert(&mut self, table: &TableSchema, row: Record) -> AppResult<Record>;

    /// Set `changes` on every row matching `filter`. Returns the number of
    /// rows affected.
    async fn update(
        &mut self,
        table: &TableSchema,
        filter: &Condition,
        changes: &Record,
    ) -> AppResult<u64>;

    /// Delete every row matching `filter`, cascading as the foreign keys
    /// require. Returns the number of rows of `table` removed.
    async fn delete(&mut self, table: &TableSchema, filter: &Condition) -> AppResult<u64>;

    /// Make every write of this session durable.
    async fn commit(self) -> AppResult<()>
    where
        Self: Sized;

    /// Discard every write of this session.
    async fn rollback(self) -> AppResult<()>
    where
        Self: Sized;
}
