//! PostgreSQL store.
//!
//! Each [`PgSession`] owns one sqlx transaction started with the configured
//! isolation level. Dropping the session without committing rolls the
//! transaction back.

use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Postgres, QueryBuilder, Transaction};
use tracing::debug;

use catalog_core::config::{AppConfig, IsolationLevel, TextConfig};
use catalog_core::result::AppResult;
use catalog_core::traits::{Session, Store, TableSchema};
use catalog_core::types::{Condition, Record, SelectQuery, Value, ValueKind};

use crate::connection::DatabasePool;
use crate::error::SqlxErrorExt;
use crate::sql::{self, Dialect, SqlBackend, decode_row};

impl SqlBackend for Postgres {
    const DIALECT: Dialect = Dialect::Postgres;

    fn bind_value(
        qb: &mut QueryBuilder<'static, Self>,
        kind: ValueKind,
        value: &Value,
    ) -> AppResult<()> {
        sql::bind_typed(qb, kind, value)
    }

    fn decode_value(row: &PgRow, name: &str, kind: ValueKind) -> AppResult<Value> {
        sql::decode_typed::<Self>(row, name, kind)
    }

    fn decode_json(row: &PgRow, name: &str) -> AppResult<Option<serde_json::Value>> {
        sql::decode_json_typed::<Self>(row, name)
    }
}

/// Store backed by a PostgreSQL pool.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
    text: TextConfig,
    isolation: IsolationLevel,
}

impl PgStore {
    /// Create a store over an existing pool.
    pub fn new(pool: &DatabasePool, text: TextConfig, isolation: IsolationLevel) -> Self {
        Self {
            pool: pool.pool().clone(),
            text,
            isolation,
        }
    }

    /// Create a store using the text and isolation settings of `config`.
    pub fn from_config(pool: &DatabasePool, config: &AppConfig) -> Self {
        Self::new(pool, config.text.clone(), config.database.isolation)
    }

    /// Return the underlying pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl Store for PgStore {
    type Session = PgSession;

    async fn begin(&self) -> AppResult<PgSession> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| e.into_app_error("Failed to begin session"))?;

        sqlx::query(&format!(
            "SET TRANSACTION ISOLATION LEVEL {}",
            self.isolation.as_sql()
        ))
        .execute(&mut *tx)
        .await
        .map_err(|e| e.into_app_error("Failed to set isolation level"))?;

        Ok(PgSession {
            tx,
            text: self.text.clone(),
        })
    }

    async fn health_check(&self) -> AppResult<bool> {
        sqlx::query_scalar::<_, i32>("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .map(|v| v == 1)
            .map_err(|e| e.into_app_error("Health check failed"))
    }
}

/// One PostgreSQL transaction.
pub struct PgSession {
    tx: Transaction<'static, Postgres>,
    text: TextConfig,
}

#[async_trait]
impl Session for PgSession {
    async fn fetch(&mut self, query: &SelectQuery) -> AppResult<Vec<Record>> {
        let mut qb = sql::render_select::<Postgres>(query, &self.text)?;
        debug!(table = query.table, sql = qb.sql(), "Fetching rows");

        let rows = qb
            .build()
            .fetch_all(&mut *self.tx)
            .await
            .map_err(|e| e.into_app_error("Failed to fetch rows"))?;

        rows.iter()
            .map(|row| decode_row::<Postgres>(row, &query.columns, &query.relations))
            .collect()
    }

    async fn count(&mut self, table: &TableSchema, filter: &Condition) -> AppResult<u64> {
        let mut qb = sql::render_count::<Postgres>(table, filter, &self.text)?;
        debug!(table = table.name, sql = qb.sql(), "Counting rows");

        let total: i64 = qb
            .build_query_scalar()
            .fetch_one(&mut *self.tx)
            .await
            .map_err(|e| e.into_app_error("Failed to count rows"))?;
        Ok(total.max(0) as u64)
    }

    async fn insert(&mut self, table: &TableSchema, row: Record) -> AppResult<Record> {
        let mut qb = sql::render_insert::<Postgres>(table, &row, &self.text)?;
        debug!(table = table.name, sql = qb.sql(), "Inserting row");

        let stored = qb
            .build()
            .fetch_one(&mut *self.tx)
            .await
            .map_err(|e| e.into_app_error("Failed to insert row"))?;
        decode_row::<Postgres>(&stored, &table.columns, &[])
    }

    async fn update(
        &mut self,
        table: &TableSchema,
        filter: &Condition,
        changes: &Record,
    ) -> AppResult<u64> {
        let mut qb = sql::render_update::<Postgres>(table, filter, changes, &self.text)?;
        debug!(table = table.name, sql = qb.sql(), "Updating rows");

        let result = qb
            .build()
            .execute(&mut *self.tx)
            .await
            .map_err(|e| e.into_app_error("Failed to update rows"))?;
        Ok(result.rows_affected())
    }

    async fn delete(&mut self, table: &TableSchema, filter: &Condition) -> AppResult<u64> {
        let mut qb = sql::render_delete::<Postgres>(table, filter, &self.text)?;
        debug!(table = table.name, sql = qb.sql(), "Deleting rows");

        let result = qb
            .build()
            .execute(&mut *self.tx)
            .await
            .map_err(|e| e.into_app_error("Failed to delete rows"))?;
        Ok(result.rows_affected())
    }

    async fn commit(self) -> AppResult<()>
    where
        Self: Sized,
    {
        self.tx
            .commit()
            .await
            .map_err(|e| e.into_app_error("Failed to commit session"))?;
        debug!("Session committed");
        Ok(())
    }

    async fn rollback(self) -> AppResult<()>
    where
        Self: Sized,
    {
        self.tx
            .rollback()
            .await
            .map_err(|e| e.into_app_error("Failed to roll back session"))
    }
}
