//! SQLite store.
//!
//! Runs the same statements as the PostgreSQL store through the SQLite
//! dialect. The configured collation name is registered on every connection
//! with a locale-aware comparison, so `COLLATE` clauses resolve to it.

use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow};
use sqlx::{QueryBuilder, Sqlite, SqlitePool, Transaction};
use tracing::{debug, info};

use catalog_core::config::TextConfig;
use catalog_core::result::AppResult;
use catalog_core::traits::{Session, Store, TableSchema};
use catalog_core::types::{Condition, Record, SelectQuery, Value, ValueKind};

use crate::error::SqlxErrorExt;
use crate::migration::run_sqlite_migrations;
use crate::sql::{self, Dialect, SqlBackend, decode_row, text};

impl SqlBackend for Sqlite {
    const DIALECT: Dialect = Dialect::Sqlite;

    fn bind_value(
        qb: &mut QueryBuilder<'static, Self>,
        kind: ValueKind,
        value: &Value,
    ) -> AppResult<()> {
        sql::bind_typed(qb, kind, value)
    }

    fn decode_value(row: &SqliteRow, name: &str, kind: ValueKind) -> AppResult<Value> {
        sql::decode_typed::<Self>(row, name, kind)
    }

    fn decode_json(row: &SqliteRow, name: &str) -> AppResult<Option<serde_json::Value>> {
        sql::decode_json_typed::<Self>(row, name)
    }
}

/// Store backed by a SQLite pool.
#[derive(Debug, Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
    text: TextConfig,
}

impl SqliteStore {
    /// Open the database at `url` (for example `sqlite://catalog.db?mode=rwc`).
    pub async fn connect(url: &str, max_connections: u32, text: TextConfig) -> AppResult<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(Self::options(url, &text)?)
            .await
            .map_err(|e| e.into_app_error("Failed to open SQLite database"))?;

        info!(url, "Opened SQLite database");
        Ok(Self { pool, text })
    }

    /// A private in-memory database with the catalog schema applied.
    ///
    /// The pool holds a single connection that never expires, since the
    /// database lives exactly as long as that connection. Sessions therefore
    /// run one at a time.
    pub async fn in_memory(text: TextConfig) -> AppResult<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None::<Duration>)
            .max_lifetime(None::<Duration>)
            .connect_with(Self::options("sqlite::memory:", &text)?)
            .await
            .map_err(|e| e.into_app_error("Failed to open in-memory database"))?;

        run_sqlite_migrations(&pool).await?;
        Ok(Self { pool, text })
    }

    fn options(url: &str, text: &TextConfig) -> AppResult<SqliteConnectOptions> {
        let mut options = SqliteConnectOptions::from_str(url)
            .map_err(|e| e.into_app_error("Invalid SQLite URL"))?
            .foreign_keys(true);
        if let Some(name) = text.collation() {
            let turkish = text.is_turkish();
            options = options.collation(name.to_string(), move |a: &str, b: &str| {
                text::collate(a, b, turkish)
            });
        }
        Ok(options)
    }

    /// Return the underlying pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[async_trait]
impl Store for SqliteStore {
    type Session = SqliteSession;

    async fn begin(&self) -> AppResult<SqliteSession> {
        let tx = self
            .pool
            .begin()
            .await
            .map_err(|e| e.into_app_error("Failed to begin session"))?;
        Ok(SqliteSession {
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

/// One SQLite transaction.
pub struct SqliteSession {
    tx: Transaction<'static, Sqlite>,
    text: TextConfig,
}

#[async_trait]
impl Session for SqliteSession {
    async fn fetch(&mut self, query: &SelectQuery) -> AppResult<Vec<Record>> {
        let mut qb = sql::render_select::<Sqlite>(query, &self.text)?;
        debug!(table = query.table, sql = qb.sql(), "Fetching rows");

        let rows = qb
            .build()
            .fetch_all(&mut *self.tx)
            .await
            .map_err(|e| e.into_app_error("Failed to fetch rows"))?;

        rows.iter()
            .map(|row| decode_row::<Sqlite>(row, &query.columns, &query.relations))
            .collect()
    }

    async fn count(&mut self, table: &TableSchema, filter: &Condition) -> AppResult<u64> {
        let mut qb = sql::render_count::<Sqlite>(table, filter, &self.text)?;
        debug!(table = table.name, sql = qb.sql(), "Counting rows");

        let total: i64 = qb
            .build_query_scalar()
            .fetch_one(&mut *self.tx)
            .await
            .map_err(|e| e.into_app_error("Failed to count rows"))?;
        Ok(total.max(0) as u64)
    }

    async fn insert(&mut self, table: &TableSchema, row: Record) -> AppResult<Record> {
        let mut qb = sql::render_insert::<Sqlite>(table, &row, &self.text)?;
        debug!(table = table.name, sql = qb.sql(), "Inserting row");

        let stored = qb
            .build()
            .fetch_one(&mut *self.tx)
            .await
            .map_err(|e| e.into_app_error("Failed to insert row"))?;
        decode_row::<Sqlite>(&stored, &table.columns, &[])
    }

    async fn update(
        &mut self,
        table: &TableSchema,
        filter: &Condition,
        changes: &Record,
    ) -> AppResult<u64> {
        let mut qb = sql::render_update::<Sqlite>(table, filter, changes, &self.text)?;
        debug!(table = table.name, sql = qb.sql(), "Updating rows");

        let result = qb
            .build()
            .execute(&mut *self.tx)
            .await
            .map_err(|e| e.into_app_error("Failed to update rows"))?;
        Ok(result.rows_affected())
    }

    async fn delete(&mut self, table: &TableSchema, filter: &Condition) -> AppResult<u64> {
        let mut qb = sql::render_delete::<Sqlite>(table, filter, &self.text)?;
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
