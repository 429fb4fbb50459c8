//! SQL rendering and row decoding shared by the sqlx-backed stores.
//!
//! Statements are written once against [`SqlBackend`]; the few places where
//! PostgreSQL and SQLite disagree branch on [`Dialect`].

mod decode;
mod render;
pub mod text;

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{ColumnIndex, Database, Decode, Encode, QueryBuilder, Row, Type};

use catalog_core::error::AppError;
use catalog_core::result::AppResult;
use catalog_core::types::{Value, ValueKind};

use crate::error::SqlxErrorExt;

pub(crate) use self::decode::decode_row;
pub(crate) use self::render::{render_count, render_delete, render_insert, render_select, render_update};
pub use self::render::{escape_like, is_valid_identifier, quote_identifier};

/// SQL flavour a statement is written in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    /// PostgreSQL: `ILIKE`, `jsonb` aggregation and row locks.
    Postgres,
    /// SQLite: `GLOB` search, JSON1 aggregation and no row locks.
    Sqlite,
}

/// A sqlx database the catalog stores can run on.
pub trait SqlBackend: Database {
    /// Dialect used when rendering statements.
    const DIALECT: Dialect;

    /// Bind `value` as a parameter typed after the column `kind`.
    fn bind_value(
        qb: &mut QueryBuilder<'static, Self>,
        kind: ValueKind,
        value: &Value,
    ) -> AppResult<()>;

    /// Decode column `name` of `row` as `kind`.
    fn decode_value(row: &Self::Row, name: &str, kind: ValueKind) -> AppResult<Value>;

    /// Decode the JSON array a relation sub-select produced.
    fn decode_json(row: &Self::Row, name: &str) -> AppResult<Option<serde_json::Value>>;
}

/// Typed binding shared by every backend.
pub(crate) fn bind_typed<DB>(
    qb: &mut QueryBuilder<'static, DB>,
    kind: ValueKind,
    value: &Value,
) -> AppResult<()>
where
    DB: Database,
    i64: Encode<'static, DB> + Type<DB>,
    String: Encode<'static, DB> + Type<DB>,
    DateTime<Utc>: Encode<'static, DB> + Type<DB>,
    NaiveDate: Encode<'static, DB> + Type<DB>,
    Option<i64>: Encode<'static, DB> + Type<DB>,
    Option<String>: Encode<'static, DB> + Type<DB>,
    Option<DateTime<Utc>>: Encode<'static, DB> + Type<DB>,
    Option<NaiveDate>: Encode<'static, DB> + Type<DB>,
{
    match (kind, value) {
        (ValueKind::Integer, Value::Integer(v)) => {
            qb.push_bind(*v);
        }
        (ValueKind::Text, Value::Text(v)) => {
            qb.push_bind(v.clone());
        }
        (ValueKind::Timestamp, Value::Timestamp(v)) => {
            qb.push_bind(*v);
        }
        (ValueKind::Date, Value::Date(v)) => {
            qb.push_bind(*v);
        }
        (ValueKind::Integer, Value::Null) => {
            qb.push_bind(None::<i64>);
        }
        (ValueKind::Text, Value::Null) => {
            qb.push_bind(None::<String>);
        }
        (ValueKind::Timestamp, Value::Null) => {
            qb.push_bind(None::<DateTime<Utc>>);
        }
        (ValueKind::Date, Value::Null) => {
            qb.push_bind(None::<NaiveDate>);
        }
        (kind, other) => {
            return Err(AppError::translation(format!(
                "Cannot bind {} value to {kind} column",
                other.type_name()
            )));
        }
    }
    Ok(())
}

/// Typed column decoding shared by every backend.
pub(crate) fn decode_typed<DB>(row: &DB::Row, name: &str, kind: ValueKind) -> AppResult<Value>
where
    DB: Database,
    for<'n> &'n str: ColumnIndex<DB::Row>,
    for<'r> i64: Decode<'r, DB> + Type<DB>,
    for<'r> String: Decode<'r, DB> + Type<DB>,
    for<'r> DateTime<Utc>: Decode<'r, DB> + Type<DB>,
    for<'r> NaiveDate: Decode<'r, DB> + Type<DB>,
{
    let context = "Failed to decode column";
    let value: Value = match kind {
        ValueKind::Integer => row
            .try_get::<Option<i64>, _>(name)
            .map_err(|e| e.into_app_error(context))?
            .into(),
        ValueKind::Text => row
            .try_get::<Option<String>, _>(name)
            .map_err(|e| e.into_app_error(context))?
            .into(),
        ValueKind::Timestamp => row
            .try_get::<Option<DateTime<Utc>>, _>(name)
            .map_err(|e| e.into_app_error(context))?
            .into(),
        ValueKind::Date => row
            .try_get::<Option<NaiveDate>, _>(name)
            .map_err(|e| e.into_app_error(context))?
            .into(),
    };
    Ok(value)
}

/// JSON column decoding shared by every backend.
pub(crate) fn decode_json_typed<DB>(row: &DB::Row, name: &str) -> AppResult<Option<serde_json::Value>>
where
    DB: Database,
    for<'n> &'n str: ColumnIndex<DB::Row>,
    for<'r> serde_json::Value: Decode<'r, DB> + Type<DB>,
{
    row.try_get::<Option<serde_json::Value>, _>(name)
        .map_err(|e| e.into_app_error("Failed to decode relation"))
}
