//! Decoding of result rows into records.

use chrono::{DateTime, NaiveDate, Utc};

use catalog_core::error::AppError;
use catalog_core::result::AppResult;
use catalog_core::traits::ColumnDef;
use catalog_core::types::{Record, RelationFetch, Value, ValueKind};

use super::SqlBackend;

/// Decode the selected columns and relation arrays of one row.
pub(crate) fn decode_row<DB: SqlBackend>(
    row: &DB::Row,
    columns: &[ColumnDef],
    relations: &[RelationFetch],
) -> AppResult<Record> {
    let mut record = Record::new();
    for column in columns {
        record.insert(column.name, DB::decode_value(row, column.name, column.kind)?);
    }
    for fetch in relations {
        let rows = match DB::decode_json(row, fetch.alias)? {
            Some(json) => decode_relation(fetch, json)?,
            None => Vec::new(),
        };
        record.insert(fetch.alias, Value::List(rows));
    }
    Ok(record)
}

/// Decode the JSON array produced by a relation sub-select.
pub(crate) fn decode_relation(
    fetch: &RelationFetch,
    json: serde_json::Value,
) -> AppResult<Vec<Record>> {
    let child = (fetch.def.child)();
    let serde_json::Value::Array(items) = json else {
        return Err(AppError::translation(format!(
            "Relation '{}' did not decode to an array",
            fetch.def.name
        )));
    };

    let mut rows = Vec::with_capacity(items.len());
    for item in items {
        let serde_json::Value::Object(mut object) = item else {
            return Err(AppError::translation(format!(
                "Relation '{}' row is not an object",
                fetch.def.name
            )));
        };
        let mut record = Record::new();
        for column in &fetch.columns {
            let kind = child
                .column(column)
                .map(|c| c.kind)
                .or_else(|| fetch.def.lookup(column).map(|l| l.kind))
                .ok_or_else(|| {
                    AppError::translation(format!(
                        "Relation '{}' has no column '{column}'",
                        fetch.def.name
                    ))
                })?;
            let raw = object.remove(*column).unwrap_or(serde_json::Value::Null);
            record.insert(*column, json_to_value(column, kind, raw)?);
        }
        rows.push(record);
    }
    Ok(rows)
}

fn json_to_value(column: &str, kind: ValueKind, raw: serde_json::Value) -> AppResult<Value> {
    use serde_json::Value as Json;

    let value = match (kind, raw) {
        (_, Json::Null) => Value::Null,
        (ValueKind::Integer, Json::Number(n)) => n.as_i64().map(Value::Integer).ok_or_else(|| {
            AppError::translation(format!("Column '{column}' value {n} is not a 64-bit integer"))
        })?,
        (ValueKind::Text, Json::String(s)) => Value::Text(s),
        (ValueKind::Timestamp, Json::String(s)) => DateTime::parse_from_rfc3339(&s)
            .map(|t| Value::Timestamp(t.with_timezone(&Utc)))
            .map_err(|e| {
                AppError::with_source(
                    catalog_core::ErrorKind::Translation,
                    format!("Column '{column}' holds an invalid timestamp '{s}'"),
                    e,
                )
            })?,
        (ValueKind::Date, Json::String(s)) => NaiveDate::parse_from_str(&s, "%Y-%m-%d")
            .map(Value::Date)
            .map_err(|e| {
                AppError::with_source(
                    catalog_core::ErrorKind::Translation,
                    format!("Column '{column}' holds an invalid date '{s}'"),
                    e,
                )
            })?,
        (kind, other) => {
            return Err(AppError::translation(format!(
                "Column '{column}' expected {kind}, found JSON {other}"
            )));
        }
    };
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use catalog_core::traits::Relation;
    use catalog_entity::ProductRelation;

    fn fetch() -> RelationFetch {
        RelationFetch {
            def: ProductRelation::Categories.def(),
            alias: "categories",
            columns: vec!["category_id", "category_name"],
        }
    }

    #[test]
    fn test_decode_relation_rows() {
        let json = serde_json::json!([
            { "category_id": 2, "category_name": "Lighting" },
            { "category_id": 5, "category_name": null }
        ]);
        let rows = decode_relation(&fetch(), json).expect("decode");
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].get("category_name"), Some(&Value::Text("Lighting".into())));
        assert_eq!(rows[1].get("category_id"), Some(&Value::Integer(5)));
        assert_eq!(rows[1].get("category_name"), Some(&Value::Null));
    }

    #[test]
    fn test_decode_relation_type_mismatch() {
        let json = serde_json::json!([{ "category_id": "two", "category_name": "x" }]);
        let err = decode_relation(&fetch(), json).unwrap_err();
        assert_eq!(err.kind, catalog_core::ErrorKind::Translation);
    }

    #[test]
    fn test_decode_relation_rejects_non_array() {
        let err = decode_relation(&fetch(), serde_json::json!({ "category_id": 1 })).unwrap_err();
        assert_eq!(err.kind, catalog_core::ErrorKind::Translation);
    }

    #[test]
    fn test_json_timestamp_from_postgres_format() {
        let value = json_to_value(
            "created_date",
            ValueKind::Timestamp,
            serde_json::json!("2024-03-01T10:15:30.123456+00:00"),
        )
        .expect("timestamp");
        match value {
            Value::Timestamp(t) => assert_eq!(t.timestamp_subsec_micros(), 123_456),
            other => panic!("expected timestamp, got {other:?}"),
        }
    }

    #[test]
    fn test_json_timestamp_from_sqlite_format() {
        let value = json_to_value(
            "created_date",
            ValueKind::Timestamp,
            serde_json::json!("2024-03-01T10:15:30+00:00"),
        )
        .expect("timestamp");
        assert!(matches!(value, Value::Timestamp(t) if t.timestamp_subsec_micros() == 0));
    }
}
