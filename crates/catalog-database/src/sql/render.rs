//! Translation of store-neutral queries into SQL.
//!
//! Every value is sent as a bound parameter. Identifiers come from static
//! entity metadata; they are still validated and quoted so a bad descriptor
//! fails as a translation error instead of producing broken SQL.

use sqlx::QueryBuilder;

use catalog_core::config::TextConfig;
use catalog_core::error::AppError;
use catalog_core::result::AppResult;
use catalog_core::traits::TableSchema;
use catalog_core::types::{Condition, OrderBy, Record, RelationFetch, SelectQuery, Value, ValueKind};

use super::text::glob_pattern;
use super::{Dialect, SqlBackend};

/// Alias of the root table in every statement.
const ROOT: &str = "t";

/// Check that `name` is a plain SQL identifier.
pub fn is_valid_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Validate and double-quote an identifier.
pub fn quote_identifier(name: &str) -> AppResult<String> {
    if !is_valid_identifier(name) {
        return Err(AppError::translation(format!(
            "Invalid SQL identifier '{name}'"
        )));
    }
    Ok(format!("\"{name}\""))
}

/// Quote a collation name. Collation names may contain `-`, so embedded
/// quotes are doubled instead of rejecting the name.
fn quote_collation(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Escape `LIKE` wildcards so the needle matches literally.
pub fn escape_like(needle: &str) -> String {
    let mut escaped = String::with_capacity(needle.len());
    for c in needle.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Incremental SQL writer over a sqlx [`QueryBuilder`].
pub(crate) struct SqlWriter<'c, DB: SqlBackend> {
    qb: QueryBuilder<'static, DB>,
    text: &'c TextConfig,
}

impl<'c, DB: SqlBackend> SqlWriter<'c, DB> {
    fn new(text: &'c TextConfig) -> Self {
        Self {
            qb: QueryBuilder::new(""),
            text,
        }
    }

    fn finish(self) -> QueryBuilder<'static, DB> {
        self.qb
    }

    fn push(&mut self, sql: &str) -> &mut Self {
        self.qb.push(sql);
        self
    }

    fn push_ident(&mut self, name: &str) -> AppResult<&mut Self> {
        let quoted = quote_identifier(name)?;
        self.qb.push(quoted);
        Ok(self)
    }

    fn push_column(&mut self, alias: &str, column: &str) -> AppResult<&mut Self> {
        self.qb.push(alias).push(".");
        self.push_ident(column)
    }

    fn push_collate(&mut self, kind: ValueKind) {
        if kind == ValueKind::Text {
            if let Some(collation) = self.text.collation() {
                self.qb.push(" COLLATE ").push(quote_collation(collation));
            }
        }
    }

    fn push_value(&mut self, kind: ValueKind, value: &Value) -> AppResult<()> {
        DB::bind_value(&mut self.qb, kind, value)
    }

    fn push_condition(&mut self, alias: &str, condition: &Condition) -> AppResult<()> {
        match condition {
            Condition::True => {
                self.push("TRUE");
            }
            Condition::False => {
                self.push("FALSE");
            }
            Condition::Compare {
                column,
                kind,
                op,
                value,
            } => {
                self.push_column(alias, column)?;
                self.push_collate(*kind);
                self.push(" ").push(op.as_sql()).push(" ");
                self.push_value(*kind, value)?;
            }
            Condition::OnDate {
                column,
                kind,
                op,
                date,
            } => {
                match (kind, DB::DIALECT) {
                    (ValueKind::Timestamp, Dialect::Postgres) => {
                        self.push("(");
                        self.push_column(alias, column)?;
                        self.push(" AT TIME ZONE 'UTC')::date");
                    }
                    (ValueKind::Timestamp, Dialect::Sqlite) => {
                        self.push("date(");
                        self.push_column(alias, column)?;
                        self.push(")");
                    }
                    (ValueKind::Date, _) => {
                        self.push_column(alias, column)?;
                    }
                    (other, _) => {
                        return Err(AppError::translation(format!(
                            "Date comparison on {other} column '{column}'"
                        )));
                    }
                }
                self.push(" ").push(op.as_sql()).push(" ");
                self.push_value(ValueKind::Date, &Value::Date(*date))?;
            }
            Condition::Contains { column, needle } => {
                self.push_column(alias, column)?;
                match DB::DIALECT {
                    Dialect::Postgres => {
                        self.push_collate(ValueKind::Text);
                        if self.text.case_insensitive {
                            self.push(" ILIKE '%' || ");
                        } else {
                            self.push(" LIKE '%' || ");
                        }
                        self.push_value(ValueKind::Text, &Value::Text(escape_like(needle)))?;
                        self.push(" || '%' ESCAPE '\\'");
                    }
                    Dialect::Sqlite => {
                        self.push(" GLOB ");
                        let pattern = glob_pattern(needle, self.text);
                        self.push_value(ValueKind::Text, &Value::Text(pattern))?;
                    }
                }
            }
            Condition::In {
                column,
                kind,
                values,
            } => {
                if values.is_empty() {
                    self.push("FALSE");
                    return Ok(());
                }
                self.push_column(alias, column)?;
                self.push_collate(*kind);
                self.push(" IN (");
                for (idx, value) in values.iter().enumerate() {
                    if idx > 0 {
                        self.push(", ");
                    }
                    self.push_value(*kind, value)?;
                }
                self.push(")");
            }
            Condition::IsNull { column } => {
                self.push_column(alias, column)?;
                self.push(" IS NULL");
            }
            Condition::And(children) => {
                self.push_junction(alias, children, " AND ", "TRUE")?;
            }
            Condition::Or(children) => {
                self.push_junction(alias, children, " OR ", "FALSE")?;
            }
            Condition::Not(child) => {
                self.push("NOT (");
                self.push_condition(alias, child)?;
                self.push(")");
            }
        }
        Ok(())
    }

    fn push_junction(
        &mut self,
        alias: &str,
        children: &[Condition],
        separator: &str,
        empty: &str,
    ) -> AppResult<()> {
        if children.is_empty() {
            self.push(empty);
            return Ok(());
        }
        self.push("(");
        for (idx, child) in children.iter().enumerate() {
            if idx > 0 {
                self.push(separator);
            }
            self.push_condition(alias, child)?;
        }
        self.push(")");
        Ok(())
    }

    fn push_where(&mut self, alias: &str, filter: &Condition) -> AppResult<()> {
        if *filter != Condition::True {
            self.push(" WHERE ");
            self.push_condition(alias, filter)?;
        }
        Ok(())
    }

    fn push_order(&mut self, alias: &str, order: &[OrderBy]) -> AppResult<()> {
        for (idx, key) in order.iter().enumerate() {
            self.push(if idx == 0 { " ORDER BY " } else { ", " });
            self.push_column(alias, key.column)?;
            self.push_collate(key.kind);
            self.push(" ").push(key.direction.as_sql());
        }
        Ok(())
    }

    /// Correlated sub-select aggregating the related rows as a JSON array.
    fn push_relation(&mut self, fetch: &RelationFetch) -> AppResult<()> {
        let def = fetch.def;
        let child = (def.child)();

        let (aggregate, object, empty) = match DB::DIALECT {
            Dialect::Postgres => ("jsonb_agg", "jsonb_build_object", "'[]'::jsonb"),
            Dialect::Sqlite => ("json_group_array", "json_object", "'[]'"),
        };
        self.push("(SELECT coalesce(")
            .push(aggregate)
            .push("(")
            .push(object)
            .push("(");
        for (idx, column) in fetch.columns.iter().enumerate() {
            if idx > 0 {
                self.push(", ");
            }
            let (source, source_column) = if child.column(column).is_some() {
                ("c".to_string(), *column)
            } else if let Some(pos) = def.lookups.iter().position(|l| l.alias == *column) {
                (format!("l{pos}"), def.lookups[pos].column)
            } else {
                return Err(AppError::translation(format!(
                    "Relation '{}' has no column '{column}'",
                    def.name
                )));
            };
            quote_identifier(column)?;
            self.push("'").push(column).push("', ");
            self.push_column(&source, source_column)?;
        }
        self.push(")");
        for (idx, key) in child.key.iter().enumerate() {
            self.push(if idx == 0 { " ORDER BY " } else { ", " });
            self.push_column("c", key)?;
        }
        self.push("), ").push(empty).push(") FROM ");
        self.push_ident(child.name)?;
        self.push(" AS c");
        for (pos, lookup) in def.lookups.iter().enumerate() {
            if !fetch.columns.contains(&lookup.alias) {
                continue;
            }
            let alias = format!("l{pos}");
            self.push(" LEFT JOIN ");
            self.push_ident(lookup.table)?;
            self.push(" AS ").push(&alias).push(" ON ");
            self.push_column(&alias, lookup.key)?;
            self.push(" = ");
            self.push_column("c", lookup.via)?;
        }
        self.push(" WHERE ");
        self.push_column("c", def.foreign_key)?;
        self.push(" = ");
        self.push_column(ROOT, def.parent_key)?;
        self.push(") AS ");
        self.push_ident(fetch.alias)?;
        Ok(())
    }
}

/// `SELECT ... FROM table AS t [WHERE] [ORDER BY] [LIMIT] [OFFSET] [FOR UPDATE]`
pub(crate) fn render_select<DB: SqlBackend>(
    query: &SelectQuery,
    text: &TextConfig,
) -> AppResult<QueryBuilder<'static, DB>> {
    if query.columns.is_empty() && query.relations.is_empty() {
        return Err(AppError::translation(format!(
            "Empty selection over {}",
            query.table
        )));
    }

    let mut w = SqlWriter::<DB>::new(text);
    w.push("SELECT ");
    let mut first = true;
    for column in &query.columns {
        if !first {
            w.push(", ");
        }
        first = false;
        w.push_column(ROOT, column.name)?;
    }
    for fetch in &query.relations {
        if !first {
            w.push(", ");
        }
        first = false;
        w.push_relation(fetch)?;
    }
    w.push(" FROM ");
    w.push_ident(query.table)?;
    w.push(" AS ").push(ROOT);
    w.push_where(ROOT, &query.filter)?;
    w.push_order(ROOT, &query.order)?;
    let skip = query.paging.skip.filter(|s| *s > 0);
    match query.paging.take {
        Some(take) => {
            w.push(" LIMIT ");
            w.push_value(ValueKind::Integer, &Value::Integer(to_i64(take)?))?;
        }
        // SQLite only accepts OFFSET after a LIMIT; a negative one is unbounded.
        None if skip.is_some() && DB::DIALECT == Dialect::Sqlite => {
            w.push(" LIMIT -1");
        }
        None => {}
    }
    if let Some(skip) = skip {
        w.push(" OFFSET ");
        w.push_value(ValueKind::Integer, &Value::Integer(to_i64(skip)?))?;
    }
    // SQLite has no row locks.
    if query.lock && DB::DIALECT == Dialect::Postgres {
        w.push(" FOR UPDATE OF ").push(ROOT);
    }
    Ok(w.finish())
}

/// `SELECT COUNT(*) FROM table AS t [WHERE]`
pub(crate) fn render_count<DB: SqlBackend>(
    table: &TableSchema,
    filter: &Condition,
    text: &TextConfig,
) -> AppResult<QueryBuilder<'static, DB>> {
    let mut w = SqlWriter::<DB>::new(text);
    w.push("SELECT COUNT(*) FROM ");
    w.push_ident(table.name)?;
    w.push(" AS ").push(ROOT);
    w.push_where(ROOT, filter)?;
    Ok(w.finish())
}

/// `INSERT INTO table (...) VALUES (...) RETURNING ...`
///
/// The generated key is always left to the database.
pub(crate) fn render_insert<DB: SqlBackend>(
    table: &TableSchema,
    row: &Record,
    text: &TextConfig,
) -> AppResult<QueryBuilder<'static, DB>> {
    for (column, _) in row.iter() {
        table.require_column(column)?;
    }

    let columns: Vec<_> = table
        .columns
        .iter()
        .filter(|c| Some(c.name) != table.generated_key && row.contains(c.name))
        .collect();

    let mut w = SqlWriter::<DB>::new(text);
    w.push("INSERT INTO ");
    w.push_ident(table.name)?;
    if columns.is_empty() {
        w.push(" DEFAULT VALUES");
    } else {
        w.push(" (");
        for (idx, column) in columns.iter().enumerate() {
            if idx > 0 {
                w.push(", ");
            }
            w.push_ident(column.name)?;
        }
        w.push(") VALUES (");
        for (idx, column) in columns.iter().enumerate() {
            if idx > 0 {
                w.push(", ");
            }
            w.push_value(column.kind, row.value(column.name))?;
        }
        w.push(")");
    }
    w.push(" RETURNING ");
    for (idx, column) in table.columns.iter().enumerate() {
        if idx > 0 {
            w.push(", ");
        }
        w.push_ident(column.name)?;
    }
    Ok(w.finish())
}

/// `UPDATE table AS t SET ... [WHERE]`
pub(crate) fn render_update<DB: SqlBackend>(
    table: &TableSchema,
    filter: &Condition,
    changes: &Record,
    text: &TextConfig,
) -> AppResult<QueryBuilder<'static, DB>> {
    if changes.is_empty() {
        return Err(AppError::internal(format!(
            "Update of {} with no changed columns",
            table.name
        )));
    }

    let mut w = SqlWriter::<DB>::new(text);
    w.push("UPDATE ");
    w.push_ident(table.name)?;
    w.push(" AS ").push(ROOT).push(" SET ");
    for (idx, (column, value)) in changes.iter().enumerate() {
        let def = table.require_column(column)?;
        if Some(def.name) == table.generated_key {
            return Err(AppError::translation(format!(
                "Generated column '{column}' of {} cannot be updated",
                table.name
            )));
        }
        if idx > 0 {
            w.push(", ");
        }
        w.push_ident(def.name)?;
        w.push(" = ");
        w.push_value(def.kind, value)?;
    }
    w.push_where(ROOT, filter)?;
    Ok(w.finish())
}

/// `DELETE FROM table AS t [WHERE]`
pub(crate) fn render_delete<DB: SqlBackend>(
    table: &TableSchema,
    filter: &Condition,
    text: &TextConfig,
) -> AppResult<QueryBuilder<'static, DB>> {
    let mut w = SqlWriter::<DB>::new(text);
    w.push("DELETE FROM ");
    w.push_ident(table.name)?;
    w.push(" AS ").push(ROOT);
    w.push_where(ROOT, filter)?;
    Ok(w.finish())
}

fn to_i64(n: u64) -> AppResult<i64> {
    i64::try_from(n).map_err(|_| AppError::translation(format!("Paging value {n} out of range")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use catalog_core::traits::{ColumnDef, Relation};
    use catalog_core::types::{FilterOp, Paging, SortDirection};
    use catalog_entity::{Category, ProductRelation};
    use chrono::NaiveDate;
    use sqlx::{Postgres, Sqlite};

    fn categories() -> TableSchema {
        TableSchema::of::<Category>()
    }

    fn name_contains(needle: &str) -> Condition {
        Condition::Contains {
            column: "name",
            needle: needle.to_string(),
        }
    }

    fn created_since(y: i32, m: u32, d: u32) -> Condition {
        Condition::OnDate {
            column: "created_date",
            kind: ValueKind::Timestamp,
            op: FilterOp::Gte,
            date: NaiveDate::from_ymd_opt(y, m, d).expect("date"),
        }
    }

    fn by_name_then_id(direction: SortDirection) -> Vec<OrderBy> {
        vec![
            OrderBy {
                column: "name",
                kind: ValueKind::Text,
                direction,
            },
            OrderBy {
                column: "id",
                kind: ValueKind::Integer,
                direction: SortDirection::Asc,
            },
        ]
    }

    fn categories_relation() -> SelectQuery {
        SelectQuery::new("products", vec![ColumnDef::new("id", ValueKind::Integer)])
            .relation(RelationFetch {
                def: ProductRelation::Categories.def(),
                alias: "categories",
                columns: vec!["category_id", "category_name"],
            })
            .for_update()
    }

    #[test]
    fn test_identifier_validation() {
        assert!(is_valid_identifier("created_date"));
        assert!(is_valid_identifier("_x1"));
        assert!(!is_valid_identifier("1abc"));
        assert!(!is_valid_identifier("name; DROP TABLE x"));
        assert!(!is_valid_identifier(""));
        assert_eq!(quote_identifier("name").expect("quote"), "\"name\"");
        assert!(quote_identifier("na\"me").is_err());
    }

    #[test]
    fn test_escape_like() {
        assert_eq!(escape_like("50%_off\\"), "50\\%\\_off\\\\");
        assert_eq!(escape_like("elect"), "elect");
    }

    #[test]
    fn test_select_with_filter_order_and_paging() {
        let query = SelectQuery::all_columns(&categories())
            .filter(Condition::And(vec![created_since(2024, 1, 1), name_contains("elect")]))
            .order(by_name_then_id(SortDirection::Desc))
            .paging(Paging::new(Some(20), Some(10)));

        let qb = render_select::<Postgres>(&query, &TextConfig::default()).expect("render");
        assert_eq!(
            qb.sql(),
            "SELECT t.\"id\", t.\"name\", t.\"created_date\" FROM \"categories\" AS t \
             WHERE ((t.\"created_date\" AT TIME ZONE 'UTC')::date >= $1 \
             AND t.\"name\" COLLATE \"tr-TR-x-icu\" ILIKE '%' || $2 || '%' ESCAPE '\\') \
             ORDER BY t.\"name\" COLLATE \"tr-TR-x-icu\" DESC, t.\"id\" ASC LIMIT $3 OFFSET $4"
        );
    }

    #[test]
    fn test_search_follows_configured_collation() {
        let text = TextConfig {
            collation: Some("en-US-x-icu".into()),
            case_insensitive: true,
        };
        let query = SelectQuery::all_columns(&categories()).filter(name_contains("ışık"));
        let qb = render_select::<Postgres>(&query, &text).expect("render");
        assert!(
            qb.sql()
                .contains("t.\"name\" COLLATE \"en-US-x-icu\" ILIKE '%' || $1"),
            "{}",
            qb.sql()
        );
    }

    #[test]
    fn test_ordinal_text_uses_like_without_collation() {
        let query = SelectQuery::all_columns(&categories())
            .filter(name_contains("x"))
            .order(vec![OrderBy {
                column: "name",
                kind: ValueKind::Text,
                direction: SortDirection::Asc,
            }]);
        let qb = render_select::<Postgres>(&query, &TextConfig::ordinal()).expect("render");
        assert!(qb.sql().contains("t.\"name\" LIKE '%' || $1"));
        assert!(qb.sql().ends_with("ORDER BY t.\"name\" ASC"));
    }

    #[test]
    fn test_sqlite_select_uses_glob_and_date_function() {
        let query = SelectQuery::all_columns(&categories())
            .filter(Condition::And(vec![created_since(2024, 1, 1), name_contains("elect")]))
            .order(by_name_then_id(SortDirection::Asc))
            .paging(Paging::new(Some(5), None))
            .for_update();

        let qb = render_select::<Sqlite>(&query, &TextConfig::default()).expect("render");
        let sql = qb.sql();
        assert!(sql.contains("WHERE (date(t.\"created_date\") >= "), "{sql}");
        assert!(sql.contains("AND t.\"name\" GLOB "), "{sql}");
        assert!(sql.contains("ORDER BY t.\"name\" COLLATE \"tr-TR-x-icu\" ASC, t.\"id\" ASC"));
        assert!(sql.contains(" LIMIT -1 OFFSET "), "{sql}");
        assert!(!sql.contains("FOR UPDATE"));
    }

    #[test]
    fn test_match_all_has_no_where_clause() {
        let qb = render_count::<Postgres>(&categories(), &Condition::True, &TextConfig::default())
            .expect("render");
        assert_eq!(qb.sql(), "SELECT COUNT(*) FROM \"categories\" AS t");
    }

    #[test]
    fn test_empty_junctions_and_in() {
        let filter = Condition::Or(vec![
            Condition::And(Vec::new()),
            Condition::Or(Vec::new()),
            Condition::In {
                column: "id",
                kind: ValueKind::Integer,
                values: Vec::new(),
            },
        ]);
        let qb = render_delete::<Sqlite>(&categories(), &filter, &TextConfig::default())
            .expect("render");
        assert_eq!(
            qb.sql(),
            "DELETE FROM \"categories\" AS t WHERE (TRUE OR FALSE OR FALSE)"
        );
    }

    #[test]
    fn test_relation_renders_correlated_json_sub_select() {
        let qb = render_select::<Postgres>(&categories_relation(), &TextConfig::default())
            .expect("render");
        assert_eq!(
            qb.sql(),
            "SELECT t.\"id\", (SELECT coalesce(jsonb_agg(jsonb_build_object(\
             'category_id', c.\"category_id\", 'category_name', l0.\"name\") \
             ORDER BY c.\"product_id\", c.\"category_id\"), '[]'::jsonb) \
             FROM \"product_categories\" AS c \
             LEFT JOIN \"categories\" AS l0 ON l0.\"id\" = c.\"category_id\" \
             WHERE c.\"product_id\" = t.\"id\") AS \"categories\" \
             FROM \"products\" AS t FOR UPDATE OF t"
        );
    }

    #[test]
    fn test_sqlite_relation_uses_json_group_array() {
        let qb = render_select::<Sqlite>(&categories_relation(), &TextConfig::default())
            .expect("render");
        assert_eq!(
            qb.sql(),
            "SELECT t.\"id\", (SELECT coalesce(json_group_array(json_object(\
             'category_id', c.\"category_id\", 'category_name', l0.\"name\") \
             ORDER BY c.\"product_id\", c.\"category_id\"), '[]') \
             FROM \"product_categories\" AS c \
             LEFT JOIN \"categories\" AS l0 ON l0.\"id\" = c.\"category_id\" \
             WHERE c.\"product_id\" = t.\"id\") AS \"categories\" \
             FROM \"products\" AS t"
        );
    }

    #[test]
    fn test_insert_skips_generated_key() {
        let row = Record::new()
            .with("id", 99_i64)
            .with("name", "Books")
            .with("created_date", chrono::Utc::now());
        let qb = render_insert::<Postgres>(&categories(), &row, &TextConfig::default())
            .expect("render");
        assert_eq!(
            qb.sql(),
            "INSERT INTO \"categories\" (\"name\", \"created_date\") VALUES ($1, $2) \
             RETURNING \"id\", \"name\", \"created_date\""
        );
    }

    #[test]
    fn test_insert_rejects_unknown_column() {
        let row = Record::new().with("colour", "red");
        let err = render_insert::<Postgres>(&categories(), &row, &TextConfig::default())
            .err()
            .expect("error");
        assert_eq!(err.kind, catalog_core::ErrorKind::Translation);
    }

    #[test]
    fn test_update_sets_changed_columns_only() {
        let changes = Record::new().with("name", "Gadgets");
        let filter = Condition::Compare {
            column: "id",
            kind: ValueKind::Integer,
            op: FilterOp::Eq,
            value: Value::Integer(4),
        };
        let qb = render_update::<Postgres>(&categories(), &filter, &changes, &TextConfig::ordinal())
            .expect("render");
        assert_eq!(
            qb.sql(),
            "UPDATE \"categories\" AS t SET \"name\" = $1 WHERE t.\"id\" = $2"
        );
    }

    #[test]
    fn test_update_rejects_generated_key() {
        let changes = Record::new().with("id", 5_i64);
        let err = render_update::<Postgres>(
            &categories(),
            &Condition::True,
            &changes,
            &TextConfig::ordinal(),
        )
        .err()
        .expect("error");
        assert_eq!(err.kind, catalog_core::ErrorKind::Translation);
    }

    #[test]
    fn test_kind_mismatch_is_translation_error() {
        let filter = Condition::Compare {
            column: "id",
            kind: ValueKind::Integer,
            op: FilterOp::Eq,
            value: Value::Text("7".into()),
        };
        let err = render_count::<Sqlite>(&categories(), &filter, &TextConfig::ordinal())
            .err()
            .expect("error");
        assert_eq!(err.kind, catalog_core::ErrorKind::Translation);
    }
}
