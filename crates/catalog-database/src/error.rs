//! Classification of sqlx failures into application error kinds.

use catalog_core::error::{AppError, ErrorKind};

/// Extension trait for converting `sqlx::Error` into [`AppError`].
///
/// The orphan rule keeps `From<sqlx::Error>` out of the core crate, so
/// every call site goes through `.into_app_error(context)` instead.
pub trait SqlxErrorExt {
    /// Classify the error and wrap it with `context`.
    fn into_app_error(self, context: &str) -> AppError;
}

impl SqlxErrorExt for sqlx::Error {
    fn into_app_error(self, context: &str) -> AppError {
        let kind = classify(&self);
        AppError::with_source(kind, format!("{context}: {self}"), self)
    }
}

/// Decide which [`ErrorKind`] a sqlx error belongs to.
pub fn classify(err: &sqlx::Error) -> ErrorKind {
    match err {
        sqlx::Error::PoolTimedOut
        | sqlx::Error::PoolClosed
        | sqlx::Error::WorkerCrashed
        | sqlx::Error::Io(_)
        | sqlx::Error::Tls(_)
        | sqlx::Error::Protocol(_) => ErrorKind::StoreUnavailable,
        sqlx::Error::Database(db) => {
            use sqlx::error::ErrorKind as DbKind;
            match db.kind() {
                DbKind::UniqueViolation
                | DbKind::ForeignKeyViolation
                | DbKind::NotNullViolation
                | DbKind::CheckViolation => ErrorKind::IntegrityViolation,
                _ if db.try_downcast_ref::<sqlx::sqlite::SqliteError>().is_some() => db
                    .code()
                    .map_or(ErrorKind::Database, |code| classify_sqlite_code(&code)),
                _ => db
                    .code()
                    .map_or(ErrorKind::Database, |code| classify_sqlstate(&code)),
            }
        }
        sqlx::Error::ColumnNotFound(_)
        | sqlx::Error::ColumnIndexOutOfBounds { .. }
        | sqlx::Error::ColumnDecode { .. }
        | sqlx::Error::TypeNotFound { .. }
        | sqlx::Error::Decode(_)
        | sqlx::Error::Encode(_) => ErrorKind::Translation,
        sqlx::Error::RowNotFound => ErrorKind::NotFound,
        sqlx::Error::Configuration(_) => ErrorKind::Configuration,
        _ => ErrorKind::Database,
    }
}

/// Classify a PostgreSQL SQLSTATE code.
pub fn classify_sqlstate(code: &str) -> ErrorKind {
    match code {
        // serialization_failure, deadlock_detected
        "40001" | "40P01" => ErrorKind::StoreUnavailable,
        // admin_shutdown, crash_shutdown, cannot_connect_now
        "57P01" | "57P02" | "57P03" => ErrorKind::StoreUnavailable,
        _ if code.starts_with("08") => ErrorKind::StoreUnavailable,
        _ if code.starts_with("23") => ErrorKind::IntegrityViolation,
        // syntax_error_or_access_rule_violation
        _ if code.starts_with("42") => ErrorKind::Translation,
        // data_exception
        _ if code.starts_with("22") => ErrorKind::Translation,
        _ => ErrorKind::Database,
    }
}

/// Classify a SQLite result code, primary or extended.
pub fn classify_sqlite_code(code: &str) -> ErrorKind {
    let Ok(code) = code.parse::<i32>() else {
        return ErrorKind::Database;
    };
    match code & 0xff {
        // SQLITE_BUSY, SQLITE_LOCKED
        5 | 6 => ErrorKind::StoreUnavailable,
        // SQLITE_CONSTRAINT
        19 => ErrorKind::IntegrityViolation,
        // SQLITE_ERROR: unknown table or column, syntax
        1 => ErrorKind::Translation,
        // SQLITE_MISMATCH, SQLITE_RANGE
        20 | 25 => ErrorKind::Translation,
        _ => ErrorKind::Database,
    }
}
