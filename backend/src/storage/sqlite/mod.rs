//! SQLite implementations of the storage traits.

pub mod repositories;

pub use repositories::{
    AccountRepository, BeneficiaryRepository, CardRepository, NotificationRepository,
    TransactionRepository, UserRepository,
};

use crate::error::{LedgerError, Result};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::sqlite::SqliteRow;
use sqlx::Row;

/// Parse a decimal TEXT column. Monetary values are stored as decimal
/// strings, never as floating point.
pub(crate) fn decimal_col(row: &SqliteRow, col: &str) -> Result<Decimal> {
    let value: String = row.get(col);
    value
        .parse()
        .map_err(|e| LedgerError::Decode(format!("{col}: {e}")))
}

pub(crate) fn opt_decimal_col(row: &SqliteRow, col: &str) -> Result<Option<Decimal>> {
    let value: Option<String> = row.get(col);
    match value {
        Some(v) => Ok(Some(
            v.parse()
                .map_err(|e| LedgerError::Decode(format!("{col}: {e}")))?,
        )),
        None => Ok(None),
    }
}

/// Parse an RFC 3339 TEXT timestamp column.
pub(crate) fn datetime_col(row: &SqliteRow, col: &str) -> Result<DateTime<Utc>> {
    let value: String = row.get(col);
    DateTime::parse_from_rfc3339(&value)
        .map(|d| d.with_timezone(&Utc))
        .map_err(|e| LedgerError::Decode(format!("{col}: {e}")))
}

pub(crate) fn opt_datetime_col(row: &SqliteRow, col: &str) -> Result<Option<DateTime<Utc>>> {
    let value: Option<String> = row.get(col);
    match value {
        Some(v) => Ok(Some(
            DateTime::parse_from_rfc3339(&v)
                .map(|d| d.with_timezone(&Utc))
                .map_err(|e| LedgerError::Decode(format!("{col}: {e}")))?,
        )),
        None => Ok(None),
    }
}

/// Parse an optional JSON TEXT column.
pub(crate) fn json_col(row: &SqliteRow, col: &str) -> Result<Option<serde_json::Value>> {
    let value: Option<String> = row.get(col);
    match value {
        Some(v) => Ok(Some(
            serde_json::from_str(&v).map_err(|e| LedgerError::Decode(format!("{col}: {e}")))?,
        )),
        None => Ok(None),
    }
}

pub(crate) fn json_text(value: &Option<serde_json::Value>) -> Option<String> {
    value.as_ref().map(|v| v.to_string())
}

/// Map a unique-constraint violation to Conflict; pass anything else
/// through as a storage error.
pub(crate) fn conflict_on_unique(err: sqlx::Error, message: &str) -> LedgerError {
    match err.as_database_error() {
        Some(db) if db.is_unique_violation() => LedgerError::Conflict(message.to_string()),
        _ => LedgerError::Storage(err),
    }
}
