//! Scalar values stored in records and their SQL representations.
//!
//! A [`SqlValue`] has two SQL forms:
//!
//! - a **literal** fragment ([`SqlValue::to_literal`]) used when a value has
//!   to appear inline in statement text, and for diagnostics;
//! - a **bound parameter** ([`rusqlite::types::ToSql`]) used by the record
//!   access layer for everything except the `CURRENT_TIMESTAMP` sentinel.
//!
//! Both forms follow the same typing contract: text is text, booleans are
//! `true`/`false` (stored as 1/0), numbers are numeric, structured objects
//! are JSON-encoded text.
//!
//! Only the literal form treats text spelled `CURRENT_TIMESTAMP` as the
//! timestamp keyword. When binding, only [`SqlValue::CurrentTimestamp`] is
//! the sentinel; text is always stored as the text it holds.

use std::fmt;

use rusqlite::types::{ToSql, ToSqlOutput, Value as SqliteValue, ValueRef};
use serde_json::Value as JsonValue;

use crate::error::{StoreError, StoreResult};

/// Keyword that evaluates to the engine's current time.
pub const CURRENT_TIMESTAMP: &str = "CURRENT_TIMESTAMP";

/// A single column value.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    /// SQL `NULL`.
    Null,
    /// Boolean, rendered as `true` / `false`.
    Bool(bool),
    /// 64-bit signed integer.
    Integer(i64),
    /// Double precision float. Must be finite when written.
    Real(f64),
    /// UTF-8 text.
    Text(String),
    /// Structured object, stored as JSON text.
    Json(JsonValue),
    /// The engine's current-time function, emitted verbatim.
    CurrentTimestamp,
}

impl SqlValue {
    /// Returns `true` for the timestamp sentinel in literal rendering,
    /// including a text value spelled exactly `CURRENT_TIMESTAMP`.
    pub fn is_current_timestamp(&self) -> bool {
        match self {
            Self::CurrentTimestamp => true,
            Self::Text(s) => s == CURRENT_TIMESTAMP,
            _ => false,
        }
    }

    /// Returns `true` for SQL `NULL`.
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Reject values that cannot be written faithfully.
    pub fn validate(&self) -> StoreResult<()> {
        match self {
            Self::Real(f) if !f.is_finite() => Err(StoreError::InvalidArgument(format!(
                "non-finite number cannot be stored: {f}"
            ))),
            _ => Ok(()),
        }
    }

    /// Render the value as an inline SQL literal.
    ///
    /// Embedded single quotes are doubled, so the result is always a single
    /// well-formed literal.
    pub fn to_literal(&self) -> String {
        if self.is_current_timestamp() {
            return CURRENT_TIMESTAMP.to_owned();
        }
        match self {
            Self::Null => "NULL".to_owned(),
            Self::Bool(true) => "true".to_owned(),
            Self::Bool(false) => "false".to_owned(),
            Self::Integer(i) => i.to_string(),
            Self::Real(f) => format!("{f:?}"),
            Self::Text(s) => quote(s),
            Self::Json(v) => quote(&v.to_string()),
            Self::CurrentTimestamp => CURRENT_TIMESTAMP.to_owned(),
        }
    }

    // ── accessors ────────────────────────────────────────────────────

    /// Borrow the text content, if this is a text value.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Integer content. Booleans read as 0/1.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Integer(i) => Some(*i),
            Self::Bool(b) => Some(i64::from(*b)),
            _ => None,
        }
    }

    /// Numeric content as a float.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Real(f) => Some(*f),
            Self::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    /// Boolean content. Integers 0 and 1 are accepted since SQLite has no
    /// native boolean storage class.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            Self::Integer(0) => Some(false),
            Self::Integer(1) => Some(true),
            _ => None,
        }
    }

    /// Structured content. Text holding valid JSON is decoded.
    pub fn as_json(&self) -> Option<JsonValue> {
        match self {
            Self::Json(v) => Some(v.clone()),
            Self::Text(s) => serde_json::from_str(s).ok(),
            _ => None,
        }
    }

    /// Convert into a plain JSON value (for logging and replies).
    pub fn to_json(&self) -> JsonValue {
        match self {
            Self::Null => JsonValue::Null,
            Self::Bool(b) => JsonValue::Bool(*b),
            Self::Integer(i) => JsonValue::from(*i),
            Self::Real(f) => serde_json::Number::from_f64(*f)
                .map(JsonValue::Number)
                .unwrap_or(JsonValue::Null),
            Self::Text(s) => JsonValue::String(s.clone()),
            Self::Json(v) => v.clone(),
            Self::CurrentTimestamp => JsonValue::String(CURRENT_TIMESTAMP.to_owned()),
        }
    }

    /// Decode a column read from SQLite.
    ///
    /// `decl_type` is the column's declared type; `BOOLEAN` integers come
    /// back as [`SqlValue::Bool`] and `JSON` text as [`SqlValue::Json`].
    pub(crate) fn from_column(value: ValueRef<'_>, decl_type: Option<&str>) -> Self {
        let decl = decl_type.map(str::to_ascii_uppercase);
        let decl = decl.as_deref();
        match value {
            ValueRef::Null => Self::Null,
            ValueRef::Integer(i) if matches!(decl, Some("BOOLEAN" | "BOOL")) => Self::Bool(i != 0),
            ValueRef::Integer(i) => Self::Integer(i),
            ValueRef::Real(f) => Self::Real(f),
            ValueRef::Text(bytes) => {
                let text = String::from_utf8_lossy(bytes).into_owned();
                if decl == Some("JSON") {
                    match serde_json::from_str(&text) {
                        Ok(v) => Self::Json(v),
                        Err(_) => Self::Text(text),
                    }
                } else {
                    Self::Text(text)
                }
            }
            ValueRef::Blob(bytes) => Self::Text(String::from_utf8_lossy(bytes).into_owned()),
        }
    }
}

/// Single-quote `s`, doubling embedded quotes.
fn quote(s: &str) -> String {
    format!("'{}'", s.replace('\'', "''"))
}

impl ToSql for SqlValue {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        if matches!(self, Self::CurrentTimestamp) {
            return Err(rusqlite::Error::ToSqlConversionFailure(
                "CURRENT_TIMESTAMP is emitted inline and cannot be bound".into(),
            ));
        }
        let out = match self {
            Self::Null => ToSqlOutput::Owned(SqliteValue::Null),
            Self::Bool(b) => ToSqlOutput::Owned(SqliteValue::Integer(i64::from(*b))),
            Self::Integer(i) => ToSqlOutput::Owned(SqliteValue::Integer(*i)),
            Self::Real(f) => ToSqlOutput::Owned(SqliteValue::Real(*f)),
            Self::Text(s) => ToSqlOutput::Borrowed(ValueRef::Text(s.as_bytes())),
            Self::Json(v) => {
                let encoded = serde_json::to_string(v)
                    .map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))?;
                ToSqlOutput::Owned(SqliteValue::Text(encoded))
            }
            Self::CurrentTimestamp => ToSqlOutput::Owned(SqliteValue::Null),
        };
        Ok(out)
    }
}

impl fmt::Display for SqlValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => Ok(()),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Integer(i) => write!(f, "{i}"),
            Self::Real(x) => write!(f, "{x}"),
            Self::Text(s) => f.write_str(s),
            Self::Json(v) => write!(f, "{v}"),
            Self::CurrentTimestamp => f.write_str(CURRENT_TIMESTAMP),
        }
    }
}

// ── conversions ──────────────────────────────────────────────────────

impl From<&str> for SqlValue {
    fn from(v: &str) -> Self {
        Self::Text(v.to_owned())
    }
}

impl From<String> for SqlValue {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

impl From<bool> for SqlValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i64> for SqlValue {
    fn from(v: i64) -> Self {
        Self::Integer(v)
    }
}

impl From<i32> for SqlValue {
    fn from(v: i32) -> Self {
        Self::Integer(i64::from(v))
    }
}

impl From<u32> for SqlValue {
    fn from(v: u32) -> Self {
        Self::Integer(i64::from(v))
    }
}

impl From<f64> for SqlValue {
    fn from(v: f64) -> Self {
        Self::Real(v)
    }
}

impl From<JsonValue> for SqlValue {
    fn from(v: JsonValue) -> Self {
        Self::Json(v)
    }
}

impl<T: Into<SqlValue>> From<Option<T>> for SqlValue {
    fn from(v: Option<T>) -> Self {
        v.map_or(Self::Null, Into::into)
    }
}

// ── tests ────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn literals_follow_typing_contract() {
        assert_eq!(SqlValue::from("abc").to_literal(), "'abc'");
        assert_eq!(SqlValue::from(true).to_literal(), "true");
        assert_eq!(SqlValue::from(false).to_literal(), "false");
        assert_eq!(SqlValue::from(42_i64).to_literal(), "42");
        assert_eq!(SqlValue::from(-1.5).to_literal(), "-1.5");
        assert_eq!(SqlValue::Null.to_literal(), "NULL");
        assert_eq!(
            SqlValue::from(json!({"a": 1})).to_literal(),
            r#"'{"a":1}'"#
        );
    }

    #[test]
    fn embedded_quotes_are_doubled() {
        let v = SqlValue::from("O'Brien'); DROP TABLE User; --");
        assert_eq!(v.to_literal(), "'O''Brien''); DROP TABLE User; --'");
    }

    #[test]
    fn timestamp_sentinel_passes_through_unquoted() {
        assert_eq!(SqlValue::CurrentTimestamp.to_literal(), "CURRENT_TIMESTAMP");
        assert_eq!(SqlValue::from("CURRENT_TIMESTAMP").to_literal(), "CURRENT_TIMESTAMP");
        assert!(SqlValue::from("CURRENT_TIMESTAMP").is_current_timestamp());
        assert!(!SqlValue::from("current_timestamp").is_current_timestamp());
    }

    #[test]
    fn sentinel_refuses_to_bind() {
        assert!(matches!(
            SqlValue::CurrentTimestamp.to_sql(),
            Err(rusqlite::Error::ToSqlConversionFailure(_))
        ));
    }

    #[test]
    fn timestamp_spelled_as_text_binds_as_text() {
        let v = SqlValue::from("CURRENT_TIMESTAMP");
        match v.to_sql().unwrap() {
            ToSqlOutput::Borrowed(ValueRef::Text(bytes)) => assert_eq!(bytes, b"CURRENT_TIMESTAMP"),
            other => panic!("expected borrowed text, got {other:?}"),
        }
    }

    #[test]
    fn non_finite_reals_are_rejected() {
        assert!(SqlValue::Real(f64::NAN).validate().is_err());
        assert!(SqlValue::Real(f64::INFINITY).validate().is_err());
        assert!(SqlValue::Real(1.0).validate().is_ok());
    }

    #[test]
    fn declared_boolean_columns_decode_as_bool() {
        let v = SqlValue::from_column(ValueRef::Integer(1), Some("BOOLEAN"));
        assert_eq!(v, SqlValue::Bool(true));
        let v = SqlValue::from_column(ValueRef::Integer(1), Some("INTEGER"));
        assert_eq!(v, SqlValue::Integer(1));
    }

    #[test]
    fn declared_json_columns_decode_as_json() {
        let v = SqlValue::from_column(ValueRef::Text(br#"{"k":[1,2]}"#), Some("json"));
        assert_eq!(v, SqlValue::Json(json!({"k": [1, 2]})));
        let v = SqlValue::from_column(ValueRef::Text(b"not json"), Some("JSON"));
        assert_eq!(v, SqlValue::Text("not json".into()));
    }

    #[test]
    fn accessors() {
        assert_eq!(SqlValue::Integer(1).as_bool(), Some(true));
        assert_eq!(SqlValue::Integer(7).as_bool(), None);
        assert_eq!(SqlValue::Bool(true).as_i64(), Some(1));
        assert_eq!(SqlValue::Text("[1]".into()).as_json(), Some(json!([1])));
        assert_eq!(SqlValue::from(None::<i64>), SqlValue::Null);
    }
}
