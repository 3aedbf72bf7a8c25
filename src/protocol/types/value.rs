//! MySQL value types for text-protocol query results.

use chrono::{NaiveDate, NaiveDateTime};
use std::fmt;

use crate::error::{Error, Result};

/// A single column value as sent by the text protocol.
///
/// The server renders every value as text; numbers and temporals are kept
/// in that form and converted on demand.
#[derive(Debug, Clone, PartialEq)]
pub enum MysqlValue {
    /// NULL value.
    Null,
    /// Textual value (strings, numbers, temporals, JSON).
    Text(String),
    /// Raw binary value (BLOB, BINARY, BIT, GEOMETRY, or non-UTF-8 text).
    Bytes(Vec<u8>),
}

impl MysqlValue {
    /// Build a value from raw field bytes.
    ///
    /// Binary columns stay as bytes, everything else becomes text when it is
    /// valid UTF-8.
    pub fn from_field(raw: Option<&[u8]>, binary: bool) -> Self {
        match raw {
            None => MysqlValue::Null,
            Some(bytes) if binary => MysqlValue::Bytes(bytes.to_vec()),
            Some(bytes) => match std::str::from_utf8(bytes) {
                Ok(s) => MysqlValue::Text(s.to_string()),
                Err(_) => MysqlValue::Bytes(bytes.to_vec()),
            },
        }
    }

    /// Check if the value is NULL.
    pub fn is_null(&self) -> bool {
        matches!(self, MysqlValue::Null)
    }

    /// Try to get the value as a string reference.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            MysqlValue::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Get the raw bytes of a non-NULL value.
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            MysqlValue::Text(s) => Some(s.as_bytes()),
            MysqlValue::Bytes(b) => Some(b),
            MysqlValue::Null => None,
        }
    }

    /// Try to convert to i64.
    pub fn to_i64(&self) -> Option<i64> {
        self.as_str()?.parse().ok()
    }

    /// Try to convert to u64.
    pub fn to_u64(&self) -> Option<u64> {
        self.as_str()?.parse().ok()
    }

    /// Try to convert to f64.
    pub fn to_f64(&self) -> Option<f64> {
        self.as_str()?.parse().ok()
    }

    /// Try to parse a DATE value (`YYYY-MM-DD`).
    pub fn as_date(&self) -> Option<NaiveDate> {
        NaiveDate::parse_from_str(self.as_str()?, "%Y-%m-%d").ok()
    }

    /// Try to parse a DATETIME/TIMESTAMP value, with optional fractional seconds.
    pub fn as_datetime(&self) -> Option<NaiveDateTime> {
        NaiveDateTime::parse_from_str(self.as_str()?, "%Y-%m-%d %H:%M:%S%.f").ok()
    }

    /// Convert to i64, failing on NULL or non-numeric text.
    pub fn try_i64(&self) -> Result<i64> {
        self.to_i64()
            .ok_or_else(|| Error::type_conversion(format!("cannot convert {} to i64", self)))
    }
}

impl fmt::Display for MysqlValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MysqlValue::Null => write!(f, "NULL"),
            MysqlValue::Text(s) => write!(f, "{}", s),
            MysqlValue::Bytes(b) => write!(f, "{}", String::from_utf8_lossy(b)),
        }
    }
}
