//! Internal column metadata from wire format.
//!
//! This struct preserves the raw Protocol::ColumnDefinition41 fields.
//! For user-facing API, use `Column` which provides a cleaner interface.

use crate::protocol::constants::NOT_NULL_FLAG;

/// Internal column metadata from wire format.
///
/// Use `Column` for user-facing API.
#[derive(Debug, Clone)]
pub struct ColumnMetadata {
    /// Schema (database) name.
    pub schema: String,
    /// Table alias.
    pub table: String,
    /// Physical table name.
    pub org_table: String,
    /// Column alias.
    pub name: String,
    /// Physical column name.
    pub org_name: String,
    /// Collation id of the column.
    pub charset: u16,
    /// Maximum display length.
    pub column_length: u32,
    /// Column type byte (raw wire format).
    pub column_type: u8,
    /// Column definition flags.
    pub flags: u16,
    /// Number of decimals.
    pub decimals: u8,
}

impl ColumnMetadata {
    /// Create new column metadata with minimal info.
    pub fn new(name: impl Into<String>, column_type: u8) -> Self {
        Self {
            schema: String::new(),
            table: String::new(),
            org_table: String::new(),
            name: name.into(),
            org_name: String::new(),
            charset: 0,
            column_length: 0,
            column_type,
            flags: 0,
            decimals: 0,
        }
    }

    /// Whether NULL values are allowed.
    pub fn nullable(&self) -> bool {
        self.flags & NOT_NULL_FLAG == 0
    }
}
