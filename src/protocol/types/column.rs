//! Column and ColumnInfo types for user-facing API.
//!
//! These types provide a clean interface for accessing column information
//! from query results, derived from the internal ColumnMetadata.

use super::column_type::MysqlType;
use super::metadata::ColumnMetadata;

/// A column in a result set (user-facing representation).
#[derive(Debug, Clone)]
pub struct Column {
    /// Column name (alias as sent by the server).
    pub name: String,
    /// Table the column belongs to, empty for expressions.
    pub table: String,
    /// Whether NULL values are allowed.
    pub nullable: bool,
    /// Column data type.
    pub data_type: MysqlType,
    /// Raw MySQL type byte.
    pub type_num: u8,
}

impl Column {
    /// Create a column from metadata.
    pub fn from_metadata(meta: &ColumnMetadata) -> Self {
        Self {
            name: meta.name.clone(),
            table: meta.table.clone(),
            nullable: meta.nullable(),
            data_type: MysqlType::from_raw(
                meta.column_type,
                meta.flags,
                meta.charset,
                meta.column_length,
                meta.decimals,
            ),
            type_num: meta.column_type,
        }
    }
}

/// Shared column information for all rows in a result set.
#[derive(Debug, Clone)]
pub struct ColumnInfo {
    /// Column definitions.
    pub columns: Vec<Column>,
}

impl ColumnInfo {
    /// Create new column info from columns.
    pub fn new(columns: Vec<Column>) -> Self {
        Self { columns }
    }

    /// Create column info from internal metadata.
    pub fn from_metadata(metadata: &[ColumnMetadata]) -> Self {
        Self {
            columns: metadata.iter().map(Column::from_metadata).collect(),
        }
    }

    /// Get column names.
    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    /// Get the number of columns.
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    /// Check if there are no columns.
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Get column by index.
    pub fn get(&self, index: usize) -> Option<&Column> {
        self.columns.get(index)
    }

    /// Find column index by name (case-insensitive, as MySQL column names are).
    pub fn find_by_name(&self, name: &str) -> Option<usize> {
        self.columns
            .iter()
            .position(|c| c.name.eq_ignore_ascii_case(name))
    }
}
