//! MySQL data types for query results.

mod column;
mod column_type;
mod metadata;
mod row;
mod value;

pub use column::{Column, ColumnInfo};
pub use column_type::MysqlType;
pub use metadata::ColumnMetadata;
pub use row::Row;
pub use value::MysqlValue;
