//! MySQL column type enum with type-specific attributes.
//!
//! Note: Nullability is a column property, not a type property.

use crate::protocol::constants::*;

/// MySQL column type decoded from a column definition.
#[derive(Debug, Clone, PartialEq)]
pub enum MysqlType {
    /// TINYINT, SMALLINT, MEDIUMINT, INT, BIGINT.
    Integer { bytes: u8, unsigned: bool },
    /// DECIMAL(precision, scale) - exact numeric, kept as text.
    Decimal { decimals: u8 },
    /// FLOAT.
    Float,
    /// DOUBLE.
    Double,
    /// BIT(n).
    Bit { length: u32 },
    /// YEAR.
    Year,
    /// DATE.
    Date,
    /// TIME.
    Time,
    /// DATETIME.
    DateTime,
    /// TIMESTAMP.
    Timestamp,
    /// CHAR, VARCHAR, TEXT family (non-binary charset).
    Text { max_length: u32 },
    /// BINARY, VARBINARY, BLOB family.
    Binary { max_length: u32 },
    /// ENUM.
    Enum,
    /// SET.
    Set,
    /// JSON.
    Json,
    /// VECTOR, sent as packed float bytes.
    Vector { max_length: u32 },
    /// GEOMETRY.
    Geometry,
    /// Type of a literal NULL.
    Null,
}

impl MysqlType {
    /// Create from the raw column type byte and column definition attributes.
    ///
    /// Type bytes this client does not know decode like the string family:
    /// binary when the column charset is `binary`, text otherwise.
    pub fn from_raw(column_type: u8, flags: u16, charset: u16, length: u32, decimals: u8) -> Self {
        let unsigned = flags & UNSIGNED_FLAG != 0;
        let is_binary = charset == CHARSET_BINARY;

        match column_type {
            MYSQL_TYPE_TINY => MysqlType::Integer { bytes: 1, unsigned },
            MYSQL_TYPE_SHORT => MysqlType::Integer { bytes: 2, unsigned },
            MYSQL_TYPE_INT24 => MysqlType::Integer { bytes: 3, unsigned },
            MYSQL_TYPE_LONG => MysqlType::Integer { bytes: 4, unsigned },
            MYSQL_TYPE_LONGLONG => MysqlType::Integer { bytes: 8, unsigned },
            MYSQL_TYPE_DECIMAL | MYSQL_TYPE_NEWDECIMAL => MysqlType::Decimal { decimals },
            MYSQL_TYPE_FLOAT => MysqlType::Float,
            MYSQL_TYPE_DOUBLE => MysqlType::Double,
            MYSQL_TYPE_BIT => MysqlType::Bit { length },
            MYSQL_TYPE_YEAR => MysqlType::Year,
            MYSQL_TYPE_DATE => MysqlType::Date,
            MYSQL_TYPE_TIME => MysqlType::Time,
            MYSQL_TYPE_DATETIME => MysqlType::DateTime,
            MYSQL_TYPE_TIMESTAMP => MysqlType::Timestamp,
            MYSQL_TYPE_ENUM => MysqlType::Enum,
            MYSQL_TYPE_SET => MysqlType::Set,
            MYSQL_TYPE_JSON => MysqlType::Json,
            MYSQL_TYPE_VECTOR => MysqlType::Vector { max_length: length },
            MYSQL_TYPE_GEOMETRY => MysqlType::Geometry,
            MYSQL_TYPE_NULL => MysqlType::Null,
            // VARCHAR, CHAR, the BLOB/TEXT family and anything newer
            _ if is_binary => MysqlType::Binary { max_length: length },
            _ => MysqlType::Text { max_length: length },
        }
    }

    /// Whether values of this type are numbers.
    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            MysqlType::Integer { .. }
                | MysqlType::Decimal { .. }
                | MysqlType::Float
                | MysqlType::Double
                | MysqlType::Year
        )
    }

    /// Whether values of this type are raw bytes rather than text.
    pub fn is_binary(&self) -> bool {
        matches!(
            self,
            MysqlType::Binary { .. }
                | MysqlType::Bit { .. }
                | MysqlType::Geometry
                | MysqlType::Vector { .. }
        )
    }
}
