//! Response packet parsing: OK, ERR, EOF, column definitions and text rows.

use std::sync::Arc;

use bytes::Bytes;

use crate::error::{Error, Result};
use crate::protocol::buffer::ReadBuffer;
use crate::protocol::constants::*;
use crate::protocol::packet::Capabilities;
use crate::protocol::types::{ColumnInfo, ColumnMetadata, MysqlValue, Row};

/// Information from an OK packet.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct OkPacket {
    /// Rows changed by the statement.
    pub affected_rows: u64,
    /// AUTO_INCREMENT id generated by the statement.
    pub last_insert_id: u64,
    /// Server status flags.
    pub status_flags: u16,
    /// Number of warnings.
    pub warnings: u16,
    /// Human-readable info string.
    pub info: String,
}

impl OkPacket {
    /// Whether another result set follows this one.
    pub fn more_results(&self) -> bool {
        self.status_flags & SERVER_MORE_RESULTS_EXISTS != 0
    }
}

/// Information from a (pre-DEPRECATE_EOF) EOF packet.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct EofPacket {
    /// Number of warnings.
    pub warnings: u16,
    /// Server status flags.
    pub status_flags: u16,
}

/// First response to COM_QUERY.
#[derive(Debug)]
pub enum QueryResponse {
    /// Statement produced no result set.
    Ok(OkPacket),
    /// A result set with this many columns follows.
    ResultSet { column_count: u64 },
}

/// Parse an OK packet (header 0x00, or 0xFE when terminating a result set).
pub fn parse_ok(payload: Bytes, caps: &Capabilities) -> Result<OkPacket> {
    let mut buf = ReadBuffer::new(payload);
    let header = buf.read_u8()?;
    if header != OK_HEADER && header != EOF_HEADER {
        return Err(Error::UnexpectedPacket {
            expected: "OK packet",
            actual: header,
        });
    }

    let affected_rows = buf.read_lenenc_u64()?;
    let last_insert_id = buf.read_lenenc_u64()?;
    let (status_flags, warnings) = if caps.has(CLIENT_PROTOCOL_41) && buf.has_remaining(4) {
        (buf.read_u16_le()?, buf.read_u16_le()?)
    } else {
        (0, 0)
    };
    let info = buf.read_eof_str();

    Ok(OkPacket {
        affected_rows,
        last_insert_id,
        status_flags,
        warnings,
        info,
    })
}

/// Parse an ERR packet into `Error::Server`.
///
/// ERR packets sent before capability negotiation carry no SQL state.
/// A malformed ERR packet yields the parse error instead.
pub fn parse_err(payload: Bytes) -> Error {
    match read_err(&mut ReadBuffer::new(payload)) {
        Ok(err) | Err(err) => err,
    }
}

fn read_err(buf: &mut ReadBuffer) -> Result<Error> {
    let header = buf.read_u8()?;
    if header != ERR_HEADER {
        return Err(Error::UnexpectedPacket {
            expected: "ERR packet",
            actual: header,
        });
    }
    let code = buf.read_u16_le()?;
    let sql_state = if buf.remaining() >= 6 && buf.peek_u8()? == b'#' {
        buf.skip(1)?;
        String::from_utf8_lossy(&buf.read_bytes(5)?).into_owned()
    } else {
        "HY000".to_string()
    };
    let message = String::from_utf8_lossy(buf.as_slice()).into_owned();
    Ok(Error::server(code, sql_state, message))
}

/// Parse an EOF packet.
pub fn parse_eof(payload: Bytes) -> Result<EofPacket> {
    let mut buf = ReadBuffer::new(payload);
    let header = buf.read_u8()?;
    if header != EOF_HEADER {
        return Err(Error::UnexpectedPacket {
            expected: "EOF packet",
            actual: header,
        });
    }
    if buf.remaining() < 4 {
        return Ok(EofPacket::default());
    }
    Ok(EofPacket {
        warnings: buf.read_u16_le()?,
        status_flags: buf.read_u16_le()?,
    })
}

/// Classify the first packet of a COM_QUERY response.
pub fn parse_query_response(payload: Bytes, caps: &Capabilities) -> Result<QueryResponse> {
    match payload.first().copied() {
        Some(OK_HEADER) => Ok(QueryResponse::Ok(parse_ok(payload, caps)?)),
        Some(ERR_HEADER) => Err(parse_err(payload)),
        Some(LOCAL_INFILE_HEADER) => Err(Error::Unsupported {
            message: "LOAD DATA LOCAL INFILE".to_string(),
        }),
        Some(_) => {
            let mut buf = ReadBuffer::new(payload);
            let column_count = buf.read_lenenc_u64()?;
            if column_count == 0 {
                return Err(Error::protocol("Result set with zero columns"));
            }
            Ok(QueryResponse::ResultSet { column_count })
        }
        None => Err(Error::protocol("Empty query response packet")),
    }
}

/// Parse a Protocol::ColumnDefinition41 packet.
pub fn parse_column_definition(payload: Bytes) -> Result<ColumnMetadata> {
    let mut buf = ReadBuffer::new(payload);

    let _catalog = buf.read_lenenc_str()?;
    let schema = buf.read_lenenc_str()?;
    let table = buf.read_lenenc_str()?;
    let org_table = buf.read_lenenc_str()?;
    let name = buf.read_lenenc_str()?;
    let org_name = buf.read_lenenc_str()?;

    let fixed_len = buf.read_lenenc_u64()?;
    if fixed_len < 0x0C {
        return Err(Error::protocol(format!(
            "Column definition fixed block too short: {}",
            fixed_len
        )));
    }

    let charset = buf.read_u16_le()?;
    let column_length = buf.read_u32_le()?;
    let column_type = buf.read_u8()?;
    let flags = buf.read_u16_le()?;
    let decimals = buf.read_u8()?;

    Ok(ColumnMetadata {
        schema,
        table,
        org_table,
        name,
        org_name,
        charset,
        column_length,
        column_type,
        flags,
        decimals,
    })
}

/// Parse a text-protocol row.
///
/// The row must hold exactly one field per column.
pub fn parse_text_row(payload: Bytes, column_info: &Arc<ColumnInfo>) -> Result<Row> {
    let mut buf = ReadBuffer::new(payload);
    let mut values = Vec::with_capacity(column_info.len());

    for column in &column_info.columns {
        let raw = buf.read_lenenc_bytes()?;
        values.push(MysqlValue::from_field(
            raw.as_deref(),
            column.data_type.is_binary(),
        ));
    }

    if buf.remaining() > 0 {
        return Err(Error::protocol(format!(
            "Row has {} trailing bytes after {} columns",
            buf.remaining(),
            column_info.len()
        )));
    }

    Ok(Row::new(values, Arc::clone(column_info)))
}
