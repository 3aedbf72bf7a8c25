//! The product listing procedure: connect, query, fetch, print, disconnect.

use std::io::Write;

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::connection::Connection;
use crate::error::Error;
use crate::protocol::connect::ConnectParams;
use crate::protocol::types::{MysqlValue, Row};

/// Query run when none is configured.
pub const DEFAULT_QUERY: &str = "SELECT * FROM product";

/// Everything the procedure needs to run.
#[derive(Debug, Clone)]
pub struct DriverConfig {
    /// Where and as whom to connect.
    pub params: ConnectParams,
    /// Query whose first two columns are printed.
    pub query: String,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            params: ConnectParams::default(),
            query: DEFAULT_QUERY.to_string(),
        }
    }
}

/// Failure of one step of the procedure.
#[derive(Error, Debug)]
pub enum DriverError {
    /// No client could be built from the configuration.
    #[error("MySQL client initialization failed: {0}")]
    Init(#[source] Error),

    /// Server unreachable or credentials rejected.
    #[error("Connection to {host}:{port} failed: {source}")]
    Connect {
        host: String,
        port: u16,
        #[source]
        source: Error,
    },

    /// Server rejected the query.
    #[error("Query failed: {0}")]
    Query(#[source] Error),

    /// Reading the result set failed.
    #[error("Storing the result set failed: {0}")]
    StoreResult(#[source] Error),

    /// Writing to the output failed.
    #[error("Writing output failed: {0}")]
    Output(#[from] std::io::Error),
}

static NULL: MysqlValue = MysqlValue::Null;

/// Format one row as `ID: <field0>, Name: <field1>`.
///
/// Missing fields print as `NULL`, like NULL values do. A C client passing a
/// NULL field to glibc `printf("%s")` would show `(null)` instead; this
/// listing always spells it `NULL`.
pub fn format_row(row: &Row) -> String {
    let field = |index: usize| row.get(index).unwrap_or(&NULL);
    format!("ID: {}, Name: {}", field(0), field(1))
}

/// Run the procedure once, writing the banner and rows to `out`.
///
/// The connection is closed on success and dropped on every error path.
pub async fn run<W: Write>(config: &DriverConfig, out: &mut W) -> Result<(), DriverError> {
    writeln!(out, "Hello.")?;

    let params = &config.params;
    params.validate().map_err(DriverError::Init)?;

    let mut conn = Connection::connect_with_params(params)
        .await
        .map_err(|source| DriverError::Connect {
            host: params.host.clone(),
            port: params.port,
            source,
        })?;
    info!(
        server_version = conn.server_version(),
        connection_id = conn.connection_id(),
        "connected"
    );

    let response = conn
        .send_query(&config.query)
        .await
        .map_err(DriverError::Query)?;
    let result = conn
        .store_result(response)
        .await
        .map_err(DriverError::StoreResult)?;
    debug!(rows = result.len(), "fetched result set");

    for row in &result {
        writeln!(out, "{}", format_row(row))?;
    }
    drop(result);

    if let Err(err) = conn.close().await {
        warn!(error = %err, "closing connection failed");
    }

    writeln!(out, "Done.")?;
    out.flush()?;
    Ok(())
}
