//! Connection lifecycle and query execution against SQL Server
//!
//! One persistent TDS connection is kept for the life of the process. It is
//! created lazily, probed with a no-op query before every use, and replaced
//! when the probe fails, which tolerates server-side idle disconnects
//! without a background keep-alive task.

use tiberius::{Client, ColumnData};
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio_util::compat::{Compat, TokioAsyncWriteCompatExt};
use tracing::{info, warn};

use crate::config::MssqlConfig;
use crate::error::DbError;
use crate::query::{self, StatementKind};

pub type MssqlClient = Client<Compat<TcpStream>>;

/// Hard cap on rows returned by table previews
pub const PREVIEW_ROW_LIMIT: usize = 100;

pub const LIST_TABLES_SQL: &str =
    "SELECT TABLE_NAME FROM INFORMATION_SCHEMA.TABLES WHERE TABLE_TYPE = 'BASE TABLE'";

// ============================================================================
// Result Types
// ============================================================================

/// Column names plus stringified rows
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowSet {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl RowSet {
    /// Header line followed by one comma-joined line per row
    pub fn render(&self) -> String {
        let mut lines = Vec::with_capacity(self.rows.len() + 1);
        lines.push(self.columns.join(","));
        for row in &self.rows {
            lines.push(row.join(","));
        }
        lines.join("\n")
    }
}

/// Result of executing one statement
#[derive(Debug)]
pub enum QueryOutcome {
    Rows(RowSet),
    RowsAffected(u64),
}

// ============================================================================
// Connection Manager
// ============================================================================

/// Owns the single process-wide database handle
///
/// Callers borrow the client through [`acquire`](Self::acquire) and hand it
/// back with [`release`](Self::release); they never close it. The mutex
/// serializes the checkout/putback cycle, which keeps the at-most-one-live-
/// handle invariant under the one-request-at-a-time dispatch model.
pub struct ConnectionManager {
    slot: Mutex<Option<MssqlClient>>,
}

impl ConnectionManager {
    pub fn new() -> Self {
        Self {
            slot: Mutex::new(None),
        }
    }

    /// Hand out a live client, reconnecting if the cached one went stale
    ///
    /// The descriptor is rebuilt from the environment on every call, so
    /// configuration changes apply on the next reconnect. A failed open is
    /// terminal for the current request only; the next acquire retries.
    pub async fn acquire(&self) -> Result<MssqlClient, DbError> {
        let config = MssqlConfig::from_env();
        let mut slot = self.slot.lock().await;
        match slot.take() {
            Some(mut client) => match probe(&mut client).await {
                Ok(()) => Ok(client),
                Err(e) => {
                    warn!("Connection lost ({e}), reconnecting...");
                    // Best-effort close of the stale handle
                    let _ = client.close().await;
                    open(&config).await
                }
            },
            None => {
                info!("Initializing new persistent connection...");
                open(&config).await
            }
        }
    }

    /// Put a client back so the next request can reuse it
    pub async fn release(&self, client: MssqlClient) {
        *self.slot.lock().await = Some(client);
    }
}

impl Default for ConnectionManager {
    fn default() -> Self {
        Self::new()
    }
}

/// Cheap liveness check; any failure means the handle is stale
async fn probe(client: &mut MssqlClient) -> Result<(), DbError> {
    let stream = client
        .simple_query("SELECT 1")
        .await
        .map_err(connection_err)?;
    stream.into_results().await.map_err(connection_err)?;
    Ok(())
}

async fn open(config: &MssqlConfig) -> Result<MssqlClient, DbError> {
    let client_config = config.to_client_config()?;
    let tcp = TcpStream::connect(client_config.get_addr())
        .await
        .map_err(|e| {
            DbError::Connection(format!(
                "failed to reach {},{}: {e}",
                config.server, config.port
            ))
        })?;
    tcp.set_nodelay(true).ok();

    Client::connect(client_config, tcp.compat_write())
        .await
        .map_err(connection_err)
}

// ============================================================================
// Query Executor
// ============================================================================

/// Executes statements over the shared connection
pub struct QueryExecutor {
    manager: ConnectionManager,
}

impl QueryExecutor {
    pub fn new() -> Self {
        Self {
            manager: ConnectionManager::new(),
        }
    }

    /// Run one statement
    ///
    /// Read-only statements fetch all rows; everything else runs under
    /// auto-commit and reports the engine's affected-row total.
    pub async fn execute(&self, sql: &str) -> Result<QueryOutcome, DbError> {
        let mut client = self.manager.acquire().await?;
        let outcome = match query::classify(sql) {
            StatementKind::ReadOnly => fetch_rows(&mut client, sql).await.map(QueryOutcome::Rows),
            StatementKind::Mutating => run_statement(&mut client, sql)
                .await
                .map(QueryOutcome::RowsAffected),
        };
        self.manager.release(client).await;
        outcome
    }

    /// Names of the base tables in the current database
    pub async fn list_tables(&self) -> Result<Vec<String>, DbError> {
        let mut client = self.manager.acquire().await?;
        let result = fetch_rows(&mut client, LIST_TABLES_SQL).await;
        self.manager.release(client).await;
        let row_set = result?;
        Ok(row_set
            .rows
            .into_iter()
            .filter_map(|row| row.into_iter().next())
            .collect())
    }

    /// First rows of a table, capped at [`PREVIEW_ROW_LIMIT`]
    ///
    /// The table name is validated and bracket-quoted before it is
    /// interpolated into the generated SELECT.
    pub async fn preview_table(&self, table: &str) -> Result<RowSet, DbError> {
        let safe_table = query::sanitize_table_name(table)?;
        let sql = format!("SELECT TOP {PREVIEW_ROW_LIMIT} * FROM {safe_table}");
        let mut client = self.manager.acquire().await?;
        let result = fetch_rows(&mut client, &sql).await;
        self.manager.release(client).await;
        result
    }
}

impl Default for QueryExecutor {
    fn default() -> Self {
        Self::new()
    }
}

async fn fetch_rows(client: &mut MssqlClient, sql: &str) -> Result<RowSet, DbError> {
    let mut stream = client.simple_query(sql).await.map_err(execution_err)?;
    let columns: Vec<String> = stream
        .columns()
        .await
        .map_err(execution_err)?
        .map(|cols| cols.iter().map(|c| c.name().to_string()).collect())
        .unwrap_or_default();

    let rows = stream.into_first_result().await.map_err(execution_err)?;
    let rows = rows.iter().map(render_row).collect();

    Ok(RowSet { columns, rows })
}

async fn run_statement(client: &mut MssqlClient, sql: &str) -> Result<u64, DbError> {
    let result = client.execute(sql, &[]).await.map_err(execution_err)?;
    Ok(result.total())
}

fn connection_err(e: tiberius::error::Error) -> DbError {
    DbError::Connection(e.to_string())
}

fn execution_err(e: tiberius::error::Error) -> DbError {
    DbError::Execution(e.to_string())
}

// ============================================================================
// Cell Stringification
// ============================================================================

fn render_row(row: &tiberius::Row) -> Vec<String> {
    row.cells()
        .enumerate()
        .map(|(i, (_col, data))| render_cell(row, i, data))
        .collect()
}

const NULL_CELL: &str = "NULL";

/// Stringify one cell for the comma-joined text representation
fn render_cell(row: &tiberius::Row, idx: usize, data: &ColumnData<'_>) -> String {
    match data {
        ColumnData::Bit(Some(b)) => b.to_string(),
        ColumnData::U8(Some(v)) => v.to_string(),
        ColumnData::I16(Some(v)) => v.to_string(),
        ColumnData::I32(Some(v)) => v.to_string(),
        ColumnData::I64(Some(v)) => v.to_string(),
        ColumnData::F32(Some(v)) => v.to_string(),
        ColumnData::F64(Some(v)) => v.to_string(),
        ColumnData::Numeric(Some(n)) => {
            let value = n.value() as f64 / 10f64.powi(n.scale() as i32);
            value.to_string()
        }
        ColumnData::String(Some(s)) => s.to_string(),
        ColumnData::Guid(Some(g)) => g.to_string(),
        ColumnData::Xml(Some(xml)) => xml.to_string(),
        ColumnData::Binary(Some(b)) => format!("<{} bytes>", b.len()),
        // Date/time types go through chrono via typed getters
        ColumnData::DateTime(Some(_))
        | ColumnData::SmallDateTime(Some(_))
        | ColumnData::DateTime2(Some(_)) => row
            .try_get::<chrono::NaiveDateTime, _>(idx)
            .ok()
            .flatten()
            .map(|dt| dt.format("%Y-%m-%d %H:%M:%S%.f").to_string())
            .unwrap_or_else(|| NULL_CELL.to_string()),
        ColumnData::DateTimeOffset(Some(_)) => row
            .try_get::<chrono::DateTime<chrono::Utc>, _>(idx)
            .ok()
            .flatten()
            .map(|dt| dt.to_rfc3339())
            .unwrap_or_else(|| NULL_CELL.to_string()),
        ColumnData::Date(Some(_)) => row
            .try_get::<chrono::NaiveDate, _>(idx)
            .ok()
            .flatten()
            .map(|d| d.format("%Y-%m-%d").to_string())
            .unwrap_or_else(|| NULL_CELL.to_string()),
        ColumnData::Time(Some(_)) => row
            .try_get::<chrono::NaiveTime, _>(idx)
            .ok()
            .flatten()
            .map(|t| t.format("%H:%M:%S%.f").to_string())
            .unwrap_or_else(|| NULL_CELL.to_string()),
        // All None variants
        _ => NULL_CELL.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_set_render() {
        let row_set = RowSet {
            columns: vec!["Id".to_string(), "Name".to_string()],
            rows: vec![
                vec!["1".to_string(), "Alice".to_string()],
                vec!["2".to_string(), "Bob".to_string()],
            ],
        };
        assert_eq!(row_set.render(), "Id,Name\n1,Alice\n2,Bob");
    }

    #[test]
    fn test_row_set_render_empty_result() {
        let row_set = RowSet {
            columns: vec!["Id".to_string()],
            rows: vec![],
        };
        assert_eq!(row_set.render(), "Id");
    }

    #[test]
    fn test_preview_sql_uses_top_cap() {
        // Generated preview statements must carry the fixed row cap
        let sql = format!(
            "SELECT TOP {PREVIEW_ROW_LIMIT} * FROM {}",
            crate::query::sanitize_table_name("Orders").unwrap()
        );
        assert_eq!(sql, "SELECT TOP 100 * FROM [Orders]");
    }
}
