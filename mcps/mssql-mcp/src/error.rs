//! Error taxonomy for the MSSQL server

use mcp_common::{IntoMcpError, McpError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DbError {
    /// Required settings are missing or unusable. Raised before any
    /// network I/O happens.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The database handle could not be opened or replaced.
    #[error("Connection error: {0}")]
    Connection(String),

    /// A caller-supplied table name failed validation. The engine is
    /// never contacted for these.
    #[error("Invalid table name: {0}")]
    InvalidIdentifier(String),

    /// The engine rejected or aborted a statement.
    #[error("{0}")]
    Execution(String),
}

/// Conversion used on the resource paths. The tool path never converts:
/// execution failures there are returned as plain text instead.
impl IntoMcpError for DbError {
    fn into_mcp_error(self) -> McpError {
        match self {
            e @ DbError::InvalidIdentifier(_) => McpError::invalid_params(e.to_string(), None),
            e => McpError::internal_error(format!("Database error: {e}"), None),
        }
    }
}
