//! Error handling utilities for MCP servers
//!
//! Provides traits and helpers for converting domain errors into the
//! wire-level MCP error type.

use rmcp::ErrorData as McpError;

/// Type alias for MCP handler results
pub type McpResult<T> = Result<T, McpError>;

/// Trait for converting errors into MCP-compatible errors
///
/// Server crates implement this for their domain error types so handler
/// code can use the `?` operator via [`ResultExt::to_mcp_err`].
///
/// # Example
///
/// ```rust,ignore
/// use mcp_common::IntoMcpError;
/// use rmcp::ErrorData as McpError;
///
/// impl IntoMcpError for MyError {
///     fn into_mcp_error(self) -> McpError {
///         McpError::internal_error(self.to_string(), None)
///     }
/// }
/// ```
pub trait IntoMcpError {
    /// Convert this error into an MCP error
    fn into_mcp_error(self) -> McpError;
}

impl IntoMcpError for anyhow::Error {
    fn into_mcp_error(self) -> McpError {
        McpError::internal_error(self.to_string(), None)
    }
}

/// Extension trait for Result types to convert to MCP errors
///
/// # Example
///
/// ```rust,ignore
/// use mcp_common::ResultExt;
///
/// async fn read_resource(&self, uri: &str) -> Result<String, McpError> {
///     let data = self.store.fetch(uri).await.to_mcp_err()?;
///     // ...
/// }
/// ```
pub trait ResultExt<T> {
    /// Convert the error to an MCP error
    fn to_mcp_err(self) -> Result<T, McpError>;
}

impl<T, E: IntoMcpError> ResultExt<T> for Result<T, E> {
    fn to_mcp_err(self) -> Result<T, McpError> {
        self.map_err(|e| e.into_mcp_error())
    }
}

/// Create an internal error with a message
pub fn internal_error(message: impl Into<String>) -> McpError {
    McpError::internal_error(message.into(), None)
}

/// Create an invalid params error with a message
///
/// Use this when a handler receives arguments it cannot work with.
pub fn invalid_params(message: impl Into<String>) -> McpError {
    McpError::invalid_params(message.into(), None)
}
