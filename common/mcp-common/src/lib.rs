//! MCP Common - Shared plumbing for MCP servers
//!
//! This crate provides the pieces every MCP server in this workspace needs:
//!
//! - **Initialization**: `serve_stdio!` macro for standardized server startup
//! - **Results**: Helpers for creating `CallToolResult` responses
//! - **Errors**: Conversion of domain errors into MCP-compatible errors
//!
//! # Example
//!
//! ```rust,ignore
//! use mcp_common::{serve_stdio, text_success};
//!
//! // In main.rs - replaces ~30 lines of boilerplate
//! serve_stdio!(MyServer, "my-mcp");
//!
//! // In tool implementations
//! fn my_tool(&self) -> Result<CallToolResult, McpError> {
//!     Ok(text_success("done"))
//! }
//! ```

pub mod error;
pub mod init;
pub mod result;

// Re-export commonly used items at crate root
pub use error::{internal_error, invalid_params, IntoMcpError, McpResult, ResultExt};
pub use init::init_tracing;
pub use result::text_success;

// Re-export the rmcp error type every handler signature needs
pub use rmcp::ErrorData as McpError;
