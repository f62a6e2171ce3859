//! Result helpers for MCP tool responses

use rmcp::model::{CallToolResult, Content};

/// Create a successful plain text response
///
/// The database servers in this workspace speak text: query results,
/// affected-row messages, and caught execution errors all come back as a
/// single text content item.
///
/// # Example
///
/// ```rust,ignore
/// use mcp_common::text_success;
///
/// fn my_tool(&self) -> Result<CallToolResult, McpError> {
///     Ok(text_success("Query executed successfully. Rows affected: 1"))
/// }
/// ```
pub fn text_success(text: impl Into<String>) -> CallToolResult {
    CallToolResult::success(vec![Content::text(text.into())])
}
