//! MCP surface: tables as resources, one tool for SQL execution

use std::sync::Arc;

use mcp_common::{invalid_params, text_success, IntoMcpError, McpError};
use rmcp::model::{
    AnnotateAble, CallToolRequestParam, CallToolResult, JsonObject, ListResourcesResult,
    ListToolsResult,
    PaginatedRequestParam, RawResource, ReadResourceRequestParam, ReadResourceResult, Resource,
    ResourceContents, ServerCapabilities, ServerInfo, Tool,
};
use rmcp::service::RequestContext;
use rmcp::{RoleServer, ServerHandler};
use schemars::JsonSchema;
use serde::Deserialize;
use tracing::{error, info};

use crate::config::{self, MssqlConfig};
use crate::db::{QueryExecutor, QueryOutcome};
use crate::error::DbError;

/// URI scheme under which tables are published as resources
const RESOURCE_SCHEME: &str = "mssql://";

/// Arguments accepted by the SQL execution tool
#[derive(Debug, Deserialize, JsonSchema)]
pub struct QueryParams {
    /// The SQL query to execute
    pub query: String,
}

/// The MSSQL MCP Server
#[derive(Clone)]
pub struct MssqlMcpServer {
    executor: Arc<QueryExecutor>,
}

impl MssqlMcpServer {
    /// Create a new server; the database connection is opened lazily on
    /// the first request that needs it.
    pub fn new() -> Self {
        let config = MssqlConfig::from_env();
        info!("Database connection string: {}", config.redacted_summary());

        Self {
            executor: Arc::new(QueryExecutor::new()),
        }
    }

    /// Execute a statement and fold every outcome, including failures,
    /// into a plain-text tool result. The dispatch layer never sees an
    /// exception from this path.
    async fn run_query(&self, sql: &str) -> CallToolResult {
        match self.executor.execute(sql).await {
            Ok(outcome) => text_success(format_outcome(sql, outcome)),
            Err(e) => {
                error!("Error executing SQL '{sql}': {e}");
                text_success(format!("Error executing query: {e}"))
            }
        }
    }
}

impl Default for MssqlMcpServer {
    fn default() -> Self {
        Self::new()
    }
}

impl ServerHandler for MssqlMcpServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            instructions: Some(format!(
                "Microsoft SQL Server MCP server. Tables are published as mssql:// \
                 resources; use the {} tool to run SQL. SELECT statements return \
                 comma-joined rows, anything else reports the affected-row count.",
                config::tool_name()
            )),
            capabilities: ServerCapabilities::builder()
                .enable_tools()
                .enable_resources()
                .build(),
            ..Default::default()
        }
    }

    async fn list_resources(
        &self,
        _request: Option<PaginatedRequestParam>,
        _: RequestContext<RoleServer>,
    ) -> Result<ListResourcesResult, McpError> {
        let resources = match self.executor.list_tables().await {
            Ok(tables) => {
                info!("Found {} tables", tables.len());
                tables.into_iter().map(table_resource).collect()
            }
            Err(e) => {
                // Discovery degrades to an empty listing instead of failing
                error!("Failed to list resources: {e}");
                Vec::new()
            }
        };
        Ok(ListResourcesResult {
            meta: None,
            resources,
            next_cursor: None,
        })
    }

    async fn read_resource(
        &self,
        ReadResourceRequestParam { uri }: ReadResourceRequestParam,
        _: RequestContext<RoleServer>,
    ) -> Result<ReadResourceResult, McpError> {
        info!("Reading resource: {uri}");
        let table = parse_resource_uri(&uri)?;

        let row_set = self
            .executor
            .preview_table(table)
            .await
            .inspect_err(|e| error!("Database error reading resource {uri}: {e}"))
            .map_err(DbError::into_mcp_error)?;

        Ok(ReadResourceResult {
            contents: vec![ResourceContents::text(row_set.render(), uri)],
        })
    }

    async fn list_tools(
        &self,
        _request: Option<PaginatedRequestParam>,
        _: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, McpError> {
        info!("Listing tools...");
        Ok(ListToolsResult {
            meta: None,
            tools: vec![sql_tool(&config::tool_name())],
            next_cursor: None,
        })
    }

    async fn call_tool(
        &self,
        request: CallToolRequestParam,
        _: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, McpError> {
        info!("Calling tool: {}", request.name);

        let tool = config::tool_name();
        if request.name.as_ref() != tool.as_str() {
            return Err(invalid_params(format!("Unknown tool: {}", request.name)));
        }

        let params = parse_query_params(request.arguments)?;
        Ok(self.run_query(&params.query).await)
    }
}

/// Render a successful query outcome as the tool's text payload
///
/// SELECTs against the schema catalog get the simplified `Tables_found`
/// listing; other row sets render as comma-joined lines; mutations report
/// the affected-row count.
fn format_outcome(sql: &str, outcome: QueryOutcome) -> String {
    match outcome {
        QueryOutcome::Rows(row_set) if is_table_listing(sql) => {
            let mut lines = vec!["Tables_found".to_string()];
            lines.extend(
                row_set
                    .rows
                    .into_iter()
                    .filter_map(|row| row.into_iter().next()),
            );
            lines.join("\n")
        }
        QueryOutcome::Rows(row_set) => row_set.render(),
        QueryOutcome::RowsAffected(count) => {
            format!("Query executed successfully. Rows affected: {count}")
        }
    }
}

fn is_table_listing(sql: &str) -> bool {
    sql.to_uppercase().contains("INFORMATION_SCHEMA.TABLES")
}

fn parse_query_params(arguments: Option<JsonObject>) -> Result<QueryParams, McpError> {
    let args = arguments.unwrap_or_default();
    let params: QueryParams = serde_json::from_value(serde_json::Value::Object(args))
        .map_err(|e| invalid_params(format!("Invalid arguments: {e}")))?;
    if params.query.trim().is_empty() {
        return Err(invalid_params("Query is required"));
    }
    Ok(params)
}

fn parse_resource_uri(uri: &str) -> Result<&str, McpError> {
    let rest = uri
        .strip_prefix(RESOURCE_SCHEME)
        .ok_or_else(|| invalid_params(format!("Invalid URI scheme: {uri}")))?;
    Ok(rest.split('/').next().unwrap_or(rest))
}

fn table_resource(table: String) -> Resource {
    let mut resource = RawResource::new(
        format!("{RESOURCE_SCHEME}{table}/data"),
        format!("Table: {table}"),
    );
    resource.description = Some(format!("Data in table: {table}"));
    resource.mime_type = Some("text/plain".to_string());
    resource.no_annotation()
}

fn sql_tool(name: &str) -> Tool {
    let schema = schemars::schema_for!(QueryParams);
    let input_schema: JsonObject = serde_json::to_value(schema)
        .ok()
        .and_then(|v| v.as_object().cloned())
        .unwrap_or_default();
    Tool::new(
        name.to_string(),
        "Execute an SQL query on the SQL Server",
        Arc::new(input_schema),
    )
}
