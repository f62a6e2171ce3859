//! MSSQL MCP Server
//!
//! Exposes a Microsoft SQL Server database over MCP: tables as resources,
//! arbitrary SQL via a configurable tool. Connection settings come from
//! `MSSQL_*` environment variables.

use mssql_mcp::MssqlMcpServer;

mcp_common::serve_stdio!(MssqlMcpServer, "mssql_mcp");
