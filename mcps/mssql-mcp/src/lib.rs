//! MSSQL MCP Library
//!
//! Exposes a Microsoft SQL Server database over the Model Context Protocol:
//! base tables are published as resources, and a single configurable tool
//! executes arbitrary SQL. One persistent connection is kept for the life of
//! the process and re-validated before every use.
//!
//! # Usage as Library
//!
//! ```rust,ignore
//! use mssql_mcp::MssqlMcpServer;
//!
//! let server = MssqlMcpServer::new();
//! // Serve via stdio or drive the handler directly
//! ```

pub mod config;
pub mod db;
pub mod error;
pub mod query;
pub mod server;

// Re-export main server type
pub use server::MssqlMcpServer;

// Re-export parameter type for direct API usage
pub use server::QueryParams;
