// MCP (Model Context Protocol) server exposing the fetch and Wikipedia tools

pub mod protocol;
pub mod server;
pub mod tools;

pub use server::McpServer;
pub use tools::{build_registry, ToolRegistry, ToolServices};
