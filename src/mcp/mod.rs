//! Model Context Protocol surface: tools, prompts and the stdio server

pub mod prompts;
pub mod protocol;
pub mod server;
pub mod tools;

pub use server::McpServer;
pub use tools::{ToolContext, ToolRegistry};
