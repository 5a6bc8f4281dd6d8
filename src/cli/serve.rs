//! Serve command implementation

use crate::cli::Upstreams;
use crate::config::{Config, ConfigArgs};
use crate::error::Result;
use crate::mcp::{McpServer, ToolRegistry};

/// Run the MCP server on stdio until the client closes its input
pub async fn run(args: &ConfigArgs) -> Result<()> {
    let config = Config::from_args(args)?;
    log::debug!("Loaded {:?}", config);

    let upstreams = Upstreams::from_config(&config)?;
    upstreams.open()?;

    let registry = ToolRegistry::builtin()?;
    log::info!(
        "Serving {} tools for {} on stdio",
        registry.names().count(),
        config.api_url
    );

    let server = McpServer::new(registry, upstreams.tool_context());
    let served = server.serve_stdio().await;

    upstreams.close();
    served
}
