//! CLI command definitions and handlers

use std::sync::Arc;

use clap::{Parser, Subcommand};

pub mod check;
pub mod serve;

use crate::client::{EncodingClient, OmdbClient};
use crate::config::{Config, ConfigArgs};
use crate::error::Result;
use crate::mcp::ToolContext;

/// encoding-devops - MCP bridge for the encoding service and OMDb
#[derive(Parser)]
#[command(name = "encoding-devops")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to execute (defaults to `serve`)
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Enable debug logging
    #[arg(long, global = true, env = "ENCODING_DEVOPS_DEBUG", hide_env = true)]
    pub debug: bool,

    #[command(flatten)]
    pub config: ConfigArgs,
}

/// Available CLI commands
#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Commands {
    /// Run the MCP server on stdio
    Serve,

    /// Authenticate once and report the cluster load
    Check,

    /// Display version information
    Version,
}

/// Both upstream clients, built from validated configuration
pub struct Upstreams {
    pub encoding: Arc<EncodingClient>,
    pub omdb: Arc<OmdbClient>,
}

impl Upstreams {
    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self {
            encoding: Arc::new(EncodingClient::new(
                &config.api_url,
                config.credentials.clone(),
                config.auth_contract,
            )?),
            omdb: Arc::new(OmdbClient::new(
                &config.omdb_api_url,
                config.omdb_api_key.clone(),
            )?),
        })
    }

    pub fn open(&self) -> Result<()> {
        self.encoding.open()?;
        self.omdb.open()
    }

    pub fn close(&self) {
        self.encoding.close();
        self.omdb.close();
    }

    /// Handles for the tool layer
    pub fn tool_context(&self) -> ToolContext {
        ToolContext {
            encoding: self.encoding.clone(),
            movies: self.omdb.clone(),
        }
    }
}
