//! encoding-devops - MCP bridge for the encoding service and OMDb

use clap::Parser;

mod cache;
mod cli;
mod client;
mod config;
mod error;
mod mcp;

use cli::{Cli, Commands};
use error::Result;

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("Error: {}", err);
        std::process::exit(1);
    }
}

/// Logs go to stderr; stdout carries the protocol stream
fn init_logging(debug: bool) {
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    if debug {
        builder.filter_level(log::LevelFilter::Debug);
    }
    builder.target(env_logger::Target::Stderr).init();
}

async fn run() -> Result<()> {
    // Must run before clap reads environment fallbacks
    let env_file = config::load_env_file();

    let cli = Cli::parse();
    init_logging(cli.debug);

    match env_file {
        Ok(true) => log::info!("Loaded environment from {} file", config::ENV_FILE),
        Ok(false) => log::warn!(
            "No {} file found, using system environment variables",
            config::ENV_FILE
        ),
        Err(err) => log::warn!("Ignoring unreadable {} file: {}", config::ENV_FILE, err),
    }

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => cli::serve::run(&cli.config).await,
        Commands::Check => cli::check::run(&cli.config).await,
        Commands::Version => {
            println!("encoding-devops version {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}
