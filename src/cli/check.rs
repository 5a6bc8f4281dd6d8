//! Check command implementation

use colored::Colorize;

use crate::cli::Upstreams;
use crate::client::EncodingApi;
use crate::config::{Config, ConfigArgs};
use crate::error::Result;

/// Authenticate once against the encoding API and report the cluster load
pub async fn run(args: &ConfigArgs) -> Result<()> {
    let config = Config::from_args(args)?;
    let upstreams = Upstreams::from_config(&config)?;
    upstreams.open()?;

    println!("{}\n", "Encoding DevOps Status".bold());
    println!("Encoding API: {}", config.api_url.cyan());
    println!("Identity: {}", config.credentials.identifier());
    println!(
        "Auth contract: {:?}",
        upstreams.encoding.tokens().contract()
    );

    let result = report(&upstreams).await;
    upstreams.close();
    result?;

    if config.omdb_api_key.is_some() {
        println!("{} OMDb API key configured", "✓".green());
    } else {
        println!("{} OMDb API key not configured", "○".dimmed());
        println!("  → Set OMDB_API_KEY to enable the movie tools");
    }

    Ok(())
}

async fn report(upstreams: &Upstreams) -> Result<()> {
    let encoding = &upstreams.encoding;

    println!("\n{}", "Authenticating...".cyan());
    encoding.tokens().ensure_valid(encoding.session()).await?;
    if let Some(token) = encoding.tokens().current().await {
        println!(
            "{} Authenticated (token expires {})",
            "✓".green(),
            token.expires_at.format("%Y-%m-%d %H:%M:%S UTC")
        );
    }

    let count = encoding.get_inprogress_jobs_count().await?;
    if count > 0 {
        println!("{} Cluster busy: {} jobs in progress", "●".yellow(), count);
    } else {
        println!("{} Cluster idle", "✓".green());
    }

    Ok(())
}
