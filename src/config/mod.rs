//! Configuration management for the bridge
//!
//! Every setting comes from a CLI flag or, failing that, its environment
//! variable. Missing required values are collected and reported together.

use std::fmt;
use std::path::Path;

use clap::Args;

use crate::client::{AuthContract, Credentials, OMDB_API_URL};
use crate::error::{ConfigError, Result};

/// Optional dotenv file in the working directory
pub const ENV_FILE: &str = ".env";

/// Load [`ENV_FILE`] into the process environment if it exists.
///
/// Variables already set in the environment win. Returns whether a file was
/// loaded.
pub fn load_env_file() -> std::result::Result<bool, dotenvy::Error> {
    let path = Path::new(ENV_FILE);
    if !path.is_file() {
        return Ok(false);
    }
    dotenvy::from_path(path)?;
    Ok(true)
}

/// Raw configuration as parsed by clap
#[derive(Args, Clone, Default)]
pub struct ConfigArgs {
    /// Encoding API base URL
    #[arg(long, global = true, env = "ENCODING_API_URL", hide_env_values = true)]
    pub api_url: Option<String>,

    /// Identifier (email) used for the credential exchange
    #[arg(long, global = true, env = "ENCODING_CLIENT_ID", hide_env_values = true)]
    pub client_id: Option<String>,

    /// Secret (password) used for the credential exchange
    #[arg(long, global = true, env = "ENCODING_CLIENT_SECRET", hide_env_values = true)]
    pub client_secret: Option<String>,

    /// Response shape of the credential exchange
    #[arg(long, global = true, env = "ENCODING_AUTH_CONTRACT", value_enum)]
    pub auth_contract: Option<AuthContract>,

    /// OMDb API key; movie tools report an error without it
    #[arg(long, global = true, env = "OMDB_API_KEY", hide_env_values = true)]
    pub omdb_api_key: Option<String>,

    /// OMDb base URL
    #[arg(long, global = true, env = "OMDB_API_URL")]
    pub omdb_api_url: Option<String>,
}

/// Validated configuration
#[derive(Clone)]
pub struct Config {
    pub api_url: String,
    pub credentials: Credentials,
    pub auth_contract: AuthContract,
    pub omdb_api_key: Option<String>,
    pub omdb_api_url: String,
}

/// Treat unset and blank values alike
fn present(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

impl Config {
    /// Validate raw arguments. Fails with every missing variable named.
    pub fn from_args(args: &ConfigArgs) -> Result<Self> {
        let api_url = present(&args.api_url);
        let client_id = present(&args.client_id);
        let client_secret = present(&args.client_secret);

        let missing: Vec<String> = [
            ("ENCODING_API_URL", api_url.is_none()),
            ("ENCODING_CLIENT_ID", client_id.is_none()),
            ("ENCODING_CLIENT_SECRET", client_secret.is_none()),
        ]
        .into_iter()
        .filter(|(_, is_missing)| *is_missing)
        .map(|(name, _)| name.to_string())
        .collect();

        let (Some(api_url), Some(client_id), Some(client_secret)) =
            (api_url, client_id, client_secret)
        else {
            return Err(ConfigError::MissingVariables(missing).into());
        };

        let omdb_api_key = present(&args.omdb_api_key);
        if omdb_api_key.is_none() {
            log::warn!("OMDB_API_KEY not set; movie tools will return errors");
        }

        Ok(Self {
            api_url,
            credentials: Credentials::new(client_id, client_secret),
            auth_contract: args.auth_contract.unwrap_or_default(),
            omdb_api_key,
            omdb_api_url: present(&args.omdb_api_url).unwrap_or_else(|| OMDB_API_URL.to_string()),
        })
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("api_url", &self.api_url)
            .field("credentials", &self.credentials)
            .field("auth_contract", &self.auth_contract)
            .field("omdb_api_key", &self.omdb_api_key.as_ref().map(|_| "<redacted>"))
            .field("omdb_api_url", &self.omdb_api_url)
            .finish()
    }
}
