//! Configuration management

use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub chain: ChainConfig,
    pub signed_api: SignedApiConfig,
    pub feed: FeedConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ChainConfig {
    /// JSON-RPC endpoint for the chain hosting the registries
    pub rpc_url: String,
    /// Api3ServerV1 contract address (hex)
    pub api3_server_v1: String,
    /// AirseekerRegistry contract address (hex)
    pub airseeker_registry: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SignedApiConfig {
    /// Base URL of the public OEV signed API
    pub base_url: String,
    /// Per-request timeout in seconds
    pub fetch_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FeedConfig {
    /// dAPI name to read when none is given on the command line
    pub dapi_name: String,
}

impl Config {
    /// Load configuration from file, layered with DAPI_* environment variables
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let Some(path) = path.as_ref().to_str() else {
            anyhow::bail!("config path is not valid UTF-8");
        };
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path))
            .add_source(config::Environment::with_prefix("DAPI"))
            .build()?;

        let config: Config = settings.try_deserialize()?;
        Ok(config)
    }

    /// Load from default locations, falling back to built-in defaults
    pub fn load_default() -> anyhow::Result<Self> {
        let paths = ["config.toml", "~/.config/dapi-aggregator/config.toml"];

        for path in paths {
            let expanded = shellexpand::tilde(path);
            if Path::new(expanded.as_ref()).exists() {
                return Self::load(expanded.as_ref());
            }
        }

        Ok(Self::default())
    }
}

impl SignedApiConfig {
    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }
}

// Defaults are the Arbitrum One deployments.
impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            rpc_url: "https://arb1.arbitrum.io/rpc".to_string(),
            api3_server_v1: "0x709944a48cAf83535e43471680fDA4905FB3920a".to_string(),
            airseeker_registry: "0x7B42df2563E128Ae3F68e2CFB1904808F61C8F12".to_string(),
        }
    }
}

impl Default for SignedApiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://signed-api.api3.org/public-oev".to_string(),
            fetch_timeout_secs: 5,
        }
    }
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            dapi_name: "ETH/USD".to_string(),
        }
    }
}
