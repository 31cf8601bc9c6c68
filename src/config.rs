//! Configuration for the `cu-estimate` binary
//!
//! Loaded from a TOML file, with `.env` support. Every field has a default
//! so a partial (or missing) file is fine; command line flags override what
//! the file sets.

use anyhow::{bail, Context};
use serde::{Deserialize, Serialize};
use solana_sdk::commitment_config::{CommitmentConfig, CommitmentLevel};
use std::str::FromStr;

/// Main application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub rpc: RpcConfig,

    #[serde(default)]
    pub estimator: EstimatorConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcConfig {
    /// JSON-RPC endpoint used for simulation
    #[serde(default = "default_rpc_url")]
    pub url: String,

    /// `processed`, `confirmed` or `finalized`
    #[serde(default = "default_commitment")]
    pub commitment: String,

    /// Upper bound for one estimation; the request is cancelled after it
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EstimatorConfig {
    /// Minimum slot the node must have reached to serve the simulation
    #[serde(default)]
    pub min_context_slot: Option<u64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default)]
    pub verbose: bool,

    /// Emit JSON log lines instead of the human readable format
    #[serde(default)]
    pub json: bool,
}

// Default value functions
fn default_rpc_url() -> String {
    "https://api.mainnet-beta.solana.com".to_string()
}
fn default_commitment() -> String {
    "confirmed".to_string()
}
fn default_timeout_ms() -> u64 {
    10_000
}

impl Default for RpcConfig {
    fn default() -> Self {
        Self {
            url: default_rpc_url(),
            commitment: default_commitment(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

impl RpcConfig {
    /// Parsed commitment level
    pub fn commitment_config(&self) -> anyhow::Result<CommitmentConfig> {
        let commitment = CommitmentLevel::from_str(&self.commitment)
            .map_err(|_| anyhow::anyhow!("invalid commitment level '{}'", self.commitment))?;
        Ok(CommitmentConfig { commitment })
    }
}

impl Config {
    /// Load configuration from TOML file
    pub fn from_file(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path))?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration after loading `.env` into the environment
    pub fn from_file_with_env(path: &str) -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_file(path)
    }

    /// Reject values the estimator cannot work with
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.rpc.url.trim().is_empty() {
            bail!("rpc.url must not be empty");
        }
        if !(self.rpc.url.starts_with("http://") || self.rpc.url.starts_with("https://")) {
            bail!("rpc.url must be an http(s) URL, got '{}'", self.rpc.url);
        }
        if self.rpc.timeout_ms == 0 {
            bail!("rpc.timeout_ms must be greater than zero");
        }
        self.rpc.commitment_config()?;
        Ok(())
    }
}
