// Configuration is read from the environment (and a `.env` file if present):
// - Database connection string
// - Deployment marker: deploy address, policy id, delegation script hash, network
// - UTXO filter options
// - Cache refresh period and worker pool sizing

use dotenv::dotenv;
use std::env;
use std::time::Duration;
use thiserror::Error;

use crate::blockchain::address::{AddressError, Credential};

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for {name}: {value}")]
    Invalid { name: &'static str, value: String },

    #[error("Invalid SCRIPT_DELEGATION_HASH: {0}")]
    DelegationHash(#[from] AddressError),
}

/// Settings that identify deployment outputs and shape derived addresses.
#[derive(Debug, Clone)]
pub struct DeploymentConfig {
    pub script_deploy_address: String,
    pub policy_id: String,
    pub delegation_credential: Credential,
    pub is_mainnet: bool,
}

impl DeploymentConfig {
    pub fn new(
        script_deploy_address: impl Into<String>,
        policy_id: impl Into<String>,
        script_delegation_hash: &str,
        is_mainnet: bool,
    ) -> Result<Self, ConfigError> {
        Ok(Self {
            script_deploy_address: script_deploy_address.into(),
            policy_id: policy_id.into(),
            delegation_credential: Credential::from_script_hash_hex(script_delegation_hash)?,
            is_mainnet,
        })
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub deployment: DeploymentConfig,
    pub filter_utxo_by_policy: bool,
    /// `None` disables the periodic reload.
    pub cache_refresh_interval: Option<Duration>,
    pub worker_count: usize,
    pub event_channel_capacity: usize,
    pub store_retry_attempts: usize,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv().ok();

        let database_url = env::var("DATABASE_URL").unwrap_or_else(|_| "sqlite:data.db".to_string());

        let deployment = DeploymentConfig::new(
            required("SCRIPT_DEPLOY_ADDRESS")?,
            required("POLICY_ID")?,
            &required("SCRIPT_DELEGATION_HASH")?,
            parsed("IS_MAINNET", false)?,
        )?;

        let filter_utxo_by_policy = parsed("FILTER_UTXO_BY_POLICY", false)?;
        let cache_refresh_interval = match parsed::<u64>("CACHE_REFRESH_INTERVAL_SECS", 300)? {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        };
        let worker_count = parsed::<usize>("WORKER_COUNT", num_cpus::get())?.max(1);
        let event_channel_capacity = parsed::<usize>("EVENT_CHANNEL_CAPACITY", 1000)?.max(1);
        let store_retry_attempts = parsed::<usize>("STORE_RETRY_ATTEMPTS", 3)?;

        Ok(Self {
            database_url,
            deployment,
            filter_utxo_by_policy,
            cache_refresh_interval,
            worker_count,
            event_channel_capacity,
            store_retry_attempts,
        })
    }
}

fn required(name: &'static str) -> Result<String, ConfigError> {
    match env::var(name) {
        Ok(value) if !value.trim().is_empty() => Ok(value.trim().to_string()),
        _ => Err(ConfigError::Missing(name)),
    }
}

fn parsed<T: std::str::FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(value) => {
            let result = value.trim().parse::<T>();
            result.map_err(|_| ConfigError::Invalid { name, value })
        }
        Err(_) => Ok(default),
    }
}
