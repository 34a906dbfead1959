//! Discovery of script addresses from deployment outputs.
//!
//! A deployment is an output sent to the configured deployment address that
//! carries a token of the configured policy and a script reference. Every
//! Plutus V3 script deployed this way controls a base address (script payment
//! credential plus the configured delegation credential) that the indexer
//! starts tracking.

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, error, info};

use crate::blockchain::address::{self, AddressError, Credential, Network, RewardAddress};
use crate::blockchain::handler::EventHandler;
use crate::blockchain::script::{self, Script, ScriptError};
use crate::cache::AddressCache;
use crate::config::DeploymentConfig;
use crate::db::{AddressStore, StoreError};
use crate::models::{Address, AddressUtxo, AddressUtxoEvent};

#[derive(Error, Debug)]
pub enum DerivationError {
    #[error("Failed to decode script reference: {0}")]
    Script(#[from] ScriptError),

    #[error("Failed to derive address: {0}")]
    Address(#[from] AddressError),

    #[error("Reward address has no delegation credential")]
    MissingStakeCredential,
}

type RewardAddressFn = fn(&Script, Network) -> Result<RewardAddress, AddressError>;

pub struct ScriptDeploymentListener {
    deploy_address: String,
    policy_id: String,
    delegation_credential: Credential,
    network: Network,
    reward_address: RewardAddressFn,
    address_cache: Arc<AddressCache>,
    address_store: Arc<dyn AddressStore>,
}

impl ScriptDeploymentListener {
    pub fn new(
        config: &DeploymentConfig,
        address_cache: Arc<AddressCache>,
        address_store: Arc<dyn AddressStore>,
    ) -> Self {
        Self {
            deploy_address: config.script_deploy_address.clone(),
            policy_id: config.policy_id.clone(),
            delegation_credential: config.delegation_credential,
            network: Network::from_mainnet_flag(config.is_mainnet),
            reward_address: address::reward_address,
            address_cache,
            address_store,
        }
    }

    #[cfg(test)]
    pub(crate) fn with_reward_address(mut self, reward_address: RewardAddressFn) -> Self {
        self.reward_address = reward_address;
        self
    }

    /// Derive the addresses deployed by `event`, register them in the cache and
    /// persist them. Returns how many were published.
    pub async fn process_event(&self, event: &AddressUtxoEvent) -> Result<usize, StoreError> {
        let script_refs: Vec<&str> = event
            .outputs()
            .filter(|utxo| self.is_deployment(utxo))
            .filter_map(|utxo| utxo.script_ref.as_deref())
            .collect();

        if script_refs.is_empty() {
            return Ok(0);
        }

        let slot = event.event_metadata.slot;
        let addresses: Vec<Address> = script_refs
            .into_iter()
            .filter_map(|script_ref| match self.derive_address(script_ref, slot) {
                Ok(address) => address,
                Err(DerivationError::Script(e)) => {
                    debug!("Skipping undecodable script reference {}: {}", script_ref, e);
                    None
                }
                Err(e) => {
                    error!("Error deriving address for script reference {}: {}", script_ref, e);
                    None
                }
            })
            .collect();

        if addresses.is_empty() {
            return Ok(0);
        }

        // Cache first: a UTXO batch for these addresses may follow right behind
        self.address_cache
            .publish(&addresses, self.address_store.as_ref())
            .await?;

        for address in &addresses {
            info!("Registered script address {} at slot {}", address.address, address.slot);
        }

        Ok(addresses.len())
    }

    fn is_deployment(&self, utxo: &AddressUtxo) -> bool {
        utxo.owner_addr == self.deploy_address
            && utxo.has_policy(&self.policy_id)
            && utxo.script_ref.as_deref().is_some_and(|r| !r.is_empty())
    }

    /// `Ok(None)` when the script is not a Plutus V3 script.
    fn derive_address(&self, script_ref: &str, slot: i64) -> Result<Option<Address>, DerivationError> {
        let script = script::decode_script_ref_hex(script_ref)?;
        if !script.is_plutus_v3() {
            return Ok(None);
        }

        let payment_credential = Credential::from_script_hash(&script.hash()?)?;
        let base_address =
            address::base_address(&payment_credential, &self.delegation_credential, self.network)?;

        let stake_address = (self.reward_address)(&script, self.network)?;
        let stake_credential = stake_address
            .delegation_credential_hash()
            .map(hex::encode)
            .ok_or(DerivationError::MissingStakeCredential)?;

        Ok(Some(Address {
            address: base_address,
            stake_address: stake_address.bech32,
            payment_credential: payment_credential.to_hex(),
            stake_credential,
            slot,
        }))
    }
}

#[async_trait]
impl EventHandler for ScriptDeploymentListener {
    fn name(&self) -> &'static str {
        "script-deployment"
    }

    async fn handle(&self, event: &AddressUtxoEvent) -> Result<usize, StoreError> {
        self.process_event(event).await
    }
}
