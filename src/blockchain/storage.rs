use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use crate::cache::AddressCache;
use crate::db::{StoreError, UtxoStore};
use crate::models::AddressUtxo;

/// UTXO storage that only persists outputs owned by cached script addresses.
///
/// Wraps the default storage and hands it the retained outputs in their
/// original order. Optionally also requires a token of `policy_id`; that check
/// runs after the cache lookup.
pub struct ScriptUtxoStorage<S> {
    inner: S,
    address_cache: Arc<AddressCache>,
    policy_id: Option<String>,
}

impl<S: UtxoStore> ScriptUtxoStorage<S> {
    pub fn new(inner: S, address_cache: Arc<AddressCache>) -> Self {
        Self {
            inner,
            address_cache,
            policy_id: None,
        }
    }

    pub fn with_policy_filter(mut self, policy_id: impl Into<String>) -> Self {
        self.policy_id = Some(policy_id.into());
        self
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    fn retain(&self, utxo: &AddressUtxo) -> bool {
        if !self.address_cache.contains(&utxo.owner_addr) {
            return false;
        }

        match &self.policy_id {
            Some(policy_id) => utxo.has_policy(policy_id),
            None => true,
        }
    }
}

#[async_trait]
impl<S: UtxoStore> UtxoStore for ScriptUtxoStorage<S> {
    async fn save_unspent(&self, utxos: Vec<AddressUtxo>) -> Result<(), StoreError> {
        let total = utxos.len();
        let filtered: Vec<AddressUtxo> = utxos.into_iter().filter(|u| self.retain(u)).collect();

        debug!("Storing {} of {} unspent outputs", filtered.len(), total);

        self.inner.save_unspent(filtered).await
    }
}
