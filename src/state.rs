use std::sync::Arc;
use std::time::Duration;

use backon::{ExponentialBuilder, Retryable};
use sqlx::SqlitePool;
use tracing::{info, warn};

use crate::blockchain::{Dispatcher, ScriptDeploymentListener, ScriptUtxoStorage};
use crate::cache::AddressCache;
use crate::config::Config;
use crate::db::address::SqliteAddressStore;
use crate::db::utxo::SqliteUtxoStore;
use crate::db::{AddressStore, StoreError, UtxoStore};

pub struct AppState {
    pub config: Config,
    pub db_pool: SqlitePool,
    pub address_cache: Arc<AddressCache>,
    pub dispatcher: Arc<Dispatcher>,
}

impl AppState {
    /// Load the address cache and wire the deployment listener and the
    /// filtering UTXO storage into a dispatcher.
    pub async fn build(config: Config, db_pool: SqlitePool) -> Result<Self, StoreError> {
        let address_store: Arc<dyn AddressStore> = Arc::new(SqliteAddressStore::new(db_pool.clone()));

        let address_cache = (|| AddressCache::load(address_store.clone()))
            .retry(
                ExponentialBuilder::default()
                    .with_min_delay(Duration::from_millis(500))
                    .with_max_times(config.store_retry_attempts),
            )
            .notify(|e: &StoreError, after: Duration| {
                warn!("Loading address cache failed, retrying in {:?}: {}", after, e);
            })
            .await?;
        let address_cache = Arc::new(address_cache);

        let listener = ScriptDeploymentListener::new(
            &config.deployment,
            address_cache.clone(),
            address_store,
        );

        let mut utxo_storage =
            ScriptUtxoStorage::new(SqliteUtxoStore::new(db_pool.clone()), address_cache.clone());
        if config.filter_utxo_by_policy {
            info!("Filtering unspent outputs by policy id {}", config.deployment.policy_id);
            utxo_storage = utxo_storage.with_policy_filter(config.deployment.policy_id.clone());
        }
        let utxo_store: Arc<dyn UtxoStore> = Arc::new(utxo_storage);

        let dispatcher = Dispatcher::new(utxo_store, config.store_retry_attempts)
            .register(Arc::new(listener));

        Ok(Self {
            config,
            db_pool,
            address_cache,
            dispatcher: Arc::new(dispatcher),
        })
    }
}
