use async_trait::async_trait;

use crate::db::StoreError;
use crate::models::AddressUtxoEvent;

/// Consumer of block-level UTXO events, registered with the worker pool.
#[async_trait]
pub trait EventHandler: Send + Sync {
    fn name(&self) -> &'static str;

    /// Returns the number of records the handler wrote.
    async fn handle(&self, event: &AddressUtxoEvent) -> Result<usize, StoreError>;
}
