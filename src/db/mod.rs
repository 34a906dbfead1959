pub mod address;
pub mod connection;
pub mod migration;
pub mod utxo;

use async_trait::async_trait;
use thiserror::Error;

use crate::models::{Address, AddressUtxo};

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Failed to encode amounts: {0}")]
    Encoding(#[from] serde_json::Error),
}

/// Persistent table of known script addresses.
#[async_trait]
pub trait AddressStore: Send + Sync {
    async fn find_all(&self) -> Result<Vec<Address>, StoreError>;

    /// Inserts the addresses; already stored addresses are left untouched.
    async fn save(&self, addresses: &[Address]) -> Result<(), StoreError>;
}

/// Persistent table of unspent outputs.
#[async_trait]
pub trait UtxoStore: Send + Sync {
    async fn save_unspent(&self, utxos: Vec<AddressUtxo>) -> Result<(), StoreError>;
}
