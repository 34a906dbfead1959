pub mod blockchain;
pub mod cache;
pub mod config;
pub mod db;
pub mod models;
pub mod state;

#[cfg(test)]
pub mod tests;

// Re-export specific items for convenience
pub use blockchain::{ScriptDeploymentListener, ScriptUtxoStorage};
pub use cache::AddressCache;
pub use config::{Config, DeploymentConfig};
pub use db::{AddressStore, StoreError, UtxoStore};
pub use models::{Address, AddressUtxo, AddressUtxoEvent};
