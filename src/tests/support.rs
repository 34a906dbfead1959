//! In-memory stores and fixtures shared by the test modules.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_cbor::Value;
use tokio::sync::Notify;

use crate::config::DeploymentConfig;
use crate::db::{AddressStore, StoreError, UtxoStore};
use crate::models::{
    Address, AddressUtxo, AddressUtxoEvent, Amount, EventMetadata, TxInputOutput,
};

pub const DEPLOY_ADDRESS: &str = "addr_deploy";
pub const POLICY_ID: &str = "p1";
pub const DELEGATION_HASH: &str = "e1317b152faac13426e6a83e06ff88a4d62cce3c1634ab0a5ec13309";

pub fn deployment_config() -> DeploymentConfig {
    DeploymentConfig::new(DEPLOY_ADDRESS, POLICY_ID, DELEGATION_HASH, false).unwrap()
}

pub fn store_unavailable() -> StoreError {
    StoreError::Database(sqlx::Error::PoolTimedOut)
}

#[derive(Default)]
pub struct MemoryAddressStore {
    addresses: Mutex<Vec<Address>>,
    failing: AtomicBool,
    save_calls: AtomicUsize,
    /// When set, `find_all` announces itself on `entered` and waits on `release`.
    paused: AtomicBool,
    pub entered: Notify,
    pub release: Notify,
    /// Same gate for `save`, before anything is stored.
    saves_paused: AtomicBool,
    pub save_entered: Notify,
    pub save_release: Notify,
}

impl MemoryAddressStore {
    pub fn with_addresses(addresses: &[&str]) -> Self {
        let store = Self::default();
        store.replace(addresses);
        store
    }

    pub fn replace(&self, addresses: &[&str]) {
        *self.addresses.lock() = addresses.iter().map(|a| address_record(a, 0)).collect();
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn pause_reads(&self) {
        self.paused.store(true, Ordering::SeqCst);
    }

    pub fn pause_saves(&self) {
        self.saves_paused.store(true, Ordering::SeqCst);
    }

    pub fn saved(&self) -> Vec<Address> {
        self.addresses.lock().clone()
    }

    pub fn save_calls(&self) -> usize {
        self.save_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AddressStore for MemoryAddressStore {
    async fn find_all(&self) -> Result<Vec<Address>, StoreError> {
        if self.paused.load(Ordering::SeqCst) {
            self.entered.notify_one();
            self.release.notified().await;
        }
        if self.failing.load(Ordering::SeqCst) {
            return Err(store_unavailable());
        }
        Ok(self.addresses.lock().clone())
    }

    async fn save(&self, addresses: &[Address]) -> Result<(), StoreError> {
        self.save_calls.fetch_add(1, Ordering::SeqCst);
        if self.saves_paused.load(Ordering::SeqCst) {
            self.save_entered.notify_one();
            self.save_release.notified().await;
        }
        if self.failing.load(Ordering::SeqCst) {
            return Err(store_unavailable());
        }

        let mut stored = self.addresses.lock();
        for address in addresses {
            if !stored.iter().any(|a| a.address == address.address) {
                stored.push(address.clone());
            }
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct RecordingUtxoStore {
    batches: Mutex<Vec<Vec<AddressUtxo>>>,
    failing: AtomicBool,
}

impl RecordingUtxoStore {
    pub fn failing() -> Self {
        let store = Self::default();
        store.failing.store(true, Ordering::SeqCst);
        store
    }

    pub fn batches(&self) -> Vec<Vec<AddressUtxo>> {
        self.batches.lock().clone()
    }

    pub fn saved_owners(&self) -> Vec<String> {
        self.batches
            .lock()
            .iter()
            .flatten()
            .map(|u| u.owner_addr.clone())
            .collect()
    }
}

#[async_trait]
impl UtxoStore for RecordingUtxoStore {
    async fn save_unspent(&self, utxos: Vec<AddressUtxo>) -> Result<(), StoreError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(store_unavailable());
        }
        self.batches.lock().push(utxos);
        Ok(())
    }
}

pub fn address_record(address: &str, slot: i64) -> Address {
    Address {
        address: address.to_string(),
        stake_address: format!("stake_{}", address),
        payment_credential: "00".repeat(28),
        stake_credential: "00".repeat(28),
        slot,
    }
}

pub fn script_ref_hex(language: u8, body: &[u8]) -> String {
    let cbor = serde_cbor::to_vec(&Value::Array(vec![
        Value::Integer(language.into()),
        Value::Bytes(body.to_vec()),
    ]))
    .unwrap();
    hex::encode(cbor)
}

pub fn v3_script_ref(body: &[u8]) -> String {
    script_ref_hex(3, body)
}

pub fn utxo(tx_hash: &str, index: u32, owner: &str, policies: &[&str], script_ref: Option<String>) -> AddressUtxo {
    AddressUtxo {
        tx_hash: tx_hash.to_string(),
        output_index: index,
        slot: 100,
        block_number: 10,
        block_hash: Some("bh".to_string()),
        owner_addr: owner.to_string(),
        lovelace_amount: 2_000_000,
        amounts: policies
            .iter()
            .map(|policy| Amount {
                unit: format!("{}746f6b656e", policy),
                policy_id: Some(policy.to_string()),
                asset_name: Some("token".to_string()),
                quantity: 1,
            })
            .collect(),
        script_ref,
    }
}

pub fn event(slot: i64, outputs: Vec<AddressUtxo>) -> AddressUtxoEvent {
    AddressUtxoEvent {
        event_metadata: EventMetadata {
            slot,
            block: 10,
            block_hash: Some("bh".to_string()),
        },
        tx_input_outputs: vec![TxInputOutput {
            tx_hash: "tx".to_string(),
            inputs: Vec::new(),
            outputs,
        }],
    }
}
