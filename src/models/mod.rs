// Domain records shared by the cache, the stores and the event handlers.

use serde::{Deserialize, Serialize};

/// A script address discovered from a deployment output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    pub address: String,
    pub stake_address: String,
    pub payment_credential: String,
    pub stake_credential: String,
    pub slot: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Amount {
    pub unit: String,
    #[serde(default)]
    pub policy_id: Option<String>,
    #[serde(default)]
    pub asset_name: Option<String>,
    pub quantity: u64,
}

/// An unspent output as delivered by the ingestion pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressUtxo {
    pub tx_hash: String,
    pub output_index: u32,
    #[serde(default)]
    pub slot: i64,
    #[serde(default)]
    pub block_number: i64,
    #[serde(default)]
    pub block_hash: Option<String>,
    pub owner_addr: String,
    #[serde(default)]
    pub lovelace_amount: u64,
    #[serde(default)]
    pub amounts: Vec<Amount>,
    #[serde(default)]
    pub script_ref: Option<String>,
}

impl AddressUtxo {
    pub fn has_policy(&self, policy_id: &str) -> bool {
        self.amounts
            .iter()
            .any(|amount| amount.policy_id.as_deref() == Some(policy_id))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxInputOutput {
    pub tx_hash: String,
    #[serde(default)]
    pub inputs: Vec<AddressUtxo>,
    #[serde(default)]
    pub outputs: Vec<AddressUtxo>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventMetadata {
    pub slot: i64,
    #[serde(default)]
    pub block: i64,
    #[serde(default)]
    pub block_hash: Option<String>,
}

/// Event published by the pipeline once per block with the inputs and
/// outputs of every transaction in it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressUtxoEvent {
    pub event_metadata: EventMetadata,
    pub tx_input_outputs: Vec<TxInputOutput>,
}

impl AddressUtxoEvent {
    pub fn outputs(&self) -> impl Iterator<Item = &AddressUtxo> {
        self.tx_input_outputs
            .iter()
            .flat_map(|tx| tx.outputs.iter())
    }
}

/// Unit of work handed to the worker pool.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PipelineMessage {
    AddressUtxoEvent(AddressUtxoEvent),
    SaveUnspent { utxos: Vec<AddressUtxo> },
}
