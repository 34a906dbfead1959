//! Shelley address construction for script credentials.

use bech32::{ToBase32, Variant};
use thiserror::Error;

use crate::blockchain::script::{Script, ScriptError, SCRIPT_HASH_LEN};

#[derive(Error, Debug)]
pub enum AddressError {
    #[error("Credential hash must be {expected} bytes, got {actual}")]
    InvalidCredentialLength { expected: usize, actual: usize },

    #[error("Invalid hex in credential hash: {0}")]
    Hex(#[from] hex::FromHexError),

    #[error("Bech32 encoding failed: {0}")]
    Bech32(#[from] bech32::Error),

    #[error("Failed to hash script: {0}")]
    ScriptHash(#[from] ScriptError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Network {
    Mainnet,
    Testnet,
}

impl Network {
    pub fn from_mainnet_flag(is_mainnet: bool) -> Self {
        if is_mainnet { Self::Mainnet } else { Self::Testnet }
    }

    fn id(self) -> u8 {
        match self {
            Self::Mainnet => 1,
            Self::Testnet => 0,
        }
    }

    fn address_hrp(self) -> &'static str {
        match self {
            Self::Mainnet => "addr",
            Self::Testnet => "addr_test",
        }
    }

    fn stake_hrp(self) -> &'static str {
        match self {
            Self::Mainnet => "stake",
            Self::Testnet => "stake_test",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Credential {
    Key([u8; SCRIPT_HASH_LEN]),
    Script([u8; SCRIPT_HASH_LEN]),
}

impl Credential {
    pub fn from_script_hash(hash: &[u8]) -> Result<Self, AddressError> {
        let bytes: [u8; SCRIPT_HASH_LEN] = hash.try_into().map_err(|_| {
            AddressError::InvalidCredentialLength {
                expected: SCRIPT_HASH_LEN,
                actual: hash.len(),
            }
        })?;
        Ok(Self::Script(bytes))
    }

    pub fn from_script_hash_hex(hash: &str) -> Result<Self, AddressError> {
        Self::from_script_hash(&hex::decode(hash)?)
    }

    pub fn bytes(&self) -> &[u8; SCRIPT_HASH_LEN] {
        match self {
            Self::Key(bytes) | Self::Script(bytes) => bytes,
        }
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.bytes())
    }

    fn is_script(&self) -> bool {
        matches!(self, Self::Script(_))
    }
}

/// Bech32 base address for a payment and a delegation credential.
pub fn base_address(
    payment: &Credential,
    delegation: &Credential,
    network: Network,
) -> Result<String, AddressError> {
    let address_type = match (payment.is_script(), delegation.is_script()) {
        (false, false) => 0b0000,
        (true, false) => 0b0001,
        (false, true) => 0b0010,
        (true, true) => 0b0011,
    };

    let mut payload = Vec::with_capacity(1 + 2 * SCRIPT_HASH_LEN);
    payload.push((address_type << 4) | network.id());
    payload.extend_from_slice(payment.bytes());
    payload.extend_from_slice(delegation.bytes());

    Ok(bech32::encode(network.address_hrp(), payload.to_base32(), Variant::Bech32)?)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RewardAddress {
    pub bech32: String,
    delegation: Option<Credential>,
}

impl RewardAddress {
    pub(crate) fn new(bech32: String, delegation: Option<Credential>) -> Self {
        Self { bech32, delegation }
    }

    /// Hash of the delegation credential carried by the address.
    pub fn delegation_credential_hash(&self) -> Option<&[u8]> {
        self.delegation.as_ref().map(|credential| credential.bytes().as_slice())
    }
}

/// Reward (stake) address controlled by `script`.
pub fn reward_address(script: &Script, network: Network) -> Result<RewardAddress, AddressError> {
    let delegation = Credential::from_script_hash(&script.hash()?)?;

    let mut payload = Vec::with_capacity(1 + SCRIPT_HASH_LEN);
    payload.push((0b1111 << 4) | network.id());
    payload.extend_from_slice(delegation.bytes());

    let bech32 = bech32::encode(network.stake_hrp(), payload.to_base32(), Variant::Bech32)?;

    Ok(RewardAddress::new(bech32, Some(delegation)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blockchain::script::ScriptLanguage;
    use bech32::FromBase32;

    const HASH_HEX: &str = "e1317b152faac13426e6a83e06ff88a4d62cce3c1634ab0a5ec13309";

    #[test]
    fn credential_rejects_wrong_length() {
        let err = Credential::from_script_hash(&[0u8; 27]).unwrap_err();
        assert!(matches!(
            err,
            AddressError::InvalidCredentialLength { expected: 28, actual: 27 }
        ));
        assert!(Credential::from_script_hash_hex("not hex").is_err());
    }

    #[test]
    fn base_address_encodes_header_and_both_credentials() {
        let payment = Credential::from_script_hash(&[0x11; 28]).unwrap();
        let delegation = Credential::from_script_hash_hex(HASH_HEX).unwrap();

        let encoded = base_address(&payment, &delegation, Network::Testnet).unwrap();
        assert!(encoded.starts_with("addr_test1"));

        let (hrp, data, variant) = bech32::decode(&encoded).unwrap();
        let bytes = Vec::<u8>::from_base32(&data).unwrap();
        assert_eq!(hrp, "addr_test");
        assert_eq!(variant, Variant::Bech32);
        assert_eq!(bytes.len(), 57);
        assert_eq!(bytes[0], 0b0011_0000);
        assert_eq!(&bytes[1..29], &[0x11; 28]);
        assert_eq!(hex::encode(&bytes[29..]), HASH_HEX);
    }

    #[test]
    fn mainnet_uses_mainnet_prefixes() {
        let script = Script::new(ScriptLanguage::PlutusV3, vec![0x01, 0x02]);
        let payment = Credential::from_script_hash(&script.hash().unwrap()).unwrap();
        let delegation = Credential::from_script_hash_hex(HASH_HEX).unwrap();

        let base = base_address(&payment, &delegation, Network::Mainnet).unwrap();
        let reward = reward_address(&script, Network::Mainnet).unwrap();

        assert!(base.starts_with("addr1"));
        assert!(reward.bech32.starts_with("stake1"));
    }

    #[test]
    fn reward_address_carries_script_hash() {
        let script = Script::new(ScriptLanguage::PlutusV3, vec![0xca, 0xfe]);
        let reward = reward_address(&script, Network::Testnet).unwrap();

        assert!(reward.bech32.starts_with("stake_test1"));
        assert_eq!(reward.delegation_credential_hash(), Some(script.hash().unwrap().as_slice()));
    }
}
