//! Script reference decoding and script hashing.
//!
//! A script reference is the CBOR array `[language, body]`, optionally wrapped
//! in tag 24 (embedded CBOR) or a plain byte string holding that array.

use blake2::digest::consts::U28;
use blake2::{Blake2b, Digest};
use serde_cbor::Value;
use thiserror::Error;

pub const SCRIPT_HASH_LEN: usize = 28;

type Blake2b224 = Blake2b<U28>;

#[derive(Error, Debug)]
pub enum ScriptError {
    #[error("Invalid hex in script reference: {0}")]
    Hex(#[from] hex::FromHexError),

    #[error("Invalid CBOR in script reference: {0}")]
    Cbor(#[from] serde_cbor::Error),

    #[error("Malformed script reference: {0}")]
    Malformed(&'static str),

    #[error("Unknown script language tag: {0}")]
    UnknownLanguage(i128),

    #[error("Native script body was re-encoded, its hash cannot be computed")]
    ReencodedBody,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScriptLanguage {
    Native,
    PlutusV1,
    PlutusV2,
    PlutusV3,
}

impl ScriptLanguage {
    fn from_tag(tag: i128) -> Result<Self, ScriptError> {
        match tag {
            0 => Ok(Self::Native),
            1 => Ok(Self::PlutusV1),
            2 => Ok(Self::PlutusV2),
            3 => Ok(Self::PlutusV3),
            other => Err(ScriptError::UnknownLanguage(other)),
        }
    }

    /// Prefix byte hashed together with the script body.
    pub fn tag(self) -> u8 {
        match self {
            Self::Native => 0,
            Self::PlutusV1 => 1,
            Self::PlutusV2 => 2,
            Self::PlutusV3 => 3,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Script {
    language: ScriptLanguage,
    /// Plutus: the compiled script bytes. Native: the CBOR of the timelock.
    body: Vec<u8>,
    /// False when `body` was rebuilt from a decoded value rather than taken
    /// from the reference bytes.
    exact_body: bool,
}

impl Script {
    pub fn new(language: ScriptLanguage, body: Vec<u8>) -> Self {
        Self { language, body, exact_body: true }
    }

    pub fn language(&self) -> ScriptLanguage {
        self.language
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    pub fn is_plutus_v3(&self) -> bool {
        self.language == ScriptLanguage::PlutusV3
    }

    /// Blake2b-224 of the language tag and the body. Native scripts decoded
    /// from a reference are refused: their CBOR is re-encoded on decode and
    /// need not match the on-chain bytes.
    pub fn hash(&self) -> Result<[u8; SCRIPT_HASH_LEN], ScriptError> {
        if !self.exact_body {
            return Err(ScriptError::ReencodedBody);
        }

        let mut hasher = Blake2b224::new();
        hasher.update([self.language.tag()]);
        hasher.update(&self.body);

        let mut hash = [0u8; SCRIPT_HASH_LEN];
        hash.copy_from_slice(&hasher.finalize());
        Ok(hash)
    }
}

pub fn decode_script_ref_hex(script_ref: &str) -> Result<Script, ScriptError> {
    let bytes = hex::decode(script_ref)?;
    decode_script_ref(&bytes)
}

pub fn decode_script_ref(bytes: &[u8]) -> Result<Script, ScriptError> {
    let value: Value = serde_cbor::from_slice(bytes)?;
    decode_value(value)
}

fn decode_value(value: Value) -> Result<Script, ScriptError> {
    match value {
        Value::Tag(24, inner) => match *inner {
            Value::Bytes(embedded) => decode_script_ref(&embedded),
            _ => Err(ScriptError::Malformed("tag 24 must wrap a byte string")),
        },
        Value::Bytes(embedded) => decode_script_ref(&embedded),
        Value::Array(items) => decode_array(items),
        _ => Err(ScriptError::Malformed("expected [language, script] array")),
    }
}

fn decode_array(items: Vec<Value>) -> Result<Script, ScriptError> {
    let mut items = items.into_iter();
    let (tag, body) = match (items.next(), items.next(), items.next()) {
        (Some(Value::Integer(tag)), Some(body), None) => (tag, body),
        _ => return Err(ScriptError::Malformed("expected [language, script] array")),
    };

    let language = ScriptLanguage::from_tag(tag)?;
    match (language, body) {
        (ScriptLanguage::Native, timelock) => Ok(Script {
            language,
            body: serde_cbor::to_vec(&timelock)?,
            exact_body: false,
        }),
        (_, Value::Bytes(bytes)) => Ok(Script::new(language, bytes)),
        _ => Err(ScriptError::Malformed("plutus script body must be a byte string")),
    }
}
