//! The serde-level shape of an EIP-2335 keystore JSON document. Kept
//! separate from the decryption logic in `lib.rs` so the wire format and
//! the crypto operations can be reasoned about independently.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub use std::convert::Infallible as KeystoreCryptoError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KdfModule {
    Pbkdf2,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KdfParams {
    pub dklen: u32,
    pub c: u32,
    pub prf: String,
    #[serde(with = "hex_bytes")]
    pub salt: Vec<u8>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Kdf {
    pub function: KdfModule,
    pub params: KdfParams,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChecksumModule {
    Sha256,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Checksum {
    pub function: ChecksumModule,
    #[serde(with = "hex_bytes")]
    pub message: Vec<u8>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Cipher {
    Aes128Ctr,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CipherParams {
    #[serde(with = "hex_bytes")]
    pub iv: Vec<u8>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CipherModule {
    pub function: Cipher,
    pub params: CipherParams,
    #[serde(with = "hex_bytes")]
    pub message: Vec<u8>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Crypto {
    pub kdf: Kdf,
    pub checksum: Checksum,
    pub cipher: CipherModule,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonKeystore {
    pub crypto: Crypto,
    pub uuid: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pubkey: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    pub version: u32,
}

mod hex_bytes {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(deserializer)?;
        let s = s.strip_prefix("0x").unwrap_or(&s);
        hex::decode(s).map_err(serde::de::Error::custom)
    }
}
