use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("hex decode error: {0}")]
    Hex(#[from] hex::FromHexError),
    #[error("expected {expected} bytes, got {actual}")]
    WrongLength { expected: usize, actual: usize },
}

/// The 4-byte little-endian fork version, e.g. `0x00000000` at genesis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ForkVersion(pub [u8; 4]);

impl ForkVersion {
    pub fn to_0x_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }

    pub fn from_hex(s: &str) -> Result<Self, Error> {
        let stripped = s.strip_prefix("0x").unwrap_or(s);
        let bytes = hex::decode(stripped)?;
        if bytes.len() != 4 {
            return Err(Error::WrongLength {
                expected: 4,
                actual: bytes.len(),
            });
        }
        let mut out = [0u8; 4];
        out.copy_from_slice(&bytes);
        Ok(ForkVersion(out))
    }
}

/// The beacon chain's genesis validators root, fixed for the lifetime of a
/// network and write-once in the metadata table (`spec.md` §3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GenesisValidatorsRoot(pub [u8; 32]);

impl GenesisValidatorsRoot {
    pub fn to_0x_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }

    pub fn from_hex(s: &str) -> Result<Self, Error> {
        let stripped = s.strip_prefix("0x").unwrap_or(s);
        let bytes = hex::decode(stripped)?;
        if bytes.len() != 32 {
            return Err(Error::WrongLength {
                expected: 32,
                actual: bytes.len(),
            });
        }
        let mut out = [0u8; 32];
        out.copy_from_slice(&bytes);
        Ok(GenesisValidatorsRoot(out))
    }
}
