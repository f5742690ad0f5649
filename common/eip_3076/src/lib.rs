//! The EIP-3076 slashing-protection interchange format: the JSON document
//! this service reads on `import` and writes on `export` / key deletion.
//!
//! This crate only models the wire schema and the streaming writer used by
//! the incremental exporter (`spec.md` §4.7); the rules that decide which
//! rows are safe to import live in `slashing_protection`, which is the only
//! consumer that needs to reason about surrounding/duplicate semantics.

use serde::{Deserialize, Serialize};
use std::io::Write;
use types::{Epoch, GenesisValidatorsRoot, Hash256, Slot};

pub const INTERCHANGE_FORMAT_VERSION: &str = "5";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InterchangeMetadata {
    pub interchange_format_version: String,
    #[serde(with = "hex_32")]
    pub genesis_validators_root: [u8; 32],
}

impl InterchangeMetadata {
    pub fn new(genesis_validators_root: GenesisValidatorsRoot) -> Self {
        InterchangeMetadata {
            interchange_format_version: INTERCHANGE_FORMAT_VERSION.to_string(),
            genesis_validators_root: genesis_validators_root.0,
        }
    }

    pub fn genesis_validators_root(&self) -> GenesisValidatorsRoot {
        GenesisValidatorsRoot(self.genesis_validators_root)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignedBlockRecord {
    #[serde(with = "decimal_u64")]
    pub slot: u64,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "opt_hex_32"
    )]
    pub signing_root: Option<[u8; 32]>,
}

impl SignedBlockRecord {
    pub fn slot(&self) -> Slot {
        Slot(self.slot)
    }

    pub fn signing_root(&self) -> Option<Hash256> {
        self.signing_root.map(Hash256)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignedAttestationRecord {
    #[serde(with = "decimal_u64")]
    pub source_epoch: u64,
    #[serde(with = "decimal_u64")]
    pub target_epoch: u64,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "opt_hex_32"
    )]
    pub signing_root: Option<[u8; 32]>,
}

impl SignedAttestationRecord {
    pub fn source_epoch(&self) -> Epoch {
        Epoch(self.source_epoch)
    }

    pub fn target_epoch(&self) -> Epoch {
        Epoch(self.target_epoch)
    }

    pub fn signing_root(&self) -> Option<Hash256> {
        self.signing_root.map(Hash256)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InterchangeValidatorData {
    pub pubkey: String,
    pub signed_blocks: Vec<SignedBlockRecord>,
    pub signed_attestations: Vec<SignedAttestationRecord>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Interchange {
    pub metadata: InterchangeMetadata,
    pub data: Vec<InterchangeValidatorData>,
}

/// Streams `{"metadata": ..., "data": [` then one validator object per
/// [`IncrementalExporter::write_validator`] call, then `]}` on
/// [`IncrementalExporter::finish`].
///
/// Mirrors `spec.md` §4.7's "writing well-formed JSON by streaming the
/// outer envelope and suffixing the array element separator" so a
/// single-key delete export never has to buffer the whole interchange
/// document in memory.
pub struct IncrementalExporter<W: Write> {
    writer: W,
    wrote_any: bool,
}

impl<W: Write> IncrementalExporter<W> {
    pub fn new(mut writer: W, metadata: &InterchangeMetadata) -> Result<Self, std::io::Error> {
        write!(writer, "{{\"metadata\":")?;
        serde_json::to_writer(&mut writer, metadata)?;
        write!(writer, ",\"data\":[")?;
        Ok(IncrementalExporter {
            writer,
            wrote_any: false,
        })
    }

    pub fn write_validator(
        &mut self,
        validator: &InterchangeValidatorData,
    ) -> Result<(), std::io::Error> {
        if self.wrote_any {
            write!(self.writer, ",")?;
        }
        serde_json::to_writer(&mut self.writer, validator)?;
        self.wrote_any = true;
        Ok(())
    }

    pub fn finish(mut self) -> Result<W, std::io::Error> {
        write!(self.writer, "]}}")?;
        Ok(self.writer)
    }
}

mod decimal_u64 {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &u64, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

mod hex_32 {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &[u8; 32], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format!("0x{}", hex::encode(value)))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<[u8; 32], D::Error> {
        let s = String::deserialize(deserializer)?;
        let stripped = s.strip_prefix("0x").unwrap_or(&s);
        let bytes = hex::decode(stripped).map_err(serde::de::Error::custom)?;
        bytes
            .try_into()
            .map_err(|_| serde::de::Error::custom("expected 32 bytes"))
    }
}

mod opt_hex_32 {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(
        value: &Option<[u8; 32]>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(bytes) => serializer.serialize_str(&format!("0x{}", hex::encode(bytes))),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<[u8; 32]>, D::Error> {
        let opt = Option::<String>::deserialize(deserializer)?;
        match opt {
            None => Ok(None),
            Some(s) => {
                let stripped = s.strip_prefix("0x").unwrap_or(&s);
                let bytes = hex::decode(stripped).map_err(serde::de::Error::custom)?;
                let arr: [u8; 32] = bytes
                    .try_into()
                    .map_err(|_| serde::de::Error::custom("expected 32 bytes"))?;
                Ok(Some(arr))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_json() {
        let metadata = InterchangeMetadata::new(GenesisValidatorsRoot([7u8; 32]));
        let interchange = Interchange {
            metadata,
            data: vec![InterchangeValidatorData {
                pubkey: "0xabc".to_string(),
                signed_blocks: vec![SignedBlockRecord {
                    slot: 12345,
                    signing_root: Some([1u8; 32]),
                }],
                signed_attestations: vec![SignedAttestationRecord {
                    source_epoch: 5,
                    target_epoch: 6,
                    signing_root: None,
                }],
            }],
        };

        let json = serde_json::to_string(&interchange).unwrap();
        let parsed: Interchange = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.data[0].signed_blocks[0].slot, 12345);
        assert_eq!(parsed.data[0].signed_attestations[0].signing_root, None);
    }

    #[test]
    fn incremental_exporter_produces_well_formed_json() {
        let metadata = InterchangeMetadata::new(GenesisValidatorsRoot([0u8; 32]));
        let buf: Vec<u8> = Vec::new();
        let mut exporter = IncrementalExporter::new(buf, &metadata).unwrap();
        exporter
            .write_validator(&InterchangeValidatorData {
                pubkey: "0x1".to_string(),
                signed_blocks: vec![],
                signed_attestations: vec![],
            })
            .unwrap();
        exporter
            .write_validator(&InterchangeValidatorData {
                pubkey: "0x2".to_string(),
                signed_blocks: vec![],
                signed_attestations: vec![],
            })
            .unwrap();
        let out = exporter.finish().unwrap();
        let parsed: serde_json::Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(parsed["data"].as_array().unwrap().len(), 2);
    }
}
