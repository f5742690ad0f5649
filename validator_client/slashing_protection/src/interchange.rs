//! EIP-3076 interchange import/export (`spec.md` §4.7).

use crate::block::import_block_row;
use crate::attestation::import_attestation_row;
use crate::watermark::{raise_low_watermark, LowWatermark};
use crate::{get_gvr, register_validator_tx, Error, SlashingDatabase};
use eip_3076::{
    Interchange, InterchangeMetadata, InterchangeValidatorData, SignedAttestationRecord,
    SignedBlockRecord,
};
use rusqlite::TransactionBehavior;
use std::io::Write;
use types::{Epoch, GenesisValidatorsRoot, Slot};

/// Import outcome: how many blocks/attestations were accepted versus
/// genuinely conflicting (`spec.md` §4.7's "the later is counted as an
/// error").
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportReport {
    pub blocks_imported: u64,
    pub blocks_skipped_duplicate: u64,
    pub blocks_errored: u64,
    pub attestations_imported: u64,
    pub attestations_skipped_duplicate: u64,
    pub attestations_errored: u64,
}

impl SlashingDatabase {
    /// Imports an EIP-3076 document. The whole import runs inside one
    /// immediate transaction: either every validator's rows are applied,
    /// or (on a GVR mismatch) none are.
    pub fn import_interchange(
        &self,
        interchange: &Interchange,
    ) -> Result<ImportReport, Error> {
        let mut conn = self.conn()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let incoming_gvr = interchange.metadata.genesis_validators_root();
        match get_gvr(&tx)? {
            None => {
                tx.execute(
                    "UPDATE metadata SET genesis_validators_root = ?1 WHERE id = 1",
                    [incoming_gvr.0.to_vec()],
                )?;
            }
            Some(stored) if stored.0 != incoming_gvr.0 => {
                return Err(Error::GenesisValidatorsRootMismatch {
                    stored: stored.to_0x_hex(),
                    incoming: incoming_gvr.to_0x_hex(),
                });
            }
            Some(_) => {}
        }

        let mut report = ImportReport::default();

        for validator in &interchange.data {
            let validator_id = register_validator_tx(&tx, &validator.pubkey)?;

            for block in &validator.signed_blocks {
                let slot = block.slot();
                let root = block.signing_root();
                let accepted = import_block_row(&tx, validator_id, slot, root)?;
                if accepted {
                    report.blocks_imported += 1;
                } else {
                    report.blocks_errored += 1;
                }
            }
            if let Some(max_slot) = validator.signed_blocks.iter().map(|b| b.slot).max() {
                raise_low_watermark(
                    &tx,
                    validator_id,
                    LowWatermark {
                        min_block_slot: Some(Slot(max_slot)),
                        ..Default::default()
                    },
                )?;
            }

            for attestation in &validator.signed_attestations {
                let source = attestation.source_epoch();
                let target = attestation.target_epoch();
                let root = attestation.signing_root();
                let accepted =
                    import_attestation_row(&tx, validator_id, source, target, root)?;
                if accepted {
                    report.attestations_imported += 1;
                } else {
                    report.attestations_errored += 1;
                }
            }
            if let Some(max_target) = validator
                .signed_attestations
                .iter()
                .map(|a| a.target_epoch)
                .max()
            {
                let max_source = validator
                    .signed_attestations
                    .iter()
                    .map(|a| a.source_epoch)
                    .max()
                    .unwrap_or(0);
                raise_low_watermark(
                    &tx,
                    validator_id,
                    LowWatermark {
                        min_attestation_source_epoch: Some(Epoch(max_source)),
                        min_attestation_target_epoch: Some(Epoch(max_target)),
                        ..Default::default()
                    },
                )?;
            }
        }

        tx.commit()?;
        Ok(report)
    }

    /// Exports the whole store as one interchange document, sorted
    /// ascending by validator public key, slot, and target epoch
    /// (`spec.md` §4.7).
    pub fn export_interchange(&self) -> Result<Interchange, Error> {
        let conn = self.conn()?;
        let gvr = get_gvr(&conn)?.unwrap_or(GenesisValidatorsRoot([0u8; 32]));
        let metadata = InterchangeMetadata::new(gvr);

        let mut data = Vec::new();
        let mut stmt = conn.prepare("SELECT id, public_key FROM validators ORDER BY public_key ASC")?;
        let validators: Vec<(i64, String)> = stmt
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<Result<_, _>>()?;

        for (id, pubkey) in validators {
            data.push(export_validator(&conn, id, pubkey)?);
        }

        Ok(Interchange { metadata, data })
    }

    /// Exports a single validator's history, e.g. for the delete flow's
    /// "export the slashing-protection interchange data for this one
    /// key" step (`spec.md` §4.5).
    pub fn export_interchange_for<W: Write>(
        &self,
        public_keys: &[String],
        writer: W,
    ) -> Result<W, Error> {
        let conn = self.conn()?;
        let gvr = get_gvr(&conn)?.unwrap_or(GenesisValidatorsRoot([0u8; 32]));
        let metadata = InterchangeMetadata::new(gvr);

        let mut exporter = eip_3076::IncrementalExporter::new(writer, &metadata)?;
        for pubkey in public_keys {
            if let Some(id) = crate::lookup_validator_id(&conn, pubkey)? {
                let validator_data = export_validator(&conn, id, pubkey.clone())?;
                exporter.write_validator(&validator_data)?;
            }
        }
        Ok(exporter.finish()?)
    }
}

fn export_validator(
    conn: &rusqlite::Connection,
    validator_id: i64,
    pubkey: String,
) -> Result<InterchangeValidatorData, Error> {
    let mut block_stmt = conn.prepare(
        "SELECT slot, signing_root FROM signed_blocks WHERE validator_id = ?1 ORDER BY slot ASC",
    )?;
    let signed_blocks = block_stmt
        .query_map([validator_id], |row| {
            let slot: i64 = row.get(0)?;
            let root: Option<Vec<u8>> = row.get(1)?;
            Ok((slot as u64, root))
        })?
        .collect::<Result<Vec<_>, _>>()?
        .into_iter()
        .map(|(slot, root)| SignedBlockRecord {
            slot,
            signing_root: root.map(|bytes| to_32(&bytes)),
        })
        .collect();

    let mut attestation_stmt = conn.prepare(
        "SELECT source_epoch, target_epoch, signing_root FROM signed_attestations
         WHERE validator_id = ?1 ORDER BY target_epoch ASC",
    )?;
    let signed_attestations = attestation_stmt
        .query_map([validator_id], |row| {
            let source: i64 = row.get(0)?;
            let target: i64 = row.get(1)?;
            let root: Option<Vec<u8>> = row.get(2)?;
            Ok((source as u64, target as u64, root))
        })?
        .collect::<Result<Vec<_>, _>>()?
        .into_iter()
        .map(|(source, target, root)| SignedAttestationRecord {
            source_epoch: source,
            target_epoch: target,
            signing_root: root.map(|bytes| to_32(&bytes)),
        })
        .collect();

    Ok(InterchangeValidatorData {
        pubkey,
        signed_blocks,
        signed_attestations,
    })
}

fn to_32(bytes: &[u8]) -> [u8; 32] {
    let mut arr = [0u8; 32];
    arr.copy_from_slice(bytes);
    arr
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_interchange(gvr: [u8; 32]) -> Interchange {
        Interchange {
            metadata: InterchangeMetadata::new(GenesisValidatorsRoot(gvr)),
            data: vec![InterchangeValidatorData {
                pubkey: "0xabc".to_string(),
                signed_blocks: vec![SignedBlockRecord {
                    slot: 12345,
                    signing_root: Some([0x4f; 32]),
                }],
                signed_attestations: vec![],
            }],
        }
    }

    #[test]
    fn duplicate_import_is_idempotent() {
        let db = SlashingDatabase::in_memory().unwrap();
        let doc = sample_interchange([9u8; 32]);

        let first = db.import_interchange(&doc).unwrap();
        assert_eq!(first.blocks_imported, 1);

        let second = db.import_interchange(&doc).unwrap();
        assert_eq!(second.blocks_imported, 1);
        assert_eq!(second.blocks_errored, 0);

        let exported = db.export_interchange().unwrap();
        assert_eq!(exported.data[0].signed_blocks.len(), 1);
    }

    #[test]
    fn conflicting_import_is_counted_as_error() {
        let db = SlashingDatabase::in_memory().unwrap();
        let mut doc = sample_interchange([1u8; 32]);
        db.import_interchange(&doc).unwrap();

        doc.data[0].signed_blocks[0].signing_root = Some([0xaa; 32]);
        let report = db.import_interchange(&doc).unwrap();
        assert_eq!(report.blocks_errored, 1);
        assert_eq!(report.blocks_imported, 0);
    }
}
