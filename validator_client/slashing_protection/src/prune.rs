//! Pruning (`spec.md` §4.9): bounds how much history each validator
//! accumulates without ever discarding the row a future watermark check
//! might need.

use crate::{Error, SlashingDatabase};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PruneReport {
    pub blocks_deleted: u64,
    pub attestations_deleted: u64,
}

impl SlashingDatabase {
    /// Removes rows whose slot/epoch fall below the per-validator low
    /// watermark minus the retention window, while always keeping the
    /// most recent row per validator (`spec.md` §4.9).
    pub fn prune(&self, epochs_to_keep: u64, slots_per_epoch: u64) -> Result<PruneReport, Error> {
        let conn = self.conn()?;
        let mut report = PruneReport::default();

        let mut stmt = conn.prepare(
            "SELECT validator_id, min_block_slot, min_attestation_target_epoch
             FROM low_watermarks",
        )?;
        let rows: Vec<(i64, Option<i64>, Option<i64>)> = stmt
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)))?
            .collect::<Result<_, _>>()?;

        for (validator_id, min_block_slot, min_target_epoch) in rows {
            if let Some(min_block_slot) = min_block_slot {
                let window = (epochs_to_keep as i64).saturating_mul(slots_per_epoch as i64);
                let cutoff = min_block_slot.saturating_sub(window);
                if cutoff > i64::MIN {
                    let max_slot: Option<i64> = conn.query_row(
                        "SELECT MAX(slot) FROM signed_blocks WHERE validator_id = ?1",
                        [validator_id],
                        |row| row.get(0),
                    )?;
                    if let Some(max_slot) = max_slot {
                        let deleted = conn.execute(
                            "DELETE FROM signed_blocks
                             WHERE validator_id = ?1 AND slot < ?2 AND slot < ?3",
                            rusqlite::params![validator_id, cutoff, max_slot],
                        )?;
                        report.blocks_deleted += deleted as u64;
                    }
                }
            }

            if let Some(min_target_epoch) = min_target_epoch {
                let cutoff = min_target_epoch.saturating_sub(epochs_to_keep as i64);
                if cutoff > i64::MIN {
                    let max_target: Option<i64> = conn.query_row(
                        "SELECT MAX(target_epoch) FROM signed_attestations WHERE validator_id = ?1",
                        [validator_id],
                        |row| row.get(0),
                    )?;
                    if let Some(max_target) = max_target {
                        let deleted = conn.execute(
                            "DELETE FROM signed_attestations
                             WHERE validator_id = ?1 AND target_epoch < ?2 AND target_epoch < ?3",
                            rusqlite::params![validator_id, cutoff, max_target],
                        )?;
                        report.attestations_deleted += deleted as u64;
                    }
                }
            }
        }

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::BlockRequest;
    use crate::watermark::{raise_low_watermark, LowWatermark};
    use types::{GenesisValidatorsRoot, Hash256, Slot};

    #[test]
    fn prune_keeps_the_most_recent_row() {
        let db = SlashingDatabase::in_memory().unwrap();
        let gvr = GenesisValidatorsRoot([0u8; 32]);
        db.set_genesis_validators_root(gvr).unwrap();

        for slot in [100u64, 200, 300] {
            db.check_and_sign_block(
                &BlockRequest {
                    public_key: "0xV".to_string(),
                    slot: Slot(slot),
                    signing_root: Hash256([slot as u8; 32]),
                },
                gvr,
            )
            .unwrap();
        }

        // The sign path no longer raises the low watermark (`spec.md`
        // §4.6/§4.7: only import/repair do); pruning reads off the
        // watermark, so simulate an import/repair having raised it to 300.
        let validator_id = db.validator_id("0xV").unwrap().unwrap();
        {
            let mut conn = db.conn().unwrap();
            let tx = SlashingDatabase::begin_immediate(&mut conn).unwrap();
            raise_low_watermark(
                &tx,
                validator_id,
                LowWatermark {
                    min_block_slot: Some(Slot(300)),
                    ..Default::default()
                },
            )
            .unwrap();
            tx.commit().unwrap();
        }

        let report = db.prune(0, 1).unwrap();
        // cutoff = 300 - 0*1 = 300, so slots < 300 are prunable, but slot
        // 300 itself (the max) is always kept regardless.
        assert!(report.blocks_deleted <= 2);

        let remaining = db.export_interchange().unwrap();
        assert!(!remaining.data[0].signed_blocks.is_empty());
    }
}
