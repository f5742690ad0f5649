//! The block rule (`spec.md` §4.6).

use crate::watermark::{get_high_watermark, get_low_watermark};
use crate::{get_gvr, register_validator_tx, Error, RejectReason, SigningResult, SlashingDatabase};
use rusqlite::{Connection, OptionalExtension};
use types::{GenesisValidatorsRoot, Hash256, Slot};

/// A request to sign a block at `slot` with `signing_root`, for the
/// validator identified by `public_key`.
#[derive(Debug, Clone)]
pub struct BlockRequest {
    pub public_key: String,
    pub slot: Slot,
    pub signing_root: Hash256,
}

impl SlashingDatabase {
    /// Runs the block rule inside a single immediate transaction
    /// (`spec.md` §4.6, §5): checks the GVR, the low watermark, any
    /// existing row at this slot, and the high watermark, then either
    /// accepts idempotently, inserts a new row, or rejects.
    pub fn check_and_sign_block(
        &self,
        request: &BlockRequest,
        genesis_validators_root: GenesisValidatorsRoot,
    ) -> Result<SigningResult, Error> {
        let mut conn = self.conn()?;
        let tx = SlashingDatabase::begin_immediate(&mut conn)?;

        if let Some(stored) = get_gvr(&tx)? {
            if stored.0 != genesis_validators_root.0 {
                return Ok(SigningResult::Reject(
                    RejectReason::GenesisValidatorsRootMismatch,
                ));
            }
        }

        let validator_id = register_validator_tx(&tx, &request.public_key)?;

        let enabled: bool = tx.query_row(
            "SELECT enabled FROM validators WHERE id = ?1",
            [validator_id],
            |row| row.get(0),
        )?;
        if !enabled {
            return Ok(SigningResult::Reject(RejectReason::ValidatorDisabled));
        }

        let low = get_low_watermark(&tx, validator_id)?;
        if let Some(min_slot) = low.min_block_slot {
            if request.slot.0 <= min_slot.0 {
                return Ok(SigningResult::Reject(RejectReason::BelowLowWatermark));
            }
        }

        if let Some(high) = get_high_watermark(&tx)? {
            if request.slot.0 <= high.slot.0 {
                return Ok(SigningResult::Reject(RejectReason::AtOrBelowHighWatermark));
            }
        }

        let existing_root: Option<Option<Vec<u8>>> = tx
            .query_row(
                "SELECT signing_root FROM signed_blocks WHERE validator_id = ?1 AND slot = ?2",
                rusqlite::params![validator_id, request.slot.0 as i64],
                |row| row.get(0),
            )
            .optional()?;

        match existing_root {
            Some(Some(bytes)) => {
                if bytes == request.signing_root.0.to_vec() {
                    tx.commit()?;
                    Ok(SigningResult::Accept)
                } else {
                    Ok(SigningResult::Reject(RejectReason::ConflictingSigningRoot))
                }
            }
            Some(None) => {
                // A null-root row already exists at this slot (e.g. from
                // an interchange import); accept idempotently without
                // inserting a duplicate.
                tx.commit()?;
                Ok(SigningResult::Accept)
            }
            None => {
                tx.execute(
                    "INSERT INTO signed_blocks (validator_id, slot, signing_root) VALUES (?1, ?2, ?3)",
                    rusqlite::params![validator_id, request.slot.0 as i64, request.signing_root.0.to_vec()],
                )?;
                tx.commit()?;
                Ok(SigningResult::Accept)
            }
        }
    }
}

/// Applies the block rule to a single (possibly null-root) interchange
/// row, for import. Returns `Ok(true)` when the row is accepted
/// (inserted, upgraded from null, or a harmless duplicate) and
/// `Ok(false)` when it genuinely conflicts with a stored concrete root —
/// the first-seen root is kept and the caller counts the later one as an
/// import error (`spec.md` §4.7).
pub(crate) fn import_block_row(
    conn: &Connection,
    validator_id: i64,
    slot: Slot,
    signing_root: Option<Hash256>,
) -> Result<bool, Error> {
    let existing_root: Option<Option<Vec<u8>>> = conn
        .query_row(
            "SELECT signing_root FROM signed_blocks WHERE validator_id = ?1 AND slot = ?2",
            rusqlite::params![validator_id, slot.0 as i64],
            |row| row.get(0),
        )
        .optional()?;

    match existing_root {
        None => {
            conn.execute(
                "INSERT INTO signed_blocks (validator_id, slot, signing_root) VALUES (?1, ?2, ?3)",
                rusqlite::params![
                    validator_id,
                    slot.0 as i64,
                    signing_root.map(|r| r.0.to_vec())
                ],
            )?;
            Ok(true)
        }
        Some(None) => {
            if let Some(incoming) = signing_root {
                conn.execute(
                    "UPDATE signed_blocks SET signing_root = ?3 WHERE validator_id = ?1 AND slot = ?2",
                    rusqlite::params![validator_id, slot.0 as i64, incoming.0.to_vec()],
                )?;
            }
            Ok(true)
        }
        Some(Some(existing)) => match signing_root {
            None => Ok(true),
            Some(incoming) => Ok(existing == incoming.0.to_vec()),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::watermark::raise_low_watermark;
    use crate::watermark::LowWatermark;
    use types::GenesisValidatorsRoot;

    fn gvr() -> GenesisValidatorsRoot {
        GenesisValidatorsRoot([0u8; 32])
    }

    #[test]
    fn scenario_a_from_spec() {
        let db = SlashingDatabase::in_memory().unwrap();
        db.set_genesis_validators_root(gvr()).unwrap();
        let validator_id = db.register_validator("0xV").unwrap();
        db.set_enabled("0xV", true).unwrap();
        {
            let mut conn = db.conn().unwrap();
            let tx = SlashingDatabase::begin_immediate(&mut conn).unwrap();
            raise_low_watermark(
                &tx,
                validator_id,
                LowWatermark {
                    min_block_slot: Some(Slot(5)),
                    ..Default::default()
                },
            )
            .unwrap();
            tx.commit().unwrap();
        }

        let root = Hash256([0x4f; 32]);
        let accept = db
            .check_and_sign_block(
                &BlockRequest {
                    public_key: "0xV".to_string(),
                    slot: Slot(10),
                    signing_root: root,
                },
                gvr(),
            )
            .unwrap();
        assert_eq!(accept, SigningResult::Accept);

        // Re-signing the identical (slot, root) must still accept — the
        // low watermark is only ever raised by import/repair, not by a
        // normal sign, so it cannot climb past 10 and reject its own
        // just-accepted slot.
        let reaccept = db
            .check_and_sign_block(
                &BlockRequest {
                    public_key: "0xV".to_string(),
                    slot: Slot(10),
                    signing_root: root,
                },
                gvr(),
            )
            .unwrap();
        assert_eq!(reaccept, SigningResult::Accept);

        let different_root = db
            .check_and_sign_block(
                &BlockRequest {
                    public_key: "0xV".to_string(),
                    slot: Slot(10),
                    signing_root: Hash256([0x50; 32]),
                },
                gvr(),
            )
            .unwrap();
        assert_eq!(
            different_root,
            SigningResult::Reject(RejectReason::ConflictingSigningRoot)
        );
    }
}
