//! Low and high watermarks (`spec.md` §3, §4.6).

use crate::{Error, SlashingDatabase};
use rusqlite::{Connection, OptionalExtension};
use types::{Epoch, Slot};

/// Per-validator monotone minimum of previously observed slot / source /
/// target. Absent fields mean "no lower bound yet" for that dimension.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LowWatermark {
    pub min_block_slot: Option<Slot>,
    pub min_attestation_source_epoch: Option<Epoch>,
    pub min_attestation_target_epoch: Option<Epoch>,
}

/// The global slot/epoch below which the service refuses to sign
/// regardless of per-validator history.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HighWatermark {
    pub slot: Slot,
    pub epoch: Epoch,
}

pub(crate) fn get_low_watermark(
    conn: &Connection,
    validator_id: i64,
) -> Result<LowWatermark, Error> {
    conn.query_row(
        "SELECT min_block_slot, min_attestation_source_epoch, min_attestation_target_epoch
         FROM low_watermarks WHERE validator_id = ?1",
        [validator_id],
        |row| {
            Ok(LowWatermark {
                min_block_slot: row.get::<_, Option<i64>>(0)?.map(|v| Slot(v as u64)),
                min_attestation_source_epoch: row
                    .get::<_, Option<i64>>(1)?
                    .map(|v| Epoch(v as u64)),
                min_attestation_target_epoch: row
                    .get::<_, Option<i64>>(2)?
                    .map(|v| Epoch(v as u64)),
            })
        },
    )
    .optional()
    .map(|opt| opt.unwrap_or_default())
    .map_err(Error::from)
}

/// Raises (never lowers) the low watermark for `validator_id`.
pub(crate) fn raise_low_watermark(
    conn: &Connection,
    validator_id: i64,
    update: LowWatermark,
) -> Result<(), Error> {
    let current = get_low_watermark(conn, validator_id)?;
    let merged = LowWatermark {
        min_block_slot: max_opt(current.min_block_slot, update.min_block_slot),
        min_attestation_source_epoch: max_opt(
            current.min_attestation_source_epoch,
            update.min_attestation_source_epoch,
        ),
        min_attestation_target_epoch: max_opt(
            current.min_attestation_target_epoch,
            update.min_attestation_target_epoch,
        ),
    };

    conn.execute(
        "INSERT INTO low_watermarks
            (validator_id, min_block_slot, min_attestation_source_epoch, min_attestation_target_epoch)
         VALUES (?1, ?2, ?3, ?4)
         ON CONFLICT(validator_id) DO UPDATE SET
            min_block_slot = excluded.min_block_slot,
            min_attestation_source_epoch = excluded.min_attestation_source_epoch,
            min_attestation_target_epoch = excluded.min_attestation_target_epoch",
        rusqlite::params![
            validator_id,
            merged.min_block_slot.map(|s| s.0 as i64),
            merged.min_attestation_source_epoch.map(|e| e.0 as i64),
            merged.min_attestation_target_epoch.map(|e| e.0 as i64),
        ],
    )?;
    Ok(())
}

fn max_opt<T: Ord + Copy>(a: Option<T>, b: Option<T>) -> Option<T> {
    match (a, b) {
        (None, None) => None,
        (Some(x), None) => Some(x),
        (None, Some(y)) => Some(y),
        (Some(x), Some(y)) => Some(if x >= y { x } else { y }),
    }
}

pub(crate) fn get_high_watermark(conn: &Connection) -> Result<Option<HighWatermark>, Error> {
    let row: (Option<i64>, Option<i64>) = conn.query_row(
        "SELECT high_watermark_slot, high_watermark_epoch FROM metadata WHERE id = 1",
        [],
        |row| Ok((row.get(0)?, row.get(1)?)),
    )?;
    Ok(match row {
        (Some(slot), Some(epoch)) => Some(HighWatermark {
            slot: Slot(slot as u64),
            epoch: Epoch(epoch as u64),
        }),
        _ => None,
    })
}

impl SlashingDatabase {
    pub fn low_watermark(&self, public_key: &str) -> Result<Option<LowWatermark>, Error> {
        let conn = self.conn()?;
        match crate::lookup_validator_id(&conn, public_key)? {
            Some(id) => Ok(Some(get_low_watermark(&conn, id)?)),
            None => Ok(None),
        }
    }

    pub fn high_watermark(&self) -> Result<Option<HighWatermark>, Error> {
        let conn = self.conn()?;
        get_high_watermark(&conn)
    }

    /// Administrative operation (`spec.md` §4.6): requires the GVR to
    /// already be set, otherwise the update has no effect.
    pub fn set_high_watermark(&self, slot: Slot, epoch: Epoch) -> Result<u64, Error> {
        let conn = self.conn()?;
        if crate::get_gvr(&conn)?.is_none() {
            return Ok(0);
        }
        let rows = conn.execute(
            "UPDATE metadata SET high_watermark_slot = ?1, high_watermark_epoch = ?2 WHERE id = 1",
            rusqlite::params![slot.0 as i64, epoch.0 as i64],
        )?;
        Ok(rows as u64)
    }

    pub fn delete_high_watermark(&self) -> Result<u64, Error> {
        let conn = self.conn()?;
        let rows = conn.execute(
            "UPDATE metadata SET high_watermark_slot = NULL, high_watermark_epoch = NULL WHERE id = 1",
            [],
        )?;
        Ok(rows as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SlashingDatabase;

    #[test]
    fn high_watermark_requires_gvr() {
        let db = SlashingDatabase::in_memory().unwrap();
        let rows = db.set_high_watermark(Slot(10), Epoch(1)).unwrap();
        assert_eq!(rows, 0);
        assert_eq!(db.high_watermark().unwrap(), None);

        db.set_genesis_validators_root(types::GenesisValidatorsRoot([0u8; 32]))
            .unwrap();
        let rows = db.set_high_watermark(Slot(10), Epoch(1)).unwrap();
        assert_eq!(rows, 1);
        assert_eq!(
            db.high_watermark().unwrap(),
            Some(HighWatermark {
                slot: Slot(10),
                epoch: Epoch(1)
            })
        );
    }

    #[test]
    fn low_watermark_never_decreases() {
        let db = SlashingDatabase::in_memory().unwrap();
        let id = db.register_validator("0xabc").unwrap();
        let conn = db.conn().unwrap();
        raise_low_watermark(
            &conn,
            id,
            LowWatermark {
                min_block_slot: Some(Slot(10)),
                ..Default::default()
            },
        )
        .unwrap();
        raise_low_watermark(
            &conn,
            id,
            LowWatermark {
                min_block_slot: Some(Slot(5)),
                ..Default::default()
            },
        )
        .unwrap();
        let watermark = get_low_watermark(&conn, id).unwrap();
        assert_eq!(watermark.min_block_slot, Some(Slot(10)));
    }
}
