//! The attestation rule, including surrounding-vote detection
//! (`spec.md` §4.6).

use crate::watermark::{get_high_watermark, get_low_watermark};
use crate::{get_gvr, register_validator_tx, Error, RejectReason, SigningResult, SlashingDatabase};
use rusqlite::{Connection, OptionalExtension};
use types::{Epoch, GenesisValidatorsRoot, Hash256};

#[derive(Debug, Clone)]
pub struct AttestationRequest {
    pub public_key: String,
    pub source_epoch: Epoch,
    pub target_epoch: Epoch,
    pub signing_root: Hash256,
}

impl SlashingDatabase {
    pub fn check_and_sign_attestation(
        &self,
        request: &AttestationRequest,
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

        if request.source_epoch.0 >= request.target_epoch.0 {
            return Ok(SigningResult::Reject(RejectReason::InvalidAttestation));
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
        if let Some(min_target) = low.min_attestation_target_epoch {
            if request.target_epoch.0 <= min_target.0 {
                return Ok(SigningResult::Reject(RejectReason::BelowLowWatermark));
            }
        }
        if let Some(min_source) = low.min_attestation_source_epoch {
            if request.source_epoch.0 < min_source.0 {
                return Ok(SigningResult::Reject(RejectReason::BelowLowWatermark));
            }
        }

        if let Some(high) = get_high_watermark(&tx)? {
            if request.target_epoch.0 <= high.epoch.0 {
                return Ok(SigningResult::Reject(RejectReason::AtOrBelowHighWatermark));
            }
        }

        let existing_at_target: Option<Vec<u8>> = tx
            .query_row(
                "SELECT signing_root FROM signed_attestations
                 WHERE validator_id = ?1 AND target_epoch = ?2 AND signing_root IS NOT NULL",
                rusqlite::params![validator_id, request.target_epoch.0 as i64],
                |row| row.get(0),
            )
            .optional()?;
        if let Some(bytes) = existing_at_target {
            if bytes != request.signing_root.0.to_vec() {
                return Ok(SigningResult::Reject(RejectReason::DoubleVote));
            }
            tx.commit()?;
            return Ok(SigningResult::Accept);
        }

        if let Some(reason) =
            surrounds_any(&tx, validator_id, request.source_epoch, request.target_epoch)?
        {
            return Ok(SigningResult::Reject(reason));
        }

        tx.execute(
            "INSERT INTO signed_attestations (validator_id, source_epoch, target_epoch, signing_root)
             VALUES (?1, ?2, ?3, ?4)",
            rusqlite::params![
                validator_id,
                request.source_epoch.0 as i64,
                request.target_epoch.0 as i64,
                request.signing_root.0.to_vec(),
            ],
        )?;
        tx.commit()?;
        Ok(SigningResult::Accept)
    }
}

/// `(s, t)` surrounds `(s', t')` iff `s < s' && t' < t` (glossary). Checks
/// both directions against every row the validator has ever signed.
///
/// If an existing row surrounds the new request, the new vote is the
/// *surrounded* one ([`RejectReason::SurroundedVote`]); if the new
/// request surrounds an existing row, the new vote is the *surrounding*
/// one ([`RejectReason::SurroundingVote`]).
fn surrounds_any(
    conn: &Connection,
    validator_id: i64,
    source: Epoch,
    target: Epoch,
) -> Result<Option<RejectReason>, Error> {
    let mut stmt = conn.prepare(
        "SELECT source_epoch, target_epoch FROM signed_attestations WHERE validator_id = ?1",
    )?;
    let rows = stmt.query_map([validator_id], |row| {
        Ok((row.get::<_, i64>(0)? as u64, row.get::<_, i64>(1)? as u64))
    })?;

    for row in rows {
        let (s_prime, t_prime) = row?;
        if s_prime < source.0 && target.0 < t_prime {
            return Ok(Some(RejectReason::SurroundedVote));
        }
        if source.0 < s_prime && t_prime < target.0 {
            return Ok(Some(RejectReason::SurroundingVote));
        }
    }
    Ok(None)
}

/// Applies the attestation rule to a single interchange row on import,
/// using the same surrounding/duplicate semantics as
/// `check_and_sign_attestation` but against an arbitrary low-watermark
/// floor supplied by the importer.
pub(crate) fn import_attestation_row(
    conn: &Connection,
    validator_id: i64,
    source_epoch: Epoch,
    target_epoch: Epoch,
    signing_root: Option<Hash256>,
) -> Result<bool, Error> {
    if source_epoch.0 >= target_epoch.0 {
        return Ok(false);
    }

    let existing_at_target: Option<Option<Vec<u8>>> = conn
        .query_row(
            "SELECT signing_root FROM signed_attestations WHERE validator_id = ?1 AND target_epoch = ?2",
            rusqlite::params![validator_id, target_epoch.0 as i64],
            |row| row.get(0),
        )
        .optional()?;

    match existing_at_target {
        Some(Some(existing)) => {
            return match signing_root {
                None => Ok(true),
                Some(incoming) => Ok(existing == incoming.0.to_vec()),
            };
        }
        Some(None) => {
            if let Some(incoming) = signing_root {
                conn.execute(
                    "UPDATE signed_attestations SET signing_root = ?3, source_epoch = ?4
                     WHERE validator_id = ?1 AND target_epoch = ?2",
                    rusqlite::params![
                        validator_id,
                        target_epoch.0 as i64,
                        incoming.0.to_vec(),
                        source_epoch.0 as i64
                    ],
                )?;
            }
            return Ok(true);
        }
        None => {}
    }

    if surrounds_any(conn, validator_id, source_epoch, target_epoch)?.is_some() {
        return Ok(false);
    }

    conn.execute(
        "INSERT INTO signed_attestations (validator_id, source_epoch, target_epoch, signing_root)
         VALUES (?1, ?2, ?3, ?4)",
        rusqlite::params![
            validator_id,
            source_epoch.0 as i64,
            target_epoch.0 as i64,
            signing_root.map(|r| r.0.to_vec()),
        ],
    )?;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SlashingDatabase;
    use types::GenesisValidatorsRoot;

    fn gvr() -> GenesisValidatorsRoot {
        GenesisValidatorsRoot([0u8; 32])
    }

    #[test]
    fn scenario_b_from_spec() {
        let db = SlashingDatabase::in_memory().unwrap();
        db.set_genesis_validators_root(gvr()).unwrap();

        let accept = db
            .check_and_sign_attestation(
                &AttestationRequest {
                    public_key: "0xV".to_string(),
                    source_epoch: Epoch(5),
                    target_epoch: Epoch(6),
                    signing_root: Hash256([0x12; 32]),
                },
                gvr(),
            )
            .unwrap();
        assert_eq!(accept, SigningResult::Accept);

        let surrounding = db
            .check_and_sign_attestation(
                &AttestationRequest {
                    public_key: "0xV".to_string(),
                    source_epoch: Epoch(4),
                    target_epoch: Epoch(7),
                    signing_root: Hash256([0x34; 32]),
                },
                gvr(),
            )
            .unwrap();
        assert_eq!(
            surrounding,
            SigningResult::Reject(RejectReason::SurroundingVote)
        );

        let not_conflicting = db
            .check_and_sign_attestation(
                &AttestationRequest {
                    public_key: "0xV".to_string(),
                    source_epoch: Epoch(5),
                    target_epoch: Epoch(7),
                    signing_root: Hash256([0x56; 32]),
                },
                gvr(),
            )
            .unwrap();
        assert_eq!(not_conflicting, SigningResult::Accept);

        let invalid = db
            .check_and_sign_attestation(
                &AttestationRequest {
                    public_key: "0xV".to_string(),
                    source_epoch: Epoch(6),
                    target_epoch: Epoch(6),
                    signing_root: Hash256([0x78; 32]),
                },
                gvr(),
            )
            .unwrap();
        assert_eq!(
            invalid,
            SigningResult::Reject(RejectReason::InvalidAttestation)
        );
    }

    #[test]
    fn resigning_identical_attestation_is_idempotent() {
        use crate::watermark::{raise_low_watermark, LowWatermark};

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
                    min_attestation_source_epoch: Some(Epoch(5)),
                    min_attestation_target_epoch: Some(Epoch(6)),
                    ..Default::default()
                },
            )
            .unwrap();
            tx.commit().unwrap();
        }

        let request = AttestationRequest {
            public_key: "0xV".to_string(),
            source_epoch: Epoch(10),
            target_epoch: Epoch(11),
            signing_root: Hash256([0x9a; 32]),
        };

        let first = db.check_and_sign_attestation(&request, gvr()).unwrap();
        assert_eq!(first, SigningResult::Accept);

        // Re-signing the identical (source, target, root) must still
        // accept — normal signing never raises the low watermark, so it
        // cannot climb past the just-accepted target and reject itself.
        let second = db.check_and_sign_attestation(&request, gvr()).unwrap();
        assert_eq!(second, SigningResult::Accept);
    }
}
