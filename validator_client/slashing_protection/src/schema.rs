//! The durable schema for the slashing-protection store (`spec.md` §6).
//!
//! Creation is a set of idempotent `CREATE TABLE IF NOT EXISTS` /
//! `CREATE UNIQUE INDEX IF NOT EXISTS` statements plus a `user_version`
//! pragma check, matching the scale of migration machinery the teacher's
//! `store` crate uses (a single version constant, no migration framework;
//! see `SPEC_FULL.md` §3).

use rusqlite::Connection;

pub const SCHEMA_VERSION: i64 = 1;

/// Partial-unique indexes are what let a validator accumulate many
/// null-signing-root rows at different slots/targets (permitted by
/// `spec.md` §6) while still forbidding two *concrete* roots at the same
/// slot/target — exactly the invariant in `spec.md` §3.
pub fn create_schema(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS validators (
            id          INTEGER PRIMARY KEY,
            public_key  TEXT NOT NULL UNIQUE,
            enabled     INTEGER NOT NULL DEFAULT 1
        );

        CREATE TABLE IF NOT EXISTS signed_blocks (
            id            INTEGER PRIMARY KEY,
            validator_id  INTEGER NOT NULL REFERENCES validators(id),
            slot          INTEGER NOT NULL,
            signing_root  BLOB
        );

        CREATE UNIQUE INDEX IF NOT EXISTS signed_blocks_unique_root
            ON signed_blocks(validator_id, slot)
            WHERE signing_root IS NOT NULL;

        CREATE INDEX IF NOT EXISTS signed_blocks_validator_slot
            ON signed_blocks(validator_id, slot);

        CREATE TABLE IF NOT EXISTS signed_attestations (
            id             INTEGER PRIMARY KEY,
            validator_id   INTEGER NOT NULL REFERENCES validators(id),
            source_epoch   INTEGER NOT NULL,
            target_epoch   INTEGER NOT NULL,
            signing_root   BLOB
        );

        CREATE UNIQUE INDEX IF NOT EXISTS signed_attestations_unique_root
            ON signed_attestations(validator_id, target_epoch)
            WHERE signing_root IS NOT NULL;

        CREATE INDEX IF NOT EXISTS signed_attestations_validator_target
            ON signed_attestations(validator_id, target_epoch);

        CREATE TABLE IF NOT EXISTS low_watermarks (
            validator_id                   INTEGER PRIMARY KEY REFERENCES validators(id),
            min_block_slot                 INTEGER,
            min_attestation_source_epoch   INTEGER,
            min_attestation_target_epoch   INTEGER
        );

        CREATE TABLE IF NOT EXISTS metadata (
            id                        INTEGER PRIMARY KEY CHECK (id = 1),
            genesis_validators_root   BLOB,
            high_watermark_slot       INTEGER,
            high_watermark_epoch      INTEGER
        );

        INSERT OR IGNORE INTO metadata (id, genesis_validators_root, high_watermark_slot, high_watermark_epoch)
        VALUES (1, NULL, NULL, NULL);
        ",
    )?;

    let current: i64 = conn.query_row("PRAGMA user_version", [], |row| row.get(0))?;
    if current < SCHEMA_VERSION {
        conn.pragma_update(None, "user_version", SCHEMA_VERSION)?;
    }

    Ok(())
}
