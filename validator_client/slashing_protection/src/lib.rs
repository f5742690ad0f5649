//! The slashing-protection store: a durable per-validator history of
//! signed blocks and attestations, the watermarks, and the anti-slashing
//! decision procedure (`spec.md` §4.6–§4.9). This is the hardest, highest
//! stakes component in the whole service — a missed rule here is a real
//! slashing event for a real validator.

mod attestation;
mod block;
mod error;
mod interchange;
mod prune;
mod schema;
mod watermark;

pub use attestation::AttestationRequest;
pub use block::BlockRequest;
pub use error::Error;
pub use interchange::ImportReport;
pub use prune::PruneReport;
pub use watermark::{HighWatermark, LowWatermark};

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{Connection, OptionalExtension, TransactionBehavior};
use std::path::Path;
use types::GenesisValidatorsRoot;

/// The outcome of a slashing-rule check. A normal return value, not an
/// exception (`spec.md` §9 "Exceptions").
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SigningResult {
    Accept,
    Reject(RejectReason),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RejectReason {
    GenesisValidatorsRootMismatch,
    ValidatorDisabled,
    BelowLowWatermark,
    AtOrBelowHighWatermark,
    ConflictingSigningRoot,
    DoubleVote,
    SurroundingVote,
    SurroundedVote,
    InvalidAttestation,
}

impl std::fmt::Display for RejectReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            RejectReason::GenesisValidatorsRootMismatch => "genesis validators root mismatch",
            RejectReason::ValidatorDisabled => "validator is disabled",
            RejectReason::BelowLowWatermark => "below low watermark",
            RejectReason::AtOrBelowHighWatermark => "at or below high watermark",
            RejectReason::ConflictingSigningRoot => "conflicting signing root",
            RejectReason::DoubleVote => "double vote",
            RejectReason::SurroundingVote => "surrounding vote",
            RejectReason::SurroundedVote => "surrounded vote",
            RejectReason::InvalidAttestation => "source epoch must be strictly less than target epoch",
        };
        f.write_str(s)
    }
}

/// The durable DAO over the embedded SQLite database. One instance per
/// process, shared via `Arc` by every caller that needs slashing checks
/// (`SPEC_FULL.md` §3).
#[derive(Clone)]
pub struct SlashingDatabase {
    pool: Pool<SqliteConnectionManager>,
}

impl SlashingDatabase {
    /// Opens (creating if absent) the sqlite file at `path` and runs the
    /// idempotent schema migration.
    pub fn open_or_create(path: &Path) -> Result<Self, Error> {
        let manager = SqliteConnectionManager::file(path).with_init(|conn| {
            conn.execute_batch("PRAGMA journal_mode = WAL; PRAGMA foreign_keys = ON;")
        });
        let pool = Pool::builder().build(manager)?;
        let conn = pool.get()?;
        schema::create_schema(&conn)?;
        Ok(SlashingDatabase { pool })
    }

    /// An in-memory database, for tests and for `watermark-repair`/`export`
    /// CLI dry-runs that operate on a loaded copy.
    pub fn in_memory() -> Result<Self, Error> {
        let manager = SqliteConnectionManager::memory();
        let pool = Pool::builder().max_size(1).build(manager)?;
        let conn = pool.get()?;
        schema::create_schema(&conn)?;
        Ok(SlashingDatabase { pool })
    }

    pub(crate) fn conn(&self) -> Result<r2d2::PooledConnection<SqliteConnectionManager>, Error> {
        Ok(self.pool.get()?)
    }

    /// Reads the stored genesis validators root, if any has been set.
    pub fn genesis_validators_root(&self) -> Result<Option<GenesisValidatorsRoot>, Error> {
        let conn = self.conn()?;
        get_gvr(&conn)
    }

    /// Write-once: the first call sets the GVR; any later call with a
    /// different value fails (`spec.md` §3 "attempts to write a different
    /// GVR fail").
    pub fn set_genesis_validators_root(&self, gvr: GenesisValidatorsRoot) -> Result<(), Error> {
        let conn = self.conn()?;
        match get_gvr(&conn)? {
            None => {
                conn.execute(
                    "UPDATE metadata SET genesis_validators_root = ?1 WHERE id = 1",
                    [gvr.0.to_vec()],
                )?;
                Ok(())
            }
            Some(stored) if stored.0 == gvr.0 => Ok(()),
            Some(stored) => Err(Error::GenesisValidatorsRootMismatch {
                stored: stored.to_0x_hex(),
                incoming: gvr.to_0x_hex(),
            }),
        }
    }

    /// Upserts a validator row, returning its surrogate id. Newly inserted
    /// validators start `enabled`.
    pub fn register_validator(&self, public_key: &str) -> Result<i64, Error> {
        let conn = self.conn()?;
        register_validator(&conn, public_key)
    }

    fn lookup_validator_id(conn: &Connection, public_key: &str) -> Result<Option<i64>, Error> {
        conn.query_row(
            "SELECT id FROM validators WHERE public_key = ?1",
            [public_key],
            |row| row.get(0),
        )
        .optional()
        .map_err(Error::from)
    }

    pub fn validator_id(&self, public_key: &str) -> Result<Option<i64>, Error> {
        let conn = self.conn()?;
        Self::lookup_validator_id(&conn, public_key)
    }

    /// `None` if the validator has never been registered; `Some(enabled)`
    /// otherwise.
    pub fn is_enabled(&self, public_key: &str) -> Result<Option<bool>, Error> {
        let conn = self.conn()?;
        conn.query_row(
            "SELECT enabled FROM validators WHERE public_key = ?1",
            [public_key],
            |row| row.get::<_, bool>(0),
        )
        .optional()
        .map_err(Error::from)
    }

    /// Sets the enabled flag for a (already-registered) validator.
    pub fn set_enabled(&self, public_key: &str, enabled: bool) -> Result<(), Error> {
        let conn = self.conn()?;
        conn.execute(
            "UPDATE validators SET enabled = ?1 WHERE public_key = ?2",
            rusqlite::params![enabled, public_key],
        )?;
        Ok(())
    }

    /// Whether the store has ever recorded anything for this key — used
    /// by the delete flow (`spec.md` §4.5) to distinguish `NOT_ACTIVE`
    /// (known but absent from the registry) from `NOT_FOUND`.
    pub fn has_any_history(&self, public_key: &str) -> Result<bool, Error> {
        let conn = self.conn()?;
        Ok(Self::lookup_validator_id(&conn, public_key)?.is_some())
    }

    pub fn all_public_keys(&self) -> Result<Vec<String>, Error> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare("SELECT public_key FROM validators ORDER BY public_key ASC")?;
        let rows = stmt.query_map([], |row| row.get(0))?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Error::from)
    }

    pub(crate) fn begin_immediate(conn: &mut Connection) -> Result<rusqlite::Transaction<'_>, Error> {
        conn.transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(Error::from)
    }
}

pub(crate) fn lookup_validator_id(conn: &Connection, public_key: &str) -> Result<Option<i64>, Error> {
    conn.query_row(
        "SELECT id FROM validators WHERE public_key = ?1",
        [public_key],
        |row| row.get(0),
    )
    .optional()
    .map_err(Error::from)
}

pub(crate) fn register_validator_tx(conn: &Connection, public_key: &str) -> Result<i64, Error> {
    register_validator(conn, public_key)
}

pub(crate) fn get_gvr(conn: &Connection) -> Result<Option<GenesisValidatorsRoot>, Error> {
    let bytes: Option<Vec<u8>> = conn.query_row(
        "SELECT genesis_validators_root FROM metadata WHERE id = 1",
        [],
        |row| row.get(0),
    )?;
    Ok(bytes.map(|b| {
        let mut arr = [0u8; 32];
        arr.copy_from_slice(&b);
        GenesisValidatorsRoot(arr)
    }))
}

fn register_validator(conn: &Connection, public_key: &str) -> Result<i64, Error> {
    conn.execute(
        "INSERT INTO validators (public_key, enabled) VALUES (?1, 1)
         ON CONFLICT(public_key) DO NOTHING",
        [public_key],
    )?;
    conn.query_row(
        "SELECT id FROM validators WHERE public_key = ?1",
        [public_key],
        |row| row.get(0),
    )
    .map_err(Error::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn genesis_validators_root_is_write_once() {
        let db = SlashingDatabase::in_memory().unwrap();
        let gvr = GenesisValidatorsRoot([1u8; 32]);
        db.set_genesis_validators_root(gvr).unwrap();
        assert_eq!(db.genesis_validators_root().unwrap(), Some(gvr));

        // Writing the same value again is fine (idempotent).
        db.set_genesis_validators_root(gvr).unwrap();

        let other = GenesisValidatorsRoot([2u8; 32]);
        let err = db.set_genesis_validators_root(other).unwrap_err();
        assert!(matches!(err, Error::GenesisValidatorsRootMismatch { .. }));
    }

    #[test]
    fn register_validator_is_idempotent() {
        let db = SlashingDatabase::in_memory().unwrap();
        let id1 = db.register_validator("0xabc").unwrap();
        let id2 = db.register_validator("0xabc").unwrap();
        assert_eq!(id1, id2);
    }
}
