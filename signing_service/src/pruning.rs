//! Periodic slashing-protection pruning (`SPEC_FULL.md` §4.9.A): owned by
//! the binary crate rather than `slashing_protection` itself, since only
//! the process wiring the server together knows the configured interval.

use slashing_protection::SlashingDatabase;
use slog::{info, warn, Logger};
use std::time::Duration;

/// Spawns a background task that calls [`SlashingDatabase::prune`] on a
/// fixed interval for as long as the returned handle is alive.
pub fn spawn(
    db: SlashingDatabase,
    interval: Duration,
    epochs_to_keep: u64,
    slots_per_epoch: u64,
    log: Logger,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        // The first tick fires immediately; skip it so pruning doesn't run
        // at process start before any signing has happened.
        ticker.tick().await;
        loop {
            ticker.tick().await;
            match db.prune(epochs_to_keep, slots_per_epoch) {
                Ok(report) => info!(log, "slashing protection pruning complete";
                    "blocks_deleted" => report.blocks_deleted, "attestations_deleted" => report.attestations_deleted),
                Err(e) => warn!(log, "slashing protection pruning failed"; "error" => %e),
            }
        }
    })
}
