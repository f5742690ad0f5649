//! Shared state every handler closes over (`SPEC_FULL.md` §9 "inject them
//! as explicit dependencies through a construction context, not static
//! singletons").

use initialized_validators::{BulkLoadStatus, LoadSupplier, SignerRegistry};
use slashing_protection::SlashingDatabase;
use slog::Logger;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use types::{ForkVersion, GenesisValidatorsRoot};

/// Builds a fresh [`LoadSupplier`] from whatever sources (directories,
/// bulk loaders) the process was configured with — `/reload` re-invokes
/// this rather than remembering a single supplier instance, since a
/// supplier is consumed once per load.
pub type ReloadFactory = dyn Fn() -> LoadSupplier + Send + Sync;

/// The healthcheck's per-bulk-loader view (`spec.md` §6, §7 "per-key
/// loading errors are counted and reported via healthcheck").
#[derive(Debug, Clone, Default)]
pub struct LoadHealth {
    pub loaded: usize,
    pub error_count: usize,
}

#[derive(Clone)]
pub struct Context {
    pub registry: SignerRegistry,
    pub slashing_db: SlashingDatabase,
    pub fork_version: ForkVersion,
    pub genesis_validators_root: GenesisValidatorsRoot,
    pub chain_id: Option<u64>,
    pub key_store_path: PathBuf,
    pub proxy_root: Option<PathBuf>,
    pub proxy_password_path: Option<PathBuf>,
    pub key_manager_api_enabled: bool,
    pub commit_boost_api_enabled: bool,
    pub reload_factory: Arc<ReloadFactory>,
    pub last_load: Arc<Mutex<LoadHealth>>,
    /// Per-backend bulk-loader outcomes from the most recent load, for
    /// `/healthcheck`'s nested `checks[id=keys-check].checks[id=<backend>]`
    /// entries (`spec.md` §6).
    pub bulk_checks: Arc<Mutex<Vec<BulkLoadStatus>>>,
    pub log: Logger,
}

impl Context {
    pub fn record_load(&self, summary: &initialized_validators::LoadSummary) {
        let mut last = self.last_load.lock().expect("load-health mutex poisoned");
        *last = LoadHealth {
            loaded: summary.loaded,
            error_count: summary.error_count,
        };
    }
}

/// `warp::Filter` glue: clones the context into each handler without
/// exposing the handler signature to its fields.
pub fn with_context(
    ctx: Context,
) -> impl warp::Filter<Extract = (Context,), Error = std::convert::Infallible> + Clone {
    warp::any().map(move || ctx.clone())
}
