//! Turns parsed [`ServeArgs`](crate::cli::ServeArgs) into a running
//! [`http_api::Context`]: opens the slashing-protection database, spawns
//! the signer registry, and builds the reload factory every `/reload`
//! (and the initial start-up load) invokes.

use crate::bulk_sources::{AwsSecretsSource, AzureVaultSource};
use crate::cli::ServeArgs;
use crate::error::Error;
use http_api::Context;
use initialized_validators::{
    load_bulk_source, load_directory, BulkLoadStatus, LoadSupplier, MappedResults, SignerRegistry,
};
use slashing_protection::SlashingDatabase;
use slog::{info, warn, Logger};
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use types::{ForkVersion, GenesisValidatorsRoot};

/// Builds a fresh [`LoadSupplier`] closing over everything the registry
/// worker needs to repeat a load: the configured directory, the bulk-vault
/// backends, a shared HTTP client, and the logger (`SPEC_FULL.md` §4.1.A).
fn supplier_factory(
    args: Arc<ServeArgs>,
    http_client: reqwest::Client,
    log: Logger,
    bulk_checks: Arc<Mutex<Vec<BulkLoadStatus>>>,
) -> impl Fn() -> LoadSupplier + Send + Sync {
    move || -> LoadSupplier {
        let args = args.clone();
        let http_client = http_client.clone();
        let log = log.clone();
        let bulk_checks = bulk_checks.clone();
        Box::new(move || -> Pin<Box<dyn Future<Output = MappedResults> + Send>> {
            Box::pin(async move {
                let mut combined = MappedResults {
                    values: Vec::new(),
                    error_count: 0,
                };
                let mut this_load_bulk_checks = Vec::new();

                match load_directory(&args.key_store_path, &http_client, &log).await {
                    Ok(mut results) => {
                        combined.values.append(&mut results.values);
                        combined.error_count += results.error_count;
                    }
                    Err(e) => {
                        warn!(log, "failed to read key-store directory"; "error" => %e);
                        combined.error_count += 1;
                    }
                }

                if args.azure_vault_enabled {
                    let (mut results, status) = load_bulk_source(&AzureVaultSource, &log).await;
                    combined.values.append(&mut results.values);
                    combined.error_count += results.error_count;
                    info!(log, "azure bulk load complete";
                        "loaded" => status.loaded_count, "errors" => status.error_count);
                    this_load_bulk_checks.push(status);
                }
                if args.aws_secrets_enabled {
                    let (mut results, status) = load_bulk_source(&AwsSecretsSource, &log).await;
                    combined.values.append(&mut results.values);
                    combined.error_count += results.error_count;
                    info!(log, "aws bulk load complete";
                        "loaded" => status.loaded_count, "errors" => status.error_count);
                    this_load_bulk_checks.push(status);
                }

                *bulk_checks.lock().expect("bulk-health mutex poisoned") = this_load_bulk_checks;

                combined
            })
        })
    }
}

/// Opens the slashing-protection database, runs the first signer load, and
/// assembles the [`Context`] every `http_api` handler closes over.
pub async fn build(args: ServeArgs, log: Logger) -> Result<Context, Error> {
    let fork_version = ForkVersion::from_hex(&args.fork_version).map_err(|_| {
        Error::Usage(format!("invalid --fork-version: {}", args.fork_version))
    })?;

    let slashing_db = SlashingDatabase::open_or_create(&args.slashing_protection_db_url)?;
    if let Some(raw) = &args.genesis_validators_root {
        let gvr = GenesisValidatorsRoot::from_hex(raw)
            .map_err(|_| Error::Usage(format!("invalid -X genesis-validators-root: {raw}")))?;
        slashing_db.set_genesis_validators_root(gvr)?;
    }
    let genesis_validators_root = slashing_db
        .genesis_validators_root()?
        .unwrap_or(GenesisValidatorsRoot([0u8; 32]));

    let registry = SignerRegistry::spawn(log.clone());
    let http_client = reqwest::Client::builder()
        .build()
        .map_err(|e| Error::Server(e.to_string()))?;

    let args = Arc::new(args);
    let bulk_checks = Arc::new(Mutex::new(Vec::new()));
    let factory = supplier_factory(args.clone(), http_client, log.clone(), bulk_checks.clone());
    let reload_factory: Arc<dyn Fn() -> LoadSupplier + Send + Sync> = Arc::new(factory);

    let last_load = Arc::new(Mutex::new(Default::default()));
    let ctx = Context {
        registry,
        slashing_db,
        fork_version,
        genesis_validators_root,
        chain_id: args.chain_id,
        key_store_path: args.key_store_path.clone(),
        proxy_root: args.proxy_keystores_path.clone(),
        proxy_password_path: args.proxy_keystores_password_file.clone(),
        key_manager_api_enabled: args.key_manager_api_enabled,
        commit_boost_api_enabled: args.commit_boost_api_enabled,
        reload_factory: reload_factory.clone(),
        last_load,
        bulk_checks,
        log: log.clone(),
    };

    let summary = ctx.registry.load(reload_factory()).await;
    ctx.record_load(&summary);
    info!(log, "initial signer load complete";
        "loaded" => summary.loaded, "errors" => summary.error_count, "stale" => summary.stale.len());

    Ok(ctx)
}
