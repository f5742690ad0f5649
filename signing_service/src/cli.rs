//! Command-line surface (`spec.md` §6 "CLI"): `eth2`/`eth1` start the HTTP
//! server, the remaining three are one-shot administrative operations
//! against the slashing-protection database.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "signing_service", version, about = "Remote signer for Ethereum consensus and execution layer validator keys")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Serve consensus-layer (BLS) signing requests.
    Eth2(ServeArgs),
    /// Serve execution-layer (secp256k1) signing requests.
    Eth1(ServeArgs),
    /// Repair the global high watermark without going through a sign request.
    WatermarkRepair(WatermarkRepairArgs),
    /// Write the slashing-protection database out as an EIP-3076 interchange file.
    Export(ExportArgs),
    /// Import an EIP-3076 interchange file into the slashing-protection database.
    Import(ImportArgs),
}

#[derive(Debug, Clone, Args)]
pub struct ServeArgs {
    #[arg(long, default_value = "0.0.0.0")]
    pub listen_address: String,
    #[arg(long, default_value_t = 9000)]
    pub port: u16,

    #[arg(long)]
    pub key_store_path: PathBuf,

    #[arg(long)]
    pub slashing_protection_db_url: PathBuf,
    #[arg(long, default_value_t = 10)]
    pub slashing_protection_db_pool_size: u32,
    #[arg(long)]
    pub slashing_protection_pruning_enabled: bool,
    #[arg(long, default_value_t = 3600)]
    pub slashing_protection_pruning_interval_seconds: u64,
    #[arg(long, default_value_t = 1024)]
    pub slashing_protection_pruning_epochs_to_keep: u64,
    #[arg(long, default_value_t = 32)]
    pub slashing_protection_pruning_slots_per_epoch: u64,

    #[arg(long)]
    pub key_manager_api_enabled: bool,
    #[arg(long)]
    pub commit_boost_api_enabled: bool,
    #[arg(long)]
    pub proxy_keystores_path: Option<PathBuf>,
    #[arg(long)]
    pub proxy_keystores_password_file: Option<PathBuf>,

    #[arg(long)]
    pub azure_vault_enabled: bool,
    #[arg(long)]
    pub azure_vault_client_id: Option<String>,
    #[arg(long)]
    pub azure_vault_client_secret: Option<String>,
    #[arg(long)]
    pub azure_vault_tenant_id: Option<String>,
    #[arg(long)]
    pub azure_vault_name: Option<String>,

    #[arg(long)]
    pub aws_secrets_enabled: bool,
    #[arg(long)]
    pub aws_secrets_region: Option<String>,
    #[arg(long)]
    pub aws_secrets_access_key_id: Option<String>,
    #[arg(long)]
    pub aws_secrets_secret_access_key: Option<String>,

    /// `0x`-prefixed 4-byte fork version mixed into every signing domain.
    #[arg(long, default_value = "0x00000000")]
    pub fork_version: String,
    /// Experimental flag (`spec.md` §6 `-Xgenesis-validators-root`): seeds
    /// the slashing-protection database's genesis validators root on first
    /// start-up. Ignored once a root is already stored.
    #[arg(short = 'X', long = "genesis-validators-root")]
    pub genesis_validators_root: Option<String>,
    #[arg(long)]
    pub chain_id: Option<u64>,

    #[arg(long, default_value_t = 5)]
    pub request_timeout_seconds: u64,

    #[arg(long, default_value = "info")]
    pub log_level: String,
    #[arg(long)]
    pub debug_logging: bool,
}

#[derive(Debug, Args)]
pub struct WatermarkRepairArgs {
    #[arg(long)]
    pub slashing_protection_db_url: PathBuf,
    #[arg(long)]
    pub set_high_watermark_slot: Option<u64>,
    #[arg(long)]
    pub set_high_watermark_epoch: Option<u64>,
    #[arg(long)]
    pub delete_high_watermark: bool,
}

#[derive(Debug, Args)]
pub struct ExportArgs {
    #[arg(long)]
    pub slashing_protection_db_url: PathBuf,
    /// Defaults to stdout when absent.
    #[arg(long)]
    pub output: Option<PathBuf>,
    /// Restricts the export to these `0x`-prefixed public keys; exports
    /// every known validator when absent.
    #[arg(long, value_delimiter = ',')]
    pub pubkeys: Vec<String>,
}

#[derive(Debug, Args)]
pub struct ImportArgs {
    #[arg(long)]
    pub slashing_protection_db_url: PathBuf,
    #[arg(long)]
    pub input: PathBuf,
}
