//! Entry point: parses the CLI, dispatches to either the HTTP server
//! (`eth2`/`eth1`) or one of the one-shot slashing-protection admin
//! commands.

mod bulk_sources;
mod cli;
mod commands;
mod context_builder;
mod error;
mod pruning;
mod server;

use clap::Parser;
use cli::{Cli, Command, ServeArgs};
use error::Error;
use std::net::SocketAddr;
use std::time::Duration;

fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Eth2(args) => run_server(args),
        Command::Eth1(args) => run_server(args),
        Command::WatermarkRepair(args) => commands::watermark_repair(args),
        Command::Export(args) => commands::export(args),
        Command::Import(args) => commands::import(args),
    };

    if let Err(e) = result {
        eprintln!("signing_service: {e}");
        std::process::exit(1);
    }
}

fn run_server(args: ServeArgs) -> Result<(), Error> {
    let level = args.log_level.parse().unwrap_or(logging::LogLevel::Info);
    let log = logging::build_root_logger(level, args.debug_logging);

    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(async {
        let addr: SocketAddr = format!("{}:{}", args.listen_address, args.port)
            .parse()
            .map_err(|e| Error::Usage(format!("invalid listen address/port: {e}")))?;
        let timeout = Duration::from_secs(args.request_timeout_seconds);
        let pruning_enabled = args.slashing_protection_pruning_enabled;
        let pruning_interval = Duration::from_secs(args.slashing_protection_pruning_interval_seconds);
        let epochs_to_keep = args.slashing_protection_pruning_epochs_to_keep;
        let slots_per_epoch = args.slashing_protection_pruning_slots_per_epoch;

        let ctx = context_builder::build(args, log.clone()).await?;

        if pruning_enabled {
            pruning::spawn(
                ctx.slashing_db.clone(),
                pruning_interval,
                epochs_to_keep,
                slots_per_epoch,
                log.clone(),
            );
        }

        server::serve(ctx, addr, timeout, log).await
    })
}
