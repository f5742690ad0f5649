//! One-shot administrative subcommands: `watermark-repair`, `export`,
//! `import`. None of these touch the signer registry or the HTTP server —
//! they open the slashing-protection database directly and exit.

use crate::cli::{ExportArgs, ImportArgs, WatermarkRepairArgs};
use crate::error::Error;
use slashing_protection::SlashingDatabase;
use std::fs::File;
use std::io::{self, Write};
use types::{Epoch, Slot};

pub fn watermark_repair(args: WatermarkRepairArgs) -> Result<(), Error> {
    let db = SlashingDatabase::open_or_create(&args.slashing_protection_db_url)?;

    if args.delete_high_watermark {
        let affected = db.delete_high_watermark()?;
        println!("deleted high watermark ({affected} row(s) affected)");
        return Ok(());
    }

    match (args.set_high_watermark_slot, args.set_high_watermark_epoch) {
        (Some(slot), Some(epoch)) => {
            let affected = db.set_high_watermark(Slot(slot), Epoch(epoch))?;
            println!("set high watermark to slot {slot}, epoch {epoch} ({affected} row(s) affected)");
            Ok(())
        }
        (None, None) => Err(Error::Usage(
            "watermark-repair requires either --delete-high-watermark or both \
             --set-high-watermark-slot and --set-high-watermark-epoch"
                .to_string(),
        )),
        _ => Err(Error::Usage(
            "--set-high-watermark-slot and --set-high-watermark-epoch must be given together"
                .to_string(),
        )),
    }
}

pub fn export(args: ExportArgs) -> Result<(), Error> {
    let db = SlashingDatabase::open_or_create(&args.slashing_protection_db_url)?;

    if args.pubkeys.is_empty() {
        let interchange = db.export_interchange()?;
        write_output(&args.output, &serde_json::to_vec_pretty(&interchange)?)?;
    } else {
        let buf: Vec<u8> = db.export_interchange_for(&args.pubkeys, Vec::new())?;
        write_output(&args.output, &buf)?;
    }
    Ok(())
}

fn write_output(output: &Option<std::path::PathBuf>, bytes: &[u8]) -> Result<(), Error> {
    match output {
        Some(path) => {
            let mut file = File::create(path)?;
            file.write_all(bytes)?;
        }
        None => {
            io::stdout().write_all(bytes)?;
            println!();
        }
    }
    Ok(())
}

pub fn import(args: ImportArgs) -> Result<(), Error> {
    let db = SlashingDatabase::open_or_create(&args.slashing_protection_db_url)?;
    let contents = std::fs::read_to_string(&args.input)?;
    let interchange: eip_3076::Interchange = serde_json::from_str(&contents)?;

    let report = db.import_interchange(&interchange)?;
    println!(
        "imported: {} blocks ({} skipped, {} errored), {} attestations ({} skipped, {} errored)",
        report.blocks_imported,
        report.blocks_skipped_duplicate,
        report.blocks_errored,
        report.attestations_imported,
        report.attestations_skipped_duplicate,
        report.attestations_errored,
    );
    Ok(())
}
