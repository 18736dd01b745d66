//! Dump taxonomy snapshot.

use std::path::PathBuf;

use clap::Parser;

use crate::db::create::load_snapshot;

/// Command line arguments for `db dump` sub command.
#[derive(Parser, Debug)]
#[command(about = "Dump taxotree taxonomy snapshot", long_about = None)]
pub struct Args {
    /// Path to snapshot file to dump.
    #[arg(long)]
    pub path_db: PathBuf,
}

/// Main entry point for `db dump` sub command.
pub fn run(_common: &crate::common::Args, args: &Args) -> Result<(), anyhow::Error> {
    tracing::info!("Opening taxonomy snapshot");
    let db = load_snapshot(&args.path_db)?;
    tracing::info!("Dumping ...");
    serde_yaml::to_writer(std::io::stdout(), &db)?;
    tracing::info!("... done");

    Ok(())
}
