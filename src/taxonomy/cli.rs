//! CLI frontend for the taxonomy query engine.

use std::io::Write;
use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::db::create::load_snapshot;
use crate::taxonomy::Taxonomy;

/// Command line arguments for `query` sub command.
#[derive(Parser, Debug)]
#[command(about = "Query a taxotree taxonomy snapshot", long_about = None)]
pub struct Args {
    /// Path to snapshot file to query.
    #[arg(long)]
    pub path_db: PathBuf,

    /// The query to run.
    #[command(subcommand)]
    pub command: Commands,
}

/// Enum supporting the parsing of "query *" sub commands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Fetch one node by taxon id.
    Node {
        /// The taxon id to fetch.
        taxon_id: u32,
    },
    /// Fetch one node by scientific name.
    Name {
        /// The scientific name (underscores are normalized to spaces).
        name: String,
    },
    /// Fetch the parent of a node.
    Parent {
        /// The taxon id to fetch the parent of.
        taxon_id: u32,
    },
    /// Fetch all children of a node.
    Children {
        /// The taxon id to fetch the children of.
        taxon_id: u32,
    },
    /// Fetch all ancestors of a node.
    Ancestors {
        /// The taxon id to fetch the ancestors of.
        taxon_id: u32,
    },
    /// Fetch the last common ancestor of two nodes.
    Lca {
        /// The first taxon id.
        taxon_id_1: u32,
        /// The second taxon id.
        taxon_id_2: u32,
    },
}

/// Run the query against the engine and print JSON rows to `out`.
fn run_query<W: Write>(
    engine: &Taxonomy<'_>,
    command: &Commands,
    out: &mut W,
) -> Result<(), anyhow::Error> {
    match command {
        Commands::Node { taxon_id } => {
            let taxon = engine.fetch_node_by_id(*taxon_id)?;
            writeln!(out, "{}", serde_json::to_string(&taxon)?)?;
        }
        Commands::Name { name } => {
            let taxon = engine.fetch_by_name(name)?;
            writeln!(out, "{}", serde_json::to_string(&taxon)?)?;
        }
        Commands::Parent { taxon_id } => {
            let taxon = engine.parent(*taxon_id)?;
            writeln!(out, "{}", serde_json::to_string(&taxon)?)?;
        }
        Commands::Children { taxon_id } => {
            for taxon in engine.children(*taxon_id)? {
                writeln!(out, "{}", serde_json::to_string(&taxon)?)?;
            }
        }
        Commands::Ancestors { taxon_id } => {
            for node in engine.fetch_ancestors(*taxon_id)? {
                writeln!(out, "{}", serde_json::to_string(&node)?)?;
            }
        }
        Commands::Lca {
            taxon_id_1,
            taxon_id_2,
        } => {
            let taxon = engine.last_common_ancestor(*taxon_id_1, *taxon_id_2)?;
            writeln!(out, "{}", serde_json::to_string(&taxon)?)?;
        }
    }
    Ok(())
}

/// Main entry point for `query` sub command.
pub fn run(_common: &crate::common::Args, args: &Args) -> Result<(), anyhow::Error> {
    tracing::info!("Opening taxonomy snapshot {:?}", args.path_db);
    let db = load_snapshot(&args.path_db)?;
    let engine = Taxonomy::new(&db);
    run_query(&engine, &args.command, &mut std::io::stdout().lock())?;

    Ok(())
}
