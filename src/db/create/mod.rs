//! Construct a taxonomy snapshot from NCBI dump files.

use std::{fs::File, io::BufWriter, path::Path, path::PathBuf, time::Instant};

use clap::Parser;

use crate::common::{open_read_maybe_gz, trace_rss_now};
use crate::db::{table_spec, TaxaName, TaxaNode, TaxonomyDb};

/// Command line arguments for `db create` sub command.
#[derive(Parser, Debug)]
#[command(about = "Construct taxotree taxonomy snapshot", long_about = None)]
pub struct Args {
    /// Path to the `ncbi_taxa_node` dump file (possibly gzipped).
    #[arg(long)]
    pub path_nodes: PathBuf,
    /// Path to the `ncbi_taxa_name` dump file (possibly gzipped).
    #[arg(long)]
    pub path_names: PathBuf,
    /// Path to output JSON snapshot file to write to.
    #[arg(long)]
    pub path_out: PathBuf,
}

/// Build a tab-separated, headerless CSV reader over a maybe-gzipped dump.
fn dump_reader<P>(path: P) -> Result<csv::Reader<Box<dyn std::io::BufRead>>, anyhow::Error>
where
    P: AsRef<Path>,
{
    Ok(csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .has_headers(false)
        .flexible(true)
        .from_reader(open_read_maybe_gz(path)?))
}

/// Check one dump record's column count against the schema registry.
fn check_columns(table: &str, record: &csv::StringRecord) -> Result<(), anyhow::Error> {
    let spec = table_spec(table)
        .ok_or_else(|| anyhow::anyhow!("table {:?} not in schema registry", table))?;
    if record.len() != spec.columns.len() {
        anyhow::bail!(
            "table {:?} expects {} columns but dump row has {} (row: {:?})",
            table,
            spec.columns.len(),
            record.len(),
            record
        );
    }
    Ok(())
}

/// Load all `ncbi_taxa_node` rows from a dump file.
pub fn load_nodes<P>(path: P) -> Result<Vec<TaxaNode>, anyhow::Error>
where
    P: AsRef<Path>,
{
    let mut reader = dump_reader(&path)?;
    let mut nodes = Vec::new();
    let mut record = csv::StringRecord::new();
    while reader.read_record(&mut record)? {
        check_columns("ncbi_taxa_node", &record)?;
        let node: TaxaNode = record.deserialize(None)?;
        nodes.push(node);
    }
    Ok(nodes)
}

/// Load all `ncbi_taxa_name` rows from a dump file.
pub fn load_names<P>(path: P) -> Result<Vec<TaxaName>, anyhow::Error>
where
    P: AsRef<Path>,
{
    let mut reader = dump_reader(&path)?;
    let mut names = Vec::new();
    let mut record = csv::StringRecord::new();
    while reader.read_record(&mut record)? {
        check_columns("ncbi_taxa_name", &record)?;
        let name: TaxaName = record.deserialize(None)?;
        names.push(name);
    }
    Ok(names)
}

/// Load node and name dumps into a `TaxonomyDb`, keeping dump order.
pub fn load_db<P, Q>(path_nodes: P, path_names: Q) -> Result<TaxonomyDb, anyhow::Error>
where
    P: AsRef<Path>,
    Q: AsRef<Path>,
{
    let start = Instant::now();
    let nodes = load_nodes(&path_nodes)?;
    let names = load_names(&path_names)?;
    tracing::debug!(
        "loading {} node and {} name rows took {:?}",
        nodes.len(),
        names.len(),
        start.elapsed()
    );

    let mut db = TaxonomyDb {
        nodes: indexmap::IndexMap::with_capacity(nodes.len()),
        names,
    };
    for node in nodes {
        if let Some(prev) = db.nodes.insert(node.taxon_id, node) {
            anyhow::bail!("duplicate taxon_id {} in node dump", prev.taxon_id);
        }
    }
    Ok(db)
}

/// Load a JSON snapshot previously written by `db create`.
pub fn load_snapshot<P>(path: P) -> Result<TaxonomyDb, anyhow::Error>
where
    P: AsRef<Path>,
{
    let db = serde_json::from_reader(open_read_maybe_gz(&path)?)?;
    Ok(db)
}

/// Main entry point for `db create` sub command.
pub fn run(_common: &crate::common::Args, args: &Args) -> Result<(), anyhow::Error> {
    tracing::info!("Loading taxonomy dumps ...");
    let db = load_db(&args.path_nodes, &args.path_names)?;
    trace_rss_now();

    tracing::info!("Validating nested-set invariants ...");
    crate::db::check::validate(&db)?;

    tracing::info!("Writing snapshot to {:?} ...", args.path_out);
    let writer = BufWriter::new(File::create(&args.path_out)?);
    serde_json::to_writer(writer, &db)?;
    tracing::info!(
        "... done, {} nodes / {} name rows",
        db.nodes.len(),
        db.names.len()
    );

    Ok(())
}
