//! Check a taxonomy snapshot against the nested-set invariants.

use std::path::PathBuf;

use anyhow::bail;
use clap::Parser;
use itertools::Itertools;

use crate::db::{TaxonomyDb, PARENT_SENTINEL};

/// Command line arguments for `db check` sub command.
#[derive(Parser, Debug)]
#[command(about = "Check taxotree taxonomy snapshot", long_about = None)]
pub struct Args {
    /// Path to snapshot file to check.
    #[arg(long)]
    pub path_db: PathBuf,
}

/// Validate all nested-set invariants of the given snapshot.
///
/// Bails with a description of the first violation found.
pub fn validate(db: &TaxonomyDb) -> Result<(), anyhow::Error> {
    if db.nodes.is_empty() {
        bail!("snapshot contains no nodes");
    }

    // Unique root with sentinel parent; root_id is constant and self-referential.
    let roots = db
        .nodes
        .values()
        .filter(|node| node.parent_id == PARENT_SENTINEL)
        .collect_vec();
    match roots.as_slice() {
        [root] => {
            if root.root_id != root.taxon_id {
                bail!(
                    "root {} has root_id {} instead of itself",
                    root.taxon_id,
                    root.root_id
                );
            }
            if let Some(node) = db.nodes.values().find(|n| n.root_id != root.taxon_id) {
                bail!(
                    "node {} has root_id {} but the root is {}",
                    node.taxon_id,
                    node.root_id,
                    root.taxon_id
                );
            }
        }
        [] => bail!("no node with sentinel parent_id {}", PARENT_SENTINEL),
        _ => bail!(
            "multiple roots with sentinel parent_id: {}",
            roots.iter().map(|n| n.taxon_id).join(", ")
        ),
    }

    // Per-node interval sanity.
    for node in db.nodes.values() {
        if node.left_index >= node.right_index {
            bail!(
                "node {} has left_index {} >= right_index {}",
                node.taxon_id,
                node.left_index,
                node.right_index
            );
        }
        if (node.right_index - node.left_index) % 2 == 0 {
            bail!(
                "node {} has even interval span [{}, {}]",
                node.taxon_id,
                node.left_index,
                node.right_index
            );
        }
    }

    // Strict nest-or-disjoint structure: sweep nodes by ascending left index
    // with a stack of enclosing intervals; partial overlap shows up as a node
    // reaching past the right bound of the innermost open interval.
    let sorted = db
        .nodes
        .values()
        .sorted_by_key(|node| node.left_index)
        .collect_vec();
    for (a, b) in sorted.iter().tuple_windows() {
        if a.left_index == b.left_index {
            bail!(
                "nodes {} and {} share left_index {}",
                a.taxon_id,
                b.taxon_id,
                a.left_index
            );
        }
    }
    let mut stack: Vec<&crate::db::TaxaNode> = Vec::new();
    for node in sorted {
        while let Some(top) = stack.last() {
            if top.right_index < node.left_index {
                stack.pop();
            } else {
                break;
            }
        }
        if let Some(top) = stack.last() {
            if node.right_index >= top.right_index {
                bail!(
                    "node {} interval [{}, {}] partially overlaps node {} interval [{}, {}]",
                    node.taxon_id,
                    node.left_index,
                    node.right_index,
                    top.taxon_id,
                    top.left_index,
                    top.right_index
                );
            }
        }
        stack.push(node);
    }

    // Parent linkage resolves and agrees with the interval labels.
    for node in db.nodes.values() {
        if node.parent_id == PARENT_SENTINEL {
            continue;
        }
        let Some(parent) = db.node(node.parent_id) else {
            bail!(
                "node {} references missing parent {}",
                node.taxon_id,
                node.parent_id
            );
        };
        if !parent.contains(node) {
            bail!(
                "parent {} interval [{}, {}] does not contain child {} interval [{}, {}]",
                parent.taxon_id,
                parent.left_index,
                parent.right_index,
                node.taxon_id,
                node.left_index,
                node.right_index
            );
        }
    }

    // Name rows reference existing nodes.
    for name in &db.names {
        if db.node(name.taxon_id).is_none() {
            bail!(
                "name row {:?} references missing taxon {}",
                name.name,
                name.taxon_id
            );
        }
    }

    Ok(())
}

/// Main entry point for `db check` sub command.
pub fn run(_common: &crate::common::Args, args: &Args) -> Result<(), anyhow::Error> {
    tracing::info!("Opening taxonomy snapshot {:?}", args.path_db);
    let db = crate::db::create::load_snapshot(&args.path_db)?;
    tracing::info!("Checking ...");
    validate(&db)?;
    tracing::info!(
        "... all good, {} nodes / {} name rows",
        db.nodes.len(),
        db.names.len()
    );

    Ok(())
}
