//! Taxonomy database schema, snapshot store, and construction tools.
//!
//! The schema follows the NCBI taxonomy tables as shipped in Ensembl-style
//! MySQL dumps: one row per node in `ncbi_taxa_node` carrying the nested-set
//! interval labels, and zero or more rows per node in `ncbi_taxa_name`.

use indexmap::IndexMap;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

pub mod check;
pub mod create;
pub mod dump;

/// Layout of one dump table, registered at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableSpec {
    /// Table name as in the dump file stem.
    pub name: &'static str,
    /// Column names in dump file order.
    pub columns: &'static [&'static str],
}

/// Schema registry, one entry per dump table.
pub static SCHEMA: Lazy<Vec<TableSpec>> = Lazy::new(|| {
    vec![
        TableSpec {
            name: "ncbi_taxa_node",
            columns: &[
                "taxon_id",
                "parent_id",
                "rank",
                "genbank_hidden_flag",
                "left_index",
                "right_index",
                "root_id",
            ],
        },
        TableSpec {
            name: "ncbi_taxa_name",
            columns: &["taxon_id", "name", "name_class"],
        },
    ]
});

/// Look up a registered table by name.
pub fn table_spec(name: &str) -> Option<&'static TableSpec> {
    SCHEMA.iter().find(|spec| spec.name == name)
}

/// The name class tagging a node's canonical display name.
pub const NAME_CLASS_SCIENTIFIC: &str = "scientific name";

/// `parent_id` sentinel marking the root node.
pub const PARENT_SENTINEL: u32 = 0;

/// One row of `ncbi_taxa_node` with the nested-set interval labels.
///
/// For any two nodes, either one interval strictly contains the other
/// (ancestor/descendant) or the intervals are disjoint; partial overlap
/// never occurs in a valid tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxaNode {
    /// Unique taxonomy identifier.
    pub taxon_id: u32,
    /// `taxon_id` of the immediate parent, `0` for the root.
    pub parent_id: u32,
    /// Taxonomic rank label, e.g. "species".
    pub rank: String,
    /// GenBank hidden flag, orthogonal to tree structure.
    #[serde(with = "bool_from_int")]
    pub genbank_hidden_flag: bool,
    /// Left bound of the depth-first interval label.
    pub left_index: u32,
    /// Right bound of the depth-first interval label.
    pub right_index: u32,
    /// `taxon_id` of the tree's root, constant across one snapshot.
    pub root_id: u32,
}

impl TaxaNode {
    /// Number of descendants by the nested-set span formula.
    pub fn num_descendants(&self) -> u32 {
        (self.right_index - self.left_index - 1) / 2
    }

    /// Whether this node's interval strictly contains `other`'s.
    pub fn contains(&self, other: &TaxaNode) -> bool {
        self.taxon_id != other.taxon_id
            && self.left_index <= other.left_index
            && self.right_index >= other.right_index
    }
}

/// One row of `ncbi_taxa_name`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxaName {
    /// `taxon_id` of the node this name belongs to.
    pub taxon_id: u32,
    /// The name itself.
    pub name: String,
    /// Name class tag, e.g. "scientific name" or "synonym".
    pub name_class: String,
}

/// Joined (node x name) record, the row shape most queries return.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Taxon {
    /// Unique taxonomy identifier.
    pub taxon_id: u32,
    /// Name row selected by the query.
    pub name: String,
    /// Name class of the selected name row.
    pub name_class: String,
    /// `taxon_id` of the immediate parent, `0` for the root.
    pub parent_id: u32,
    /// Taxonomic rank label.
    pub rank: String,
    /// GenBank hidden flag.
    #[serde(with = "bool_from_int")]
    pub genbank_hidden_flag: bool,
    /// Left bound of the depth-first interval label.
    pub left_index: u32,
    /// Right bound of the depth-first interval label.
    pub right_index: u32,
    /// `taxon_id` of the tree's root.
    pub root_id: u32,
}

impl Taxon {
    /// Join one node row with one name row.
    pub fn from_rows(node: &TaxaNode, name: &TaxaName) -> Self {
        Self {
            taxon_id: node.taxon_id,
            name: name.name.clone(),
            name_class: name.name_class.clone(),
            parent_id: node.parent_id,
            rank: node.rank.clone(),
            genbank_hidden_flag: node.genbank_hidden_flag,
            left_index: node.left_index,
            right_index: node.right_index,
            root_id: node.root_id,
        }
    }
}

/// Immutable taxonomy snapshot loaded from the dumps.
///
/// Node rows keep dump order (insertion-ordered map keyed by `taxon_id`),
/// name rows keep dump order in a flat table; "first match" semantics of the
/// query engine refer to these orders.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxonomyDb {
    /// All node rows, keyed by `taxon_id`.
    pub nodes: IndexMap<u32, TaxaNode>,
    /// All name rows, in dump order.
    pub names: Vec<TaxaName>,
}

impl TaxonomyDb {
    /// Select the node row with the given `taxon_id`.
    pub fn node(&self, taxon_id: u32) -> Option<&TaxaNode> {
        self.nodes.get(&taxon_id)
    }

    /// Select all name rows of the given node, in dump order.
    pub fn name_rows(&self, taxon_id: u32) -> impl Iterator<Item = &TaxaName> {
        self.names.iter().filter(move |n| n.taxon_id == taxon_id)
    }

    /// Select the first name row of the given node with the given name class.
    pub fn name_row_with_class(&self, taxon_id: u32, name_class: &str) -> Option<&TaxaName> {
        self.name_rows(taxon_id).find(|n| n.name_class == name_class)
    }
}

/// Helper for serializing `bool` as the `0`/`1` of the MySQL TINYINT dumps.
mod bool_from_int {
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(value: &bool, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u8(u8::from(*value))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<bool, D::Error>
    where
        D: Deserializer<'de>,
    {
        match u8::deserialize(deserializer)? {
            0 => Ok(false),
            1 => Ok(true),
            other => Err(de::Error::custom(format!(
                "invalid TINYINT(1) value: {}",
                other
            ))),
        }
    }
}
