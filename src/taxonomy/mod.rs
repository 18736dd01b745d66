//! Read-only taxonomy queries over the nested-set interval labels.
//!
//! All tree-structural questions are answered with interval containment
//! arithmetic on `left_index`/`right_index`; no operation walks `parent_id`
//! chains recursively. Ancestor containment costs two integer comparisons
//! per candidate row.

use itertools::Itertools;

use crate::db::{TaxaNode, Taxon, TaxonomyDb, NAME_CLASS_SCIENTIFIC};

pub mod cli;

/// Zero-row query outcomes.
///
/// Each variant is a normal, expected outcome for some caller (probing
/// whether a node is a leaf, whether a name exists, ...) and can be branched
/// on without further inspection.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// No node row with the given `taxon_id`.
    #[error("taxon {0} not found")]
    UnknownTaxon(u32),
    /// No scientific-name row with the given name.
    #[error("no taxon with scientific name {0:?}")]
    UnknownName(String),
    /// The node exists but is the root.
    #[error("taxon {0} has no parent")]
    NoParent(u32),
    /// The node exists but is a leaf.
    #[error("taxon {0} has no children")]
    NoChildren(u32),
    /// The node exists but is the root.
    #[error("taxon {0} has no ancestors")]
    NoAncestors(u32),
    /// Both nodes exist but share no ancestor.
    #[error("taxa {0} and {1} have no common ancestor")]
    NoCommonAncestor(u32, u32),
}

/// Taxonomy query engine over one immutable snapshot.
///
/// The engine is stateless; each operation issues one logical read-only
/// query against the borrowed snapshot.
#[derive(Debug, Clone, Copy)]
pub struct Taxonomy<'a> {
    db: &'a TaxonomyDb,
}

impl<'a> Taxonomy<'a> {
    /// Construct an engine over the given snapshot.
    pub fn new(db: &'a TaxonomyDb) -> Self {
        Self { db }
    }

    /// Select the node row for `taxon_id` or signal `UnknownTaxon`.
    fn node(&self, taxon_id: u32) -> Result<&'a TaxaNode, Error> {
        self.db.node(taxon_id).ok_or(Error::UnknownTaxon(taxon_id))
    }

    /// Join a node with its first name row in dump order.
    fn joined_first(&self, node: &TaxaNode) -> Result<Taxon, Error> {
        let name = self
            .db
            .name_rows(node.taxon_id)
            .next()
            .ok_or(Error::UnknownTaxon(node.taxon_id))?;
        Ok(Taxon::from_rows(node, name))
    }

    /// Join a node with its scientific-name row.
    fn joined_scientific(&self, node: &TaxaNode) -> Option<Taxon> {
        self.db
            .name_row_with_class(node.taxon_id, NAME_CLASS_SCIENTIFIC)
            .map(|name| Taxon::from_rows(node, name))
    }

    /// Fetch the joined record for `taxon_id`.
    ///
    /// The name row is the first one in dump order, so the returned
    /// `name_class` is not necessarily "scientific name".
    pub fn fetch_node_by_id(&self, taxon_id: u32) -> Result<Taxon, Error> {
        self.joined_first(self.node(taxon_id)?)
    }

    /// Fetch the first node whose scientific name equals `name`.
    ///
    /// Underscores in `name` are normalized to spaces, so species names in
    /// production-name form ("canis_lupus") match. If several nodes claim
    /// the same scientific name, the first name row in dump order wins.
    pub fn fetch_by_name(&self, name: &str) -> Result<Taxon, Error> {
        let normalized = name.replace('_', " ");
        self.db
            .names
            .iter()
            .find(|row| row.name_class == NAME_CLASS_SCIENTIFIC && row.name == normalized)
            .and_then(|row| {
                self.db
                    .node(row.taxon_id)
                    .map(|node| Taxon::from_rows(node, row))
            })
            .ok_or_else(|| Error::UnknownName(normalized))
    }

    /// Fetch the parent of `taxon_id` as a scientific-name joined record.
    ///
    /// The root has no parent by definition.
    pub fn parent(&self, taxon_id: u32) -> Result<Taxon, Error> {
        let node = self.node(taxon_id)?;
        self.db
            .node(node.parent_id)
            .and_then(|parent| self.joined_scientific(parent))
            .ok_or(Error::NoParent(taxon_id))
    }

    /// Fetch all children of `taxon_id` as scientific-name joined records.
    ///
    /// Distinguishes an absent id (`UnknownTaxon`) from a valid leaf
    /// (`NoChildren`). Order is node dump order, stable per snapshot.
    pub fn children(&self, taxon_id: u32) -> Result<Vec<Taxon>, Error> {
        self.node(taxon_id)?;
        let children = self
            .db
            .nodes
            .values()
            .filter(|node| node.parent_id == taxon_id)
            .filter_map(|node| self.joined_scientific(node))
            .collect_vec();
        if children.is_empty() {
            Err(Error::NoChildren(taxon_id))
        } else {
            Ok(children)
        }
    }

    /// Whether `taxon_id` is the root of its snapshot.
    ///
    /// False for absent ids; this probe never fails.
    pub fn is_root(&self, taxon_id: u32) -> bool {
        self.db
            .node(taxon_id)
            .map(|node| node.root_id == taxon_id)
            .unwrap_or(false)
    }

    /// Number of descendants of `taxon_id` by the interval span formula.
    pub fn num_descendants(&self, taxon_id: u32) -> Result<u32, Error> {
        Ok(self.node(taxon_id)?.num_descendants())
    }

    /// Whether `taxon_id` has zero descendants.
    pub fn is_leaf(&self, taxon_id: u32) -> Result<bool, Error> {
        Ok(self.num_descendants(taxon_id)? == 0)
    }

    /// Fetch all ancestors of `taxon_id`, ordered ascending by `taxon_id`.
    ///
    /// An ancestor is any node whose interval strictly contains the node's.
    /// The root has no ancestors, so `NoAncestors` is signaled for it.
    pub fn fetch_ancestors(&self, taxon_id: u32) -> Result<Vec<TaxaNode>, Error> {
        let node = self.node(taxon_id)?;
        let ancestors = self
            .db
            .nodes
            .values()
            .filter(|other| other.contains(node))
            .cloned()
            .sorted_by_key(|other| other.taxon_id)
            .collect_vec();
        if ancestors.is_empty() {
            Err(Error::NoAncestors(taxon_id))
        } else {
            Ok(ancestors)
        }
    }

    /// Fetch all common ancestors of two taxa.
    ///
    /// Ordered most general first: descending by `num_descendants`, ties
    /// broken ascending by `taxon_id`. Records are joined with the first
    /// name row as in [`Self::fetch_node_by_id`].
    pub fn all_common_ancestors(
        &self,
        taxon_id_1: u32,
        taxon_id_2: u32,
    ) -> Result<Vec<Taxon>, Error> {
        let ancestors_1 = self.fetch_ancestors(taxon_id_1)?;
        let ancestors_2 = self.fetch_ancestors(taxon_id_2)?;
        let ids_2 = ancestors_2.iter().map(|n| n.taxon_id).collect_vec();
        let common = ancestors_1
            .into_iter()
            .filter(|n| ids_2.contains(&n.taxon_id))
            .sorted_by_key(|n| (std::cmp::Reverse(n.num_descendants()), n.taxon_id))
            .collect_vec();
        if common.is_empty() {
            return Err(Error::NoCommonAncestor(taxon_id_1, taxon_id_2));
        }
        common
            .iter()
            .map(|n| self.fetch_node_by_id(n.taxon_id))
            .collect()
    }

    /// Fetch the most specific common ancestor of two taxa.
    ///
    /// This is the common ancestor with the smallest enclosing subtree, a
    /// proxy for recency rather than a depth computation. For equal inputs
    /// the node itself is returned.
    pub fn last_common_ancestor(&self, taxon_id_1: u32, taxon_id_2: u32) -> Result<Taxon, Error> {
        if taxon_id_1 == taxon_id_2 {
            return self.fetch_node_by_id(taxon_id_1);
        }
        let mut common = self.all_common_ancestors(taxon_id_1, taxon_id_2)?;
        common
            .pop()
            .ok_or(Error::NoCommonAncestor(taxon_id_1, taxon_id_2))
    }
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;
    use rstest::{fixture, rstest};

    use super::{Error, Taxonomy};
    use crate::db::TaxonomyDb;

    #[fixture]
    #[once]
    fn db() -> TaxonomyDb {
        crate::db::create::load_db(
            "tests/data/taxonomy/ncbi_taxa_node.tsv",
            "tests/data/taxonomy/ncbi_taxa_name.tsv",
        )
        .expect("fixture dumps must load")
    }

    #[rstest]
    fn fetch_node_by_id(db: &TaxonomyDb) -> Result<(), anyhow::Error> {
        let taxon = Taxonomy::new(db).fetch_node_by_id(9615)?;

        // First name row in dump order, not the scientific name.
        assert_eq!(taxon.taxon_id, 9615);
        assert_eq!(taxon.name, "beagle dog");
        assert_eq!(taxon.name_class, "includes");
        assert_eq!(taxon.parent_id, 9612);
        assert_eq!(taxon.rank, "subspecies");
        assert!(taxon.genbank_hidden_flag);
        assert_eq!((taxon.left_index, taxon.right_index), (595, 596));
        assert_eq!(taxon.root_id, 1);

        Ok(())
    }

    #[rstest]
    fn fetch_node_by_id_false_id(db: &TaxonomyDb) {
        assert_eq!(
            Taxonomy::new(db).fetch_node_by_id(9616),
            Err(Error::UnknownTaxon(9616))
        );
    }

    #[rstest]
    #[case("Canis lupus familiaris")]
    #[case("Canis_lupus_familiaris")]
    fn fetch_by_name(db: &TaxonomyDb, #[case] name: &str) -> Result<(), anyhow::Error> {
        let taxon = Taxonomy::new(db).fetch_by_name(name)?;

        assert_eq!(taxon.taxon_id, 9615);
        assert_eq!(taxon.name, "Canis lupus familiaris");
        assert_eq!(taxon.name_class, "scientific name");
        assert_eq!(taxon.rank, "subspecies");

        Ok(())
    }

    #[rstest]
    fn fetch_by_name_false_name(db: &TaxonomyDb) {
        assert_eq!(
            Taxonomy::new(db).fetch_by_name("Canis loopy familiaris"),
            Err(Error::UnknownName(String::from("Canis loopy familiaris")))
        );
    }

    #[rstest]
    fn parent(db: &TaxonomyDb) -> Result<(), anyhow::Error> {
        let taxon = Taxonomy::new(db).parent(9615)?;

        assert_eq!(taxon.taxon_id, 9612);
        assert_eq!(taxon.name, "Canis lupus");
        assert_eq!(taxon.name_class, "scientific name");
        assert_eq!(taxon.rank, "species");
        assert_eq!((taxon.left_index, taxon.right_index), (594, 597));

        Ok(())
    }

    #[rstest]
    fn parent_false_id(db: &TaxonomyDb) {
        assert_eq!(
            Taxonomy::new(db).parent(9616),
            Err(Error::UnknownTaxon(9616))
        );
    }

    #[rstest]
    fn parent_of_root(db: &TaxonomyDb) {
        assert_eq!(Taxonomy::new(db).parent(1), Err(Error::NoParent(1)));
    }

    #[rstest]
    fn children(db: &TaxonomyDb) -> Result<(), anyhow::Error> {
        let children = Taxonomy::new(db).children(9989)?;

        let summary = children
            .iter()
            .map(|taxon| {
                (
                    taxon.taxon_id,
                    taxon.name.as_str(),
                    taxon.left_index,
                    taxon.right_index,
                )
            })
            .collect::<Vec<_>>();
        assert_eq!(
            summary,
            vec![
                (33550, "Hystricognathi", 356, 363),
                (33553, "Sciurognathi", 364, 399),
            ]
        );

        Ok(())
    }

    #[rstest]
    fn children_of_leaf(db: &TaxonomyDb) {
        assert_eq!(
            Taxonomy::new(db).children(9615),
            Err(Error::NoChildren(9615))
        );
    }

    #[rstest]
    fn children_false_id(db: &TaxonomyDb) {
        assert_eq!(
            Taxonomy::new(db).children(9616),
            Err(Error::UnknownTaxon(9616))
        );
    }

    #[rstest]
    #[case(1, true)]
    #[case(9615, false)]
    #[case(9616, false)]
    fn is_root(db: &TaxonomyDb, #[case] taxon_id: u32, #[case] expected: bool) {
        assert_eq!(Taxonomy::new(db).is_root(taxon_id), expected);
    }

    #[rstest]
    #[case(9612, 1)]
    #[case(1, 381)]
    #[case(9615, 0)]
    fn num_descendants(
        db: &TaxonomyDb,
        #[case] taxon_id: u32,
        #[case] expected: u32,
    ) -> Result<(), anyhow::Error> {
        assert_eq!(Taxonomy::new(db).num_descendants(taxon_id)?, expected);

        Ok(())
    }

    #[rstest]
    fn num_descendants_false_id(db: &TaxonomyDb) {
        assert_eq!(
            Taxonomy::new(db).num_descendants(0),
            Err(Error::UnknownTaxon(0))
        );
    }

    #[rstest]
    #[case(9615, true)]
    #[case(1, false)]
    fn is_leaf(
        db: &TaxonomyDb,
        #[case] taxon_id: u32,
        #[case] expected: bool,
    ) -> Result<(), anyhow::Error> {
        assert_eq!(Taxonomy::new(db).is_leaf(taxon_id)?, expected);

        Ok(())
    }

    #[rstest]
    fn fetch_ancestors(db: &TaxonomyDb) -> Result<(), anyhow::Error> {
        let ancestors = Taxonomy::new(db).fetch_ancestors(33208)?;

        // Ascending by taxon_id.
        assert_eq!(
            ancestors.iter().map(|n| n.taxon_id).collect::<Vec<_>>(),
            vec![1, 2759, 33154, 131567]
        );
        for ancestor in &ancestors {
            assert!(ancestor.left_index <= 5);
            assert!(ancestor.right_index >= 600);
        }

        Ok(())
    }

    #[rstest]
    fn fetch_ancestors_of_root(db: &TaxonomyDb) {
        assert_eq!(
            Taxonomy::new(db).fetch_ancestors(1),
            Err(Error::NoAncestors(1))
        );
    }

    #[rstest]
    fn fetch_ancestors_false_id(db: &TaxonomyDb) {
        assert_eq!(
            Taxonomy::new(db).fetch_ancestors(0),
            Err(Error::UnknownTaxon(0))
        );
    }

    #[rstest]
    fn all_common_ancestors(db: &TaxonomyDb) -> Result<(), anyhow::Error> {
        let common = Taxonomy::new(db).all_common_ancestors(33208, 4751)?;

        // Most general first: descending num_descendants.
        assert_eq!(
            common.iter().map(|t| t.taxon_id).collect::<Vec<_>>(),
            vec![1, 131567, 2759, 33154]
        );

        Ok(())
    }

    #[rstest]
    fn all_common_ancestors_symmetric(db: &TaxonomyDb) -> Result<(), anyhow::Error> {
        let engine = Taxonomy::new(db);
        assert_eq!(
            engine.all_common_ancestors(33208, 4751)?,
            engine.all_common_ancestors(4751, 33208)?
        );

        Ok(())
    }

    #[rstest]
    fn all_common_ancestors_with_root(db: &TaxonomyDb) {
        // The root has no ancestors, so no common set exists.
        assert_eq!(
            Taxonomy::new(db).all_common_ancestors(1, 9615),
            Err(Error::NoAncestors(1))
        );
    }

    #[rstest]
    fn last_common_ancestor(db: &TaxonomyDb) -> Result<(), anyhow::Error> {
        let taxon = Taxonomy::new(db).last_common_ancestor(33154, 131567)?;

        assert_eq!(taxon.taxon_id, 1);
        assert_eq!(taxon.name, "all");
        assert_eq!(taxon.name_class, "synonym");
        assert_eq!(taxon.parent_id, 0);
        assert_eq!((taxon.left_index, taxon.right_index), (1, 764));

        Ok(())
    }

    #[rstest]
    fn last_common_ancestor_of_cousins(db: &TaxonomyDb) -> Result<(), anyhow::Error> {
        // Metazoa and Fungi meet at Opisthokonta.
        let taxon = Taxonomy::new(db).last_common_ancestor(33208, 4751)?;
        assert_eq!(taxon.taxon_id, 33154);

        Ok(())
    }

    #[rstest]
    fn last_common_ancestor_of_self(db: &TaxonomyDb) -> Result<(), anyhow::Error> {
        let taxon = Taxonomy::new(db).last_common_ancestor(9615, 9615)?;
        assert_eq!(taxon.taxon_id, 9615);

        Ok(())
    }

    #[rstest]
    fn leaf_predicate_matches_descendant_count(db: &TaxonomyDb) -> Result<(), anyhow::Error> {
        let engine = Taxonomy::new(db);
        for &taxon_id in db.nodes.keys() {
            assert_eq!(
                engine.is_leaf(taxon_id)?,
                engine.num_descendants(taxon_id)? == 0
            );
        }

        Ok(())
    }

    #[rstest]
    fn every_non_root_appears_under_its_parent(db: &TaxonomyDb) -> Result<(), anyhow::Error> {
        let engine = Taxonomy::new(db);
        for &taxon_id in db.nodes.keys() {
            if engine.is_root(taxon_id) {
                continue;
            }
            let parent = engine.parent(taxon_id)?;
            let siblings = engine.children(parent.taxon_id)?;
            assert!(siblings.iter().any(|t| t.taxon_id == taxon_id));
        }

        Ok(())
    }

    #[rstest]
    fn ancestors_contain_descendant_intervals(db: &TaxonomyDb) -> Result<(), anyhow::Error> {
        let engine = Taxonomy::new(db);
        for node in db.nodes.values() {
            if engine.is_root(node.taxon_id) {
                continue;
            }
            for ancestor in engine.fetch_ancestors(node.taxon_id)? {
                assert!(ancestor.left_index <= node.left_index);
                assert!(ancestor.right_index >= node.right_index);
            }
        }

        Ok(())
    }
}
