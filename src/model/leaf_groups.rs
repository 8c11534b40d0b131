//! Leaves of a tree grouped by the taxon they are mapped to.
//!
//! [LeafGroups] maps each taxon id (or [None] for unmapped leaves) to the
//! leaves mapped to it, ordered so that the first entry of a group is the
//! leaf to keep when duplicates are resolved: exemplar leaves first, then
//! by node id.

use crate::model::TaxonId;
use crate::model::node::NodeIndex;
use crate::model::tree_graph::TreeGraph;
use std::collections::BTreeMap;

// =#========================================================================#=
// LEAF ENTRY
// =#========================================================================#=
/// Sort rank of a leaf within its taxon group.
///
/// Variants are declared in sort order, exemplars first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ExemplarRank {
    Exemplar,
    Ordinary,
}

/// A leaf as seen by the grouping: rank, identity and OTU data.
///
/// Field order matters: the derived ordering sorts by rank, then node id.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct LeafEntry {
    pub rank: ExemplarRank,
    pub node_id: String,
    pub node: NodeIndex,
    pub otu_id: Option<String>,
    pub taxon_id: Option<TaxonId>,
    pub taxon_name: Option<String>,
}

impl LeafEntry {
    /// Returns whether this leaf is flagged as taxon exemplar.
    pub fn is_exemplar(&self) -> bool {
        self.rank == ExemplarRank::Exemplar
    }
}

// =#========================================================================#=
// LEAF GROUPS
// =#========================================================================#=
/// Leaves of a [TreeGraph] grouped by taxon id.
///
/// This is a derived view: it is not updated by mutations of the graph.
/// Whoever prunes groups through it is responsible for removing the pruned
/// groups (see [`LeafGroups::take()`]).
///
/// # Example
/// ```
/// use std::collections::BTreeMap;
/// use treeclean::model::{LeafGroups, Otu, TreeFragment, TreeGraph};
///
/// let mut fragment = TreeFragment::new("root");
/// fragment
///     .add_child("e1", "root", "kea", Some("o1"))
///     .add_child("e2", "root", "kaka", Some("o2"));
/// let otus = BTreeMap::from([
///     ("o1".to_string(), Otu::mapped(57819, "Nestor notabilis")),
///     ("o2".to_string(), Otu::unmapped()),
/// ]);
/// let graph = TreeGraph::from_fragment(&fragment, &otus).unwrap();
///
/// let groups = LeafGroups::from_graph(&graph);
/// assert_eq!(groups.get(Some(57819)).unwrap()[0].node_id, "kea");
/// assert_eq!(groups.get(None).unwrap()[0].node_id, "kaka");
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LeafGroups {
    groups: BTreeMap<Option<TaxonId>, Vec<LeafEntry>>,
}

impl LeafGroups {
    /// Groups the current leaves of `graph` by taxon id, each group sorted.
    pub fn from_graph(graph: &TreeGraph) -> Self {
        let mut groups: BTreeMap<Option<TaxonId>, Vec<LeafEntry>> = BTreeMap::new();

        for node in graph.leaves() {
            let otu = graph.otu_of(node);
            let rank = if graph[node].is_exemplar() {
                ExemplarRank::Exemplar
            } else {
                ExemplarRank::Ordinary
            };
            let entry = LeafEntry {
                rank,
                node_id: graph[node].id().to_string(),
                node,
                otu_id: graph[node].otu().map(str::to_string),
                taxon_id: otu.and_then(|o| o.taxon_id),
                taxon_name: otu.and_then(|o| o.taxon_name.clone()),
            };
            groups.entry(entry.taxon_id).or_default().push(entry);
        }

        for group in groups.values_mut() {
            group.sort();
        }
        LeafGroups { groups }
    }

    /// Returns the sorted leaves mapped to `taxon_id`.
    pub fn get(&self, taxon_id: Option<TaxonId>) -> Option<&[LeafEntry]> {
        self.groups.get(&taxon_id).map(Vec::as_slice)
    }

    /// Returns whether a group exists for `taxon_id`.
    pub fn contains(&self, taxon_id: Option<TaxonId>) -> bool {
        self.groups.contains_key(&taxon_id)
    }

    /// Removes and returns the group of `taxon_id`.
    pub fn take(&mut self, taxon_id: Option<TaxonId>) -> Option<Vec<LeafEntry>> {
        self.groups.remove(&taxon_id)
    }

    /// Returns the ids of all mapped groups, ascending.
    pub fn taxon_ids(&self) -> Vec<TaxonId> {
        self.groups.keys().filter_map(|k| *k).collect()
    }

    /// Moves the group of `old_id` into the group of `new_id`.
    ///
    /// The merged group is re-sorted, and every moved entry carries
    /// `new_id` and `new_name` afterwards.
    ///
    /// # Returns
    /// The moved entries (as updated), empty if `old_id` had no group.
    pub fn merge_into(
        &mut self,
        old_id: TaxonId,
        new_id: TaxonId,
        new_name: Option<&str>,
    ) -> Vec<LeafEntry> {
        let Some(mut moved) = self.groups.remove(&Some(old_id)) else {
            return Vec::new();
        };
        for entry in &mut moved {
            entry.taxon_id = Some(new_id);
            entry.taxon_name = new_name.map(str::to_string);
        }

        let target = self.groups.entry(Some(new_id)).or_default();
        target.extend(moved.iter().cloned());
        target.sort();
        moved
    }

    /// Keeps only the first leaf of the group of `taxon_id`.
    ///
    /// # Returns
    /// The kept leaf and the dropped ones, or [None] if there is no such group.
    pub fn keep_first(&mut self, taxon_id: Option<TaxonId>) -> Option<(LeafEntry, Vec<LeafEntry>)> {
        let group = self.groups.get_mut(&taxon_id)?;
        let dropped = group.split_off(group.len().min(1));
        group.first().cloned().map(|kept| (kept, dropped))
    }

    /// Returns the number of groups, including the unmapped one.
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    /// Returns whether there are no groups.
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Iterates over groups in taxon id order, unmapped first.
    pub fn iter(&self) -> impl Iterator<Item = (Option<TaxonId>, &[LeafEntry])> {
        self.groups.iter().map(|(k, v)| (*k, v.as_slice()))
    }
}
