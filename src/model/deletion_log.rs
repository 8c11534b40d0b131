//! Bookkeeping of everything removed while cleaning a tree.
//!
//! Primitives of the [TreeGraph](crate::model::TreeGraph) record what they
//! remove into a [Removed] batch. Each pruning stage then files its batch
//! into the [DeletionLog] under a [PruneReason]. The log is append-only:
//! filing a batch under an existing reason extends that entry.

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

// =#========================================================================#=
// PRUNE REASON
// =#========================================================================$=
/// Why nodes and edges were removed from a tree.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PruneReason {
    /// Outside the ingroup clade
    Outgroup,
    /// Leaf without taxon mapping
    UnmappedOtu,
    /// Internal node left with fewer than two children
    BecameTrivial,
    /// Taxon id unknown to the taxonomy
    UnrecognizedOttId,
    /// Taxon id forwards to an id unknown to the taxonomy
    ForwardedToUnrecognizedOttId,
    /// Taxon excluded by a cleaning flag
    Flagged,
    /// Taxon outside the working root
    AboveRoot,
    /// Taxon is an ancestor of another mapped taxon of the same tree
    MappedToTaxonContainingOtherMappedTips,
    /// Duplicate leaf of a taxon whose retained leaf is the exemplar
    ReplacedByExemplarNode,
    /// Duplicate leaf of a taxon without exemplar
    ReplacedByArbitraryNode,
    /// Reason supplied by an upstream taxonomy-cleaning pass
    Forced(String),
}

impl PruneReason {
    /// Returns the tag under which this reason is logged.
    pub fn as_str(&self) -> &str {
        match self {
            PruneReason::Outgroup => "outgroup",
            PruneReason::UnmappedOtu => "unmapped_otu",
            PruneReason::BecameTrivial => "became_trivial",
            PruneReason::UnrecognizedOttId => "unrecognized_ott_id",
            PruneReason::ForwardedToUnrecognizedOttId => "forwarded_to_unrecognized_ott_id",
            PruneReason::Flagged => "flagged",
            PruneReason::AboveRoot => "above_root",
            PruneReason::MappedToTaxonContainingOtherMappedTips => {
                "mapped_to_taxon_containing_other_mapped_tips"
            }
            PruneReason::ReplacedByExemplarNode => "replaced_by_exemplar_node",
            PruneReason::ReplacedByArbitraryNode => "replaced_by_arbitrary_node",
            PruneReason::Forced(reason) => reason,
        }
    }
}

impl fmt::Display for PruneReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =#========================================================================#=
// REMOVED (batch)
// =#========================================================================$=
/// Ids of nodes and edges removed by one or more primitives.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Removed {
    pub nodes: Vec<String>,
    pub edges: Vec<String>,
}

impl Removed {
    /// Creates an empty batch.
    pub fn new() -> Self {
        Removed::default()
    }

    /// Returns whether nothing has been recorded.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.edges.is_empty()
    }

    pub(crate) fn node(&mut self, id: &str) {
        self.nodes.push(id.to_string());
    }

    pub(crate) fn edge(&mut self, id: &str) {
        self.edges.push(id.to_string());
    }

    fn extend(&mut self, other: Removed) {
        self.nodes.extend(other.nodes);
        self.edges.extend(other.edges);
    }
}

// =#========================================================================#=
// DELETION LOG
// =#========================================================================$=
/// Append-only record of removals grouped by reason tag.
///
/// Serializes to the shape consumed by downstream reporting:
/// ```text
/// {"outgroup": {"nodes": [...], "edges": [...]}, ...,
///  "revised_ingroup_node": "node7", "EMPTY_TREE": true}
/// ```
/// The last two keys only appear when set.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DeletionLog {
    #[serde(flatten)]
    entries: BTreeMap<String, Removed>,

    #[serde(skip_serializing_if = "Option::is_none")]
    revised_ingroup_node: Option<String>,

    #[serde(rename = "EMPTY_TREE", skip_serializing_if = "std::ops::Not::not")]
    empty_tree: bool,
}

impl DeletionLog {
    /// Creates an empty log.
    pub fn new() -> Self {
        DeletionLog::default()
    }

    /// Files a batch of removals under `reason`.
    ///
    /// Empty batches are ignored; an existing entry is extended, never replaced.
    pub fn append(&mut self, reason: &PruneReason, removed: Removed) {
        if removed.is_empty() {
            return;
        }
        self.entries
            .entry(reason.as_str().to_string())
            .or_default()
            .extend(removed);
    }

    /// Returns the removals filed under `reason`, if any.
    pub fn get(&self, reason: &PruneReason) -> Option<&Removed> {
        self.entries.get(reason.as_str())
    }

    /// Returns whether node `id` was removed for `reason`.
    pub fn contains_node(&self, reason: &PruneReason, id: &str) -> bool {
        self.get(reason).is_some_and(|r| r.nodes.iter().any(|n| n == id))
    }

    /// Returns whether edge `id` was removed for `reason`.
    pub fn contains_edge(&self, reason: &PruneReason, id: &str) -> bool {
        self.get(reason).is_some_and(|r| r.edges.iter().any(|e| e == id))
    }

    /// Iterates over `(reason tag, removals)` in tag order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Removed)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Total number of nodes removed for any reason.
    pub fn num_removed_nodes(&self) -> usize {
        self.entries.values().map(|r| r.nodes.len()).sum()
    }

    /// Returns the id of the node that replaced the ingroup root, if any.
    pub fn revised_ingroup_node(&self) -> Option<&str> {
        self.revised_ingroup_node.as_deref()
    }

    pub(crate) fn set_revised_ingroup_node(&mut self, id: &str) {
        self.revised_ingroup_node = Some(id.to_string());
    }

    /// Returns whether cleaning ended with an empty tree.
    pub fn is_empty_tree(&self) -> bool {
        self.empty_tree
    }

    pub(crate) fn mark_empty_tree(&mut self) {
        self.empty_tree = true;
    }

    /// Serializes this log to a JSON value.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}
