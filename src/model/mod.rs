//! Data model for curated input trees.
//!
//! # Tree representation
//! Input trees arrive as [TreeFragment]s (nodes keyed by id, edges grouped
//! by source) that share a study-wide [Otu] table. For cleaning, a fragment
//! is loaded into a [TreeGraph], which uses the arena pattern to store
//! [Node]s and [Edge]s, referenced by [NodeIndex] and [EdgeIndex], with
//! explicit by-source and by-target indices over the edges. Trees may be
//! multifurcating.
//!
//! | Type | Role |
//! |------|------|
//! | [StudyFragment] / [TreeFragment] | Serializable input and output shape |
//! | [TreeGraph] | Mutable tree with invariant-preserving primitives |
//! | [LeafGroups] | Leaves grouped by taxon id, exemplar first |
//! | [DeletionLog] | What was removed, and why |
//!
//! # Removal bookkeeping
//! Graph primitives record removed ids into a [Removed] batch; pruning
//! stages file batches into the [DeletionLog] under a [PruneReason].

pub mod deletion_log;
pub mod fragment;
pub mod leaf_groups;
pub mod node;
pub mod tree_graph;

/// Identifier of a taxon in the reference taxonomy.
pub type TaxonId = u64;

// Fragments
pub use fragment::{Otu, RawEdge, RawNode, StudyFragment, TreeFragment};
// Graph
pub use node::{Edge, EdgeIndex, Node, NodeIndex};
pub use tree_graph::{CollapseReport, TreeGraph};
// Leaf grouping
pub use leaf_groups::{ExemplarRank, LeafEntry, LeafGroups};
// Logging of removals
pub use deletion_log::{DeletionLog, PruneReason, Removed};
