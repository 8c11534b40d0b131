//! Error types for tree cleaning.
//!
//! * [GraphError] - structural invariant violations raised by the
//!   [TreeGraph](crate::model::TreeGraph) primitives, plus the
//!   empty-tree signal of degree collapse.
//! * [TaxonomyError] - failures reported by a [Taxonomy](crate::taxonomy::Taxonomy).
//! * [PruneError] - everything that aborts cleaning of a single tree.

use crate::model::TaxonId;
use thiserror::Error;

// =#========================================================================#=
// GRAPH ERROR
// =#========================================================================$=
/// Errors raised by mutation primitives of a [TreeGraph](crate::model::TreeGraph).
///
/// Apart from [GraphError::EmptyTree], all variants mean that a primitive
/// was asked to touch an edge or node that is not where the indices say it
/// should be. They indicate corrupted input or an internal bug and are not
/// recoverable for the tree at hand.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GraphError {
    #[error("edge '{0}' is not registered in both adjacency indices")]
    MissingEdge(String),

    #[error("node '{0}' still has outgoing edges and is not a tip")]
    NotATip(String),

    #[error("node '{0}' has no edge to a parent")]
    NoParentEdge(String),

    #[error("node '{0}' is still attached to its parent")]
    StillAttached(String),

    #[error("node '{0}' has already been removed")]
    RemovedNode(String),

    #[error("edge '{edge}' does not connect node '{node}' as expected")]
    EdgeMismatch { edge: String, node: String },

    #[error("pruning removed every branch below the root")]
    EmptyTree,
}

// =#========================================================================#=
// TAXONOMY ERROR
// =#========================================================================$=
/// Errors reported by a [Taxonomy](crate::taxonomy::Taxonomy) implementation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TaxonomyError {
    #[error("taxon {0} is not part of the taxonomy")]
    UnknownTaxon(TaxonId),

    #[error("taxa induce a spike with {0} tip(s) instead of a tree")]
    Spike(usize),

    #[error("taxa do not share a common ancestor")]
    Disconnected,

    #[error("cycle in taxonomy links at taxon {0}")]
    Cycle(TaxonId),
}

// =#========================================================================#=
// PRUNE ERROR
// =#========================================================================$=
/// Errors aborting the cleaning of a single tree.
#[derive(Error, Debug)]
pub enum PruneError {
    #[error("tree '{0}' was not found")]
    TreeNotFound(String),

    #[error("invalid tree fragment: {0}")]
    InvalidFragment(String),

    #[error("tree structure violated: {0}")]
    Graph(#[from] GraphError),

    #[error("taxonomy lookup failed: {0}")]
    Taxonomy(#[from] TaxonomyError),

    #[error("invalid configuration: {0}")]
    Config(#[source] serde_json::Error),

    #[error("malformed study JSON: {0}")]
    Json(#[source] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, PruneError>;
